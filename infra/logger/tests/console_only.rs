use passio_logger::{LogSettings, Logger};

#[test]
fn default_settings_log_to_the_console_only() {
    let logger = Logger::from_settings("passio-console", &LogSettings::default())
        .expect("default settings should install");

    assert!(logger.guard().is_none());
    tracing::warn!(entries = 0, "empty vault");
}
