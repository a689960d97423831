use passio_derive::passio_error;
use std::borrow::Cow;

#[passio_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Not found: {key}")]
    NotFound { key: String },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<(), DemoError> {
    Err(std::io::Error::other("boom")).context("reading")
}

fn main() {
    let _ = read();
    let _ = DemoError::from("static").kind();
}
