//! # Passio command line
//!
//! Opens one account's vault from a file store, runs a single command against it and exits.
//!
//! ```text
//! $ export PASSIO_MASTER_PASSWORD='correct horse battery staple'
//! $ passio -u homer add -d GitHub --url https://github.com -n homer_simpson
//! Added entry 1
//! $ passio -u homer search hom
//! 1	3	username	[hom]er_simpson
//! ```
//!
//! Configuration is layered: built-in defaults, then `passio.toml` (or `--config`), then
//! `PASSIO__*` environment variables. See [`PassioConfig`].

mod backend;
mod cli;
mod commands;
mod config;

pub use backend::FileBackend;
pub use cli::{Cli, Command};
pub use commands::{execute, generate};
pub use config::{PassioConfig, StorageConfig, load_config};

use anyhow::{Context, Result, bail};
use passio_logger::{LogSettings, Logger};
use passio_vault::SessionRegistry;
use std::io::{BufRead, Write};
use tracing::debug;
use zeroize::Zeroizing;

/// Environment variable holding the master password.
pub const MASTER_PASSWORD_ENV: &str = "PASSIO_MASTER_PASSWORD";

/// Installs the global subscriber described by the `[logging]` table.
///
/// # Errors
/// Fails on an unknown level, a malformed filter, or a second initialization.
pub fn init_logger(settings: &LogSettings) -> Result<Logger> {
    Logger::from_settings("passio", settings).context("Failed to initialize logging")
}

/// Reads the master password from `env`, or else the first line of `input`.
///
/// # Errors
/// Fails when neither source yields a non-empty password.
pub fn read_master_password(
    env: Option<String>,
    input: &mut impl BufRead,
) -> Result<Zeroizing<String>> {
    let mut password = Zeroizing::new(String::new());
    if let Some(value) = env {
        *password = value;
    } else {
        input.read_line(&mut password).context("Failed to read the master password")?;
        let len = password.trim_end_matches(['\r', '\n']).len();
        password.truncate(len);
    }

    if password.is_empty() {
        bail!("A master password is required; set {MASTER_PASSWORD_ENV} or pipe it on stdin");
    }
    Ok(password)
}

/// Runs `cli` to completion, writing command output to `out`.
///
/// # Errors
/// Any failure to open the store or the vault, or of the command itself.
pub async fn run(cli: Cli, config: PassioConfig, out: &mut impl Write) -> Result<()> {
    if let Command::Generate { length } = cli.command {
        return generate(length.unwrap_or(config.vault.password_length), out);
    }

    let username = cli.user.context("A username is required; pass --user or set PASSIO_USER")?;
    let password = read_master_password(
        std::env::var(MASTER_PASSWORD_ENV).ok(),
        &mut std::io::stdin().lock(),
    )?;

    let backend = FileBackend::open(&config.storage.root).await.with_context(|| {
        format!("Failed to open the store at {}", config.storage.root.display())
    })?;
    let registry = SessionRegistry::new(backend, config.vault);

    debug!(%username, "Opening vault");
    let vault = registry
        .open(&username, &password)
        .await
        .with_context(|| format!("Failed to open the vault of {username}"))?;

    let result = execute(&vault, cli.command, out).await;
    registry.clear();
    result
}
