use clap::{Parser, Subcommand};
use passio_vault::EntryId;
use std::path::PathBuf;

/// Passio: an encrypted password vault.
///
/// The master password is read from `PASSIO_MASTER_PASSWORD`, or from the first line of
/// standard input when the variable is unset.
#[derive(Debug, Parser)]
#[command(name = "passio", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file. Without it, `passio.toml` in the working directory is used when
    /// present.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Account whose vault is opened.
    #[arg(short, long, global = true, env = "PASSIO_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lists every entry in display order.
    List,

    /// Shows one entry.
    Show {
        id: EntryId,
        /// Prints the password instead of a mask.
        #[arg(long)]
        reveal: bool,
    },

    /// Adds an entry. A password is generated when none is given.
    Add {
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        url: String,
        #[arg(short = 'n', long, default_value = "")]
        username: String,
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Changes the given fields of an entry.
    Edit {
        id: EntryId,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(short = 'n', long)]
        username: Option<String>,
        #[arg(short, long, conflicts_with = "regenerate")]
        password: Option<String>,
        /// Replaces the password with a freshly generated one.
        #[arg(long)]
        regenerate: bool,
    },

    /// Removes an entry. `undo` brings it back.
    Remove { id: EntryId },

    /// Fuzzy-searches descriptions, URLs and usernames.
    Search {
        query: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Reverts the most recent change.
    Undo,

    /// Re-applies the most recently undone change.
    Redo,

    /// Prints a random password without opening a vault.
    Generate {
        /// Defaults to `vault.password_length` from the configuration.
        #[arg(short, long)]
        length: Option<usize>,
    },
}

impl Command {
    /// Whether the command works on an opened vault.
    #[must_use]
    pub const fn needs_vault(&self) -> bool {
        !matches!(self, Self::Generate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn edit_rejects_password_with_regenerate() {
        let err = Cli::try_parse_from(["passio", "edit", "3", "-p", "x", "--regenerate"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn search_defaults_to_five_results() {
        let cli = Cli::try_parse_from(["passio", "-u", "homer", "search", "hom"]).unwrap();
        assert_eq!(cli.user.as_deref(), Some("homer"));
        assert!(matches!(cli.command, Command::Search { limit: 5, .. }));
        assert!(cli.command.needs_vault());
    }
}
