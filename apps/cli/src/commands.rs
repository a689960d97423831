//! Executes one parsed command against an opened vault.

use crate::cli::Command;
use anyhow::{Context, Result, bail};
use passio_vault::persistence::Persistence;
use passio_vault::{Entry, EntryDraft, EntryId, SearchHit, Vault, generate_password};
use std::io::Write;

const PASSWORD_MASK: &str = "********";

/// Runs a command that needs a vault, writing its output to `out`.
///
/// # Errors
/// Fails on unknown entry ids, vault errors and write failures.
pub async fn execute<P: Persistence>(
    vault: &Vault<P>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::List => {
            for entry in vault.entries() {
                writeln!(out, "{}", summary(&entry))?;
            }
        },
        Command::Show { id, reveal } => show(&lookup(vault, id)?, reveal, out)?,
        Command::Add { description, url, username, password } => {
            let mut draft = EntryDraft::new().description(description).url(url).username(username);
            if let Some(password) = password {
                draft = draft.password(password);
            }
            let entry = vault.put(draft).await?;
            writeln!(out, "Added entry {}", entry.id)?;
        },
        Command::Edit { id, description, url, username, password, regenerate } => {
            let mut draft = lookup(vault, id)?.to_draft();
            if let Some(description) = description {
                draft = draft.description(description);
            }
            if let Some(url) = url {
                draft = draft.url(url);
            }
            if let Some(username) = username {
                draft = draft.username(username);
            }
            if let Some(password) = password {
                draft = draft.password(password);
            } else if regenerate {
                draft = draft.password(String::new());
            }
            let entry = vault.put(draft).await?;
            writeln!(out, "Updated entry {}", entry.id)?;
        },
        Command::Remove { id } => {
            let entry = vault.unput(id).await?;
            writeln!(out, "Removed entry {}", entry.id)?;
        },
        Command::Search { query, limit } => {
            let hits = vault.search(&query);
            if hits.is_empty() {
                writeln!(out, "No matches for {query:?}")?;
            }
            for hit in hits.iter().take(limit) {
                writeln!(out, "{}", found(hit))?;
            }
        },
        Command::Undo => {
            let message = if vault.undo().await? { "Undid last change" } else { "Nothing to undo" };
            writeln!(out, "{message}")?;
        },
        Command::Redo => {
            let message = if vault.redo().await? { "Redid last change" } else { "Nothing to redo" };
            writeln!(out, "{message}")?;
        },
        Command::Generate { length } => {
            generate(length.unwrap_or(vault.config().password_length), out)?;
        },
    }
    Ok(())
}

fn lookup<P: Persistence>(vault: &Vault<P>, id: EntryId) -> Result<Entry> {
    vault.get(id).with_context(|| format!("No entry with id {id}"))
}

fn summary(entry: &Entry) -> String {
    format!("{}\t{}\t{}\t{}", entry.id, entry.description, entry.url, entry.username)
}

fn show(entry: &Entry, reveal: bool, out: &mut impl Write) -> Result<()> {
    let password = if reveal { entry.password.as_str() } else { PASSWORD_MASK };
    writeln!(out, "id:          {}", entry.id)?;
    writeln!(out, "description: {}", entry.description)?;
    writeln!(out, "url:         {}", entry.url)?;
    writeln!(out, "username:    {}", entry.username)?;
    writeln!(out, "password:    {password}")?;
    writeln!(out, "created:     {}", entry.created.to_rfc3339())?;
    writeln!(out, "modified:    {}", entry.modified.to_rfc3339())?;
    if entry.volatile {
        writeln!(out, "(not yet saved)")?;
    }
    Ok(())
}

/// One search result, matched characters in brackets.
fn found(hit: &SearchHit) -> String {
    let highlighted: String = hit
        .slices
        .iter()
        .map(|slice| if slice.matched { format!("[{}]", slice.text) } else { slice.text.clone() })
        .collect();
    format!("{}\t{}\t{}\t{highlighted}", hit.entry.id, hit.rank, hit.field)
}

/// Prints a password for `generate` when no vault is open.
///
/// # Errors
/// Fails on zero length or a write failure.
pub fn generate(length: usize, out: &mut impl Write) -> Result<()> {
    if length == 0 {
        bail!("Password length must be at least 1");
    }
    writeln!(out, "{}", generate_password(length))?;
    Ok(())
}
