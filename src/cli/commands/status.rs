//! `absconditus status`: report the on-disk state without unlocking.

use crate::cli::output;
use crate::cli::{load_settings, Cli};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;

    output::info(&format!("Data directory: {}", settings.data_dir.display()));
    output::file_line("salt", &settings.salt_path());
    output::file_line("vault", &settings.vault_path());
    output::file_line("escrow", &settings.escrow_path());

    output::info(&format!(
        "API address: {}:{}",
        settings.bind_address, settings.port
    ));

    if !settings.salt_path().exists() {
        output::tip("Run `absconditus serve` and unlock once to create the vault.");
    } else if settings.auto_unlock && settings.escrow_path().exists() {
        output::success("Auto-unlock material present; the next start unlocks automatically.");
    } else {
        output::info("No auto-unlock material; the next start waits for the master password.");
    }

    Ok(())
}
