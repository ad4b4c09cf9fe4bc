//! `absconditus forget`: delete the escrowed key while the server is down.

use std::fs;
use std::io;

use crate::cli::output;
use crate::cli::{load_settings, Cli};
use crate::errors::Result;
use crate::escrow;

/// Execute the `forget` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let path = settings.escrow_path();
    let existed = path.exists();

    escrow::platform(&settings).discard()?;

    // Builds without an escrow backend still clean up a file left by one.
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if existed {
        output::success("Escrowed key removed. The next start waits for the master password.");
    } else {
        output::info("No escrowed key to remove.");
    }

    Ok(())
}
