//! `absconditus serve`: run the loopback API until interrupted.

use std::sync::Arc;

use crate::cli::output;
use crate::cli::{load_settings, Cli};
use crate::errors::{Result, VaultError};
use crate::session::VaultSession;
use crate::{logging, server};

/// Execute the `serve` command.
pub fn execute(cli: &Cli, port: Option<u16>) -> Result<()> {
    let mut settings = load_settings(cli)?;
    if let Some(port) = port {
        settings.port = port;
    }

    logging::init(&settings.log_filter)?;

    let session = Arc::new(VaultSession::open(&settings)?);

    if session.auto_unlock_on_startup() {
        output::success("Vault unlocked from the escrowed key.");
    } else {
        output::info("Vault is locked. Unlock it from the app or the browser extension.");
    }

    output::info(&format!(
        "Listening on http://{}:{}",
        settings.bind_address, settings.port
    ));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| VaultError::ServerError(format!("failed to start runtime: {e}")))?;

    runtime.block_on(server::serve(&settings, session))
}
