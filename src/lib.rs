pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod escrow;
pub mod gateway;
pub mod logging;
pub mod server;
pub mod session;
pub mod vault;
