//! Vault module: encrypted record storage.
//!
//! This module provides:
//! - The `Records` map type and input validation (`record`)
//! - The authenticated blob codec (`format`)
//! - `VaultFile`, atomic persistence of the blob (`store`)

pub mod format;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use format::{decode, encode};
pub use record::{validate_record, Records};
pub use store::VaultFile;
