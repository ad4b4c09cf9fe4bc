//! Configuration: `absconditus.toml` in the data directory.

pub mod settings;

pub use settings::{default_data_dir, Settings};
