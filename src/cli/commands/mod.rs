//! One module per subcommand.

pub mod forget;
pub mod serve;
pub mod status;
