use absconditus::cli::{Cli, Commands};
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => absconditus::cli::commands::serve::execute(&cli, port),
        Commands::Status => absconditus::cli::commands::status::execute(&cli),
        Commands::Forget => absconditus::cli::commands::forget::execute(&cli),
    };

    if let Err(e) = result {
        absconditus::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
