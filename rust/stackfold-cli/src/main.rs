//! Stackfold CLI: fold a JVM thread dump read from a file or standard input.

use clap::Parser as ClapParser;
use stackfold_cli::colors::red;
use stackfold_cli::error_chain::chain_from_error;
use stackfold_cli::{run, Cli};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "STACKFOLD_LOG";

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = run(&cli, &mut stdin.lock(), &mut stdout.lock()) {
        eprintln!("{}", chain_from_error(&e).format_with_prefix(&red("error:")));
        std::process::exit(1);
    }
}
