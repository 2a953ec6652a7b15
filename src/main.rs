use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use skillport::cli::{self, Cli};

fn main() {
    // Logs go to stderr: in JSON mode stdout carries exactly one envelope.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    std::process::exit(cli::run(cli));
}
