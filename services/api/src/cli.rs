use crate::commands::{run_import, run_score, ImportArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use waste_compliance::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Waste Compliance Service",
    about = "Import municipal service exports and score contract compliance",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Reconcile one export into a fresh store and print the counts
    Import(ImportArgs),
    /// Score a reporting window from request and inspection exports
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Import(args) => run_import(args),
        Command::Score(args) => run_score(args),
    }
}
