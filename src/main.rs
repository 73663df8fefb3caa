use clap::Parser;
use pmp_workflow_versioning::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate(args) => cli::validate::run(args).await,
        Command::Compare(args) => cli::compare::run(args).await,
        Command::Plan(args) => cli::plan::run(args).await,
        Command::Simulate(args) => cli::simulate::run(args).await,
    }
}
