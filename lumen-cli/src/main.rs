use anyhow::Result;
use clap::Parser;
use lumen_cli::{Cli, Commands, run_score, run_serve};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Score(args) => {
            let result = run_score(args).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
