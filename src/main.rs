use clap::Parser;
use survey_designer::commands::{self, Cli};
use survey_designer::logging;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("survey-designer error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    commands::dispatch(cli).await?;
    Ok(())
}
