use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    storybook::logging::init().context("init logging")?;

    let cli = storybook::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        storybook::cli::Command::Generate(args) => {
            storybook::generate::run(args).await.context("generate")?;
        }
        storybook::cli::Command::Normalize(args) => {
            storybook::normalize::run(args).context("normalize")?;
        }
        storybook::cli::Command::Play(args) => {
            storybook::viewer::run(args).await.context("play")?;
        }
        storybook::cli::Command::Export(args) => {
            storybook::export::run(args).context("export")?;
        }
    }

    Ok(())
}
