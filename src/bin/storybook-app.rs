use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use axum::response::Html;
use clap::Parser;
use tower_http::services::{ServeDir, ServeFile};

use storybook::app::{AppState, router};
use storybook::gemini::{GeminiClient, GeminiConfig};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Static web assets directory (serve if exists).
    #[arg(long, default_value = "web/dist")]
    web_dir: PathBuf,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    storybook::logging::init_server()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting storybook-app");

    let config = GeminiConfig::from_env();
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; generation requests will fail");
    }
    tracing::info!(
        model = %config.model,
        tts_enabled = config.tts_enabled,
        "gemini configured"
    );
    let gemini = GeminiClient::new(config).context("build gemini client")?;

    let mut app = router(AppState::new(gemini));

    let web_index = args.web_dir.join("index.html");
    if web_index.exists() {
        let static_files = ServeDir::new(&args.web_dir).not_found_service(ServeFile::new(web_index));
        app = app.fallback_service(static_files);
    } else {
        app = app.fallback(|| async {
            Html(
                r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>storybook-app</title></head>
  <body>
    <h1>storybook-app</h1>
    <p>web assets not found. Build the web app into <code>web/dist</code> or pass <code>--web-dir</code>.</p>
  </body>
</html>
"#,
            )
        });
    }

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
