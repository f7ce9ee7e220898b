use anyhow::Context as _;

/// CLI logging: `RUST_LOG` or `info`, to stderr so stdout stays machine-readable.
pub fn init() -> anyhow::Result<()> {
    init_with_default("info")
}

/// Server logging also surfaces request spans from `tower_http`.
pub fn init_server() -> anyhow::Result<()> {
    init_with_default("info,tower_http=debug")
}

fn init_with_default(default_directives: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_directives))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
