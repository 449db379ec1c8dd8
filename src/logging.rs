use anyhow::Context as _;

/// CDP handler noise (unknown events, ws parse errors) stays below `warn`
/// unless `RUST_LOG` asks for it.
const DEFAULT_DIRECTIVES: &str = "info,chromiumoxide=warn";

pub fn init() -> anyhow::Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(DEFAULT_DIRECTIVES)
            .context("build default log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install chapter log subscriber: {err}"))?;

    Ok(())
}
