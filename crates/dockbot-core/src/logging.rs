use tracing_subscriber::EnvFilter;

use crate::errors::Result;

/// Initialize the tracing subscriber for a binary.
///
/// `RUST_LOG` takes precedence when set; otherwise every workspace crate
/// logs at `info`.
pub fn init(service_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,dockbot=info,dockbot_core=info,dockbot_docker=info,dockbot_telegram=info,{service_name}=info"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .init();

    Ok(())
}
