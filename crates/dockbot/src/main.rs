use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use dockbot_core::{
    compose::StackLauncher, config::Config, dispatch::Dispatcher, memory::MemoryMonitor,
};
use dockbot_docker::{
    compose::{ComposeCli, GitFetcher},
    DockerEngine,
};

#[tokio::main]
async fn main() -> Result<(), dockbot_core::Error> {
    dockbot_core::logging::init("dockbot")?;

    let cfg = Arc::new(Config::load()?);

    let engine = Arc::new(DockerEngine::connect()?);
    engine.ping().await?;
    info!("Connected to the Docker daemon");

    let stacks = StackLauncher::new(
        Arc::new(GitFetcher),
        Arc::new(ComposeCli),
        cfg.compose_work_dir.clone(),
        cfg.compose_keep_failed,
    );
    let commands = Arc::new(Dispatcher::new(cfg.clone(), engine, stacks));

    let cancel = CancellationToken::new();
    let monitor = MemoryMonitor::new(cfg.memory_check_interval, cfg.memory_warn_percent)
        .spawn(cancel.clone());

    dockbot_telegram::router::run_polling(cfg, commands)
        .await
        .map_err(|e| dockbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    cancel.cancel();
    let _ = monitor.await;

    Ok(())
}
