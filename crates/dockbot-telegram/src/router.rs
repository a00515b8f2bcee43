use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use dockbot_core::config::Config;
use dockbot_core::dispatch::Dispatcher as CommandDispatcher;
use dockbot_core::messaging::port::MessagingPort;
use dockbot_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub commands: Arc<CommandDispatcher>,
    pub messenger: Arc<dyn MessagingPort>,
}

pub async fn run_polling(cfg: Arc<Config>, commands: Arc<CommandDispatcher>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        info!("dockbot started: @{}", me.username());
    }
    info!("Containers in skip list: {}", commands.skip_list_len());
    info!("Compose workspace root: {}", cfg.compose_work_dir.display());

    // Wrap the raw Telegram messenger with a throttling decorator to reduce 429s.
    // We still keep a 429 RetryAfter retry at the Telegram adapter layer.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        commands,
        messenger,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut tg = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    // SIGINT and SIGTERM both resolve to the same shutdown token: polling stops
    // while in-flight handlers run to completion before `dispatch` returns.
    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown = tg.shutdown_token();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("Received shutdown signal, exiting...");
        if let Ok(wait) = shutdown.shutdown() {
            wait.await;
        }
    });

    tg.dispatch().await;

    Ok(())
}
