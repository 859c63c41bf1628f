use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{info, warn};

use vpr_core::{
    config::Config,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    relay::Relay,
};
use vpr_http::ReqwestHttpClient;

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub messenger: Arc<dyn MessagingPort>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!("vpr started: @{}", me.username()),
        Err(e) => warn!("get_me failed, continuing: {e}"),
    }
    info!(
        source = cfg.source_channel_id,
        target = cfg.target_channel_id,
        shortener = %cfg.shortener_host,
        max_depth = cfg.max_resolve_depth,
        "monitoring for short links"
    );

    let http = Arc::new(ReqwestHttpClient::new(&cfg.user_agent)?);
    let relay = Arc::new(Relay::new(cfg, http)?);

    // Throttle in front of the raw messenger; the adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState {
        relay,
        messenger,
    });

    let handler = dptree::entry()
        .branch(Update::filter_channel_post().endpoint(handlers::handle_post))
        .branch(Update::filter_message().endpoint(handlers::handle_post));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
