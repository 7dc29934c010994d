//! Chat front-end: Discord in, request events out; response events in,
//! Discord out.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use popple::args::CommandParser;
use popple::bus::{Bus, NatsBus};
use popple::config::Config;
use popple::frontend::Frontend;
use popple::gateway::{DiscordRest, DiscordSession};
use popple::logging::{error, info, obj, v_str, Domain};
use popple::shutdown;

const INBOUND_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let token = cfg
        .discord_token
        .clone()
        .ok_or_else(|| anyhow!("POPPLEBOT_DISCORD_TOKEN is not set"))?;

    let bus: Arc<dyn Bus> = Arc::new(NatsBus::connect(&cfg, "popplebot").await?);
    let session = DiscordSession::connect(&cfg.discord_gateway_url, &token).await?;

    let prefix = cfg
        .mention_prefix
        .clone()
        .unwrap_or_else(|| format!("@{}", session.user().username));
    info(Domain::System, "starting", obj(&[("prefix", v_str(&prefix))]));

    let parser = CommandParser::new(prefix).with_default_limit(cfg.default_limit);
    let gateway = Arc::new(DiscordRest::new(&cfg.discord_api_base, token));
    let frontend = Arc::new(Frontend::new(parser, gateway, bus, cfg.request_subject.clone()));

    let (trigger, stop) = shutdown::channel();
    let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);

    let mut session_task = tokio::spawn(session.run(tx, stop.clone()));
    let inbound = tokio::spawn(frontend.clone().run_inbound(rx, stop.clone()));
    let responses = {
        let frontend = frontend.clone();
        let stop = stop.clone();
        tokio::spawn(async move { frontend.run_responses(stop).await })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info(Domain::System, "interrupted", obj(&[])),
        res = &mut session_task => match res {
            Ok(Ok(())) => info(Domain::Gateway, "session_ended", obj(&[])),
            Ok(Err(err)) => error(Domain::Gateway, "session_failed", obj(&[("msg", v_str(&err.to_string()))])),
            Err(err) => error(Domain::Gateway, "session_panicked", obj(&[("msg", v_str(&err.to_string()))])),
        },
    }

    trigger.fire();
    let _ = inbound.await;
    if let Ok(Err(err)) = responses.await {
        error(Domain::Bus, "consumer_failed", obj(&[("msg", v_str(&err.to_string()))]));
    }
    info(Domain::System, "stopped", obj(&[]));
    Ok(())
}
