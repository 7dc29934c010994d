//! Ledger processor: request events in, response events out.

use anyhow::Result;

use popple::bus::NatsBus;
use popple::config::Config;
use popple::ledger::{Ledger, SqliteStore};
use popple::logging::{info, obj, v_str, Domain};
use popple::processor::Processor;
use popple::shutdown;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let store = SqliteStore::open(&cfg.db_path)?;
    info(Domain::System, "starting", obj(&[("db_path", v_str(&cfg.db_path))]));

    let bus = NatsBus::connect(&cfg, "popplesvc").await?;
    let processor = Processor::new(Ledger::new(store));

    let (trigger, stop) = shutdown::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info(Domain::System, "interrupted", obj(&[]));
        trigger.fire();
    });

    processor.run(&bus, &cfg.request_subject, stop).await
}
