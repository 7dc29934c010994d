pub mod args;
pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod frontend;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod processor;
pub mod render;
pub mod router;
pub mod shutdown;
pub mod subject;
