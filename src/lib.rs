pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod ranker;
pub mod server;
pub mod vocabulary;
pub mod wire_logger;
