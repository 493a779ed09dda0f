//! Process wiring for the NFSv4 server (§4.12): configuration loading,
//! crash recovery and grace-period startup, the accept loop, and the
//! background threads that keep lock/lease/session state clean. The
//! wire-level opcode dispatch itself lives in [`compound`][nfs4d_compound]
//! and [`rpc`][nfs4d_rpc]; this crate is the part that turns those into a
//! running process.

pub mod background;
pub mod config;
pub mod connection;
pub mod error;
pub mod server;
pub mod wire;

pub use config::{AuthConfig, Config, LogFormat};
pub use error::{ServerError, ServerResult};
pub use server::Server;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber per `config.log_level` and
/// `config.log_format`. Call once, before [`Server::start`]; a second
/// call is a no-op (`try_init` swallows the "already set" error) rather
/// than a panic, so tests that build more than one `Config` in the same
/// process don't need to guard it themselves.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Pretty => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).json().try_init();
        }
    }
}
