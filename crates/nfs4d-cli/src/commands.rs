use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nfs4d_server::{init_logging, Config, Server};
use tracing::error;

use crate::cli::Cli;

/// Build the `Config` (TOML then CLI overrides, per §3), start the
/// server, and run the accept loop until a shutdown signal arrives.
/// Returns the process exit code from `ServerError::exit_code` (§6);
/// a clean shutdown exits 0.
pub fn run(cli: Cli) -> i32 {
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("nfs4d: {e}");
            return e.exit_code();
        }
    };

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(root) = cli.root {
        config.root_path = root;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    init_logging(&config);

    let server = match Server::start(config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to start");
            return e.exit_code();
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    install_signal_handler(stop.clone());

    match server.serve(stop) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "server exited with an error");
            e.exit_code()
        }
    }
}

/// Flip `stop` on SIGINT/SIGTERM so the accept loop drains instead of
/// dying mid-connection. `ctrlc` is the only signal-handling crate in
/// play here; this is a plain boolean handoff, not a second runtime.
fn install_signal_handler(stop: Arc<AtomicBool>) {
    let _ = ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    });
}
