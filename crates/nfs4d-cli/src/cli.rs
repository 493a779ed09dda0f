use std::path::PathBuf;

use clap::Parser;

/// Command-line launcher for the NFSv4 server (§4.13). Every flag here
/// is an override of a `Config` field; anything not passed falls back
/// to the TOML file (if given) and then the compiled-in defaults.
#[derive(Parser)]
#[command(name = "nfs4d", about = "NFSv4 server daemon", version)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override `port`.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override `root_path`, the directory exported as the NFSv4 root.
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Override `log_level` (a `tracing` `EnvFilter` directive).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["nfs4d"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
    }

    #[test]
    fn parse_overrides() {
        let cli = Cli::try_parse_from([
            "nfs4d",
            "--config",
            "/etc/nfs4d.toml",
            "--port",
            "3049",
            "--root",
            "/srv/export",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/nfs4d.toml")));
        assert_eq!(cli.port, Some(3049));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/export")));
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }
}
