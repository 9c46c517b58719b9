//! Command line and configuration loading.

use std::path::{Path, PathBuf};

use anyhow::Context;
use binex_types::{NodeConfig, StoreConfig};
use clap::Parser;

/// Binex exchange node.
#[derive(Debug, Parser)]
#[command(name = "binex-node", version, about)]
pub struct Cli {
    /// JSON configuration file. Every field is optional.
    #[arg(long, env = "BINEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Accept CANCEL commands.
    #[arg(long, env = "BINEX_CANCEL_ENABLED")]
    pub cancel_enabled: Option<bool>,

    #[arg(long, env = "BINEX_SNAPSHOT_INTERVAL_MS")]
    pub snapshot_interval_ms: Option<u64>,

    /// Keep snapshots in this directory instead of the configured store.
    #[arg(long, env = "BINEX_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<String>,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "BINEX_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, env = "BINEX_LOG_JSON")]
    pub log_json: Option<bool>,

    /// Read command envelopes from stdin, one JSON object per line, and
    /// write each result to stdout.
    #[arg(long)]
    pub stdin: bool,
}

impl Cli {
    /// File config (or defaults) with command line and env overrides on top.
    pub fn load(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => NodeConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut NodeConfig) {
        if let Some(enabled) = self.cancel_enabled {
            config.engine.cancel_enabled = enabled;
        }
        if let Some(interval) = self.snapshot_interval_ms {
            config.snapshot.interval_ms = interval;
        }
        if let Some(root) = &self.snapshot_dir {
            config.snapshot.store = StoreConfig::Local { root: root.clone() };
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if let Some(json) = self.log_json {
            config.logging.json = json;
        }
    }
}

fn read_config(path: &Path) -> anyhow::Result<NodeConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("binex-node").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_file_means_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.load().unwrap(), NodeConfig::default());
        assert!(!cli.stdin);
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "engine": {{ "cancel_enabled": false, "price_window": 4 }},
                  "snapshot": {{ "interval_ms": 500, "store": {{ "backend": "memory" }} }} }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path]).load().unwrap();
        assert_eq!(config.engine.price_window, 4);
        assert_eq!(config.snapshot.store, StoreConfig::Memory);

        let config = parse(&[
            "--config",
            path,
            "--cancel-enabled",
            "true",
            "--snapshot-interval-ms",
            "2000",
            "--snapshot-dir",
            "/var/lib/binex",
            "--log-level",
            "debug",
        ])
        .load()
        .unwrap();
        assert!(config.engine.cancel_enabled);
        assert_eq!(config.engine.price_window, 4);
        assert_eq!(config.snapshot.interval_ms, 2000);
        assert_eq!(
            config.snapshot.store,
            StoreConfig::Local {
                root: "/var/lib/binex".into()
            }
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = parse(&["--config", file.path().to_str().unwrap()])
            .load()
            .unwrap_err();
        assert!(err.to_string().starts_with("parsing config"));
        assert!(parse(&["--config", "/nonexistent/binex.json"]).load().is_err());
    }
}
