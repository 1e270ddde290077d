//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{load_config, BalancerConfig, ConfigError};

#[derive(Debug, Parser)]
#[command(name = "rr-balancer")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds between health check rounds
    #[arg(short = 't', long)]
    pub health_check_interval: Option<u64>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Backend addresses; replace the ones from the config file
    pub backends: Vec<String>,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides.
    pub fn load_config(&self) -> Result<BalancerConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => BalancerConfig::default(),
        };
        Ok(self.apply(config))
    }

    fn apply(&self, mut config: BalancerConfig) -> BalancerConfig {
        if !self.backends.is_empty() {
            config.backends = self.backends.clone();
        }
        if let Some(secs) = self.health_check_interval {
            config.health_check.interval_secs = secs;
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_backends_and_interval() {
        let cli = Cli::try_parse_from(["rr-balancer", "-t", "3", "127.0.0.1:3001", "127.0.0.1:3002"]).unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.backends, ["127.0.0.1:3001", "127.0.0.1:3002"]);
        assert_eq!(config.health_check.interval_secs, 3);
        assert_eq!(config.listener.bind_address, "0.0.0.0:80");
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["rr-balancer"]).unwrap();
        let config = cli.load_config().unwrap();
        assert!(config.backends.is_empty());
        assert_eq!(config.health_check.interval_secs, 5);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let file = BalancerConfig {
            backends: vec!["10.0.0.1:80".into()],
            ..BalancerConfig::default()
        };
        let cli = Cli::try_parse_from(["rr-balancer", "--bind", "127.0.0.1:9000", "-l", "debug"]).unwrap();
        let config = cli.apply(file);

        assert_eq!(config.backends, ["10.0.0.1:80"]);
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["rr-balancer", "-c", "/no/such/balancer.toml"]).unwrap();
        assert!(matches!(cli.load_config(), Err(ConfigError::Io(_))));
    }
}
