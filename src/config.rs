use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;
const MIN_PORT: u16 = 1024;
const MAX_PORT: u16 = 49151;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: PathBuf,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Simple Storage Service: buckets and objects over HTTP")]
pub struct Args {
    /// Host to bind to (overrides SIMPLE_STORAGE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port number, 1024-49151 (overrides SIMPLE_STORAGE_PORT)
    #[arg(long)]
    pub port: Option<u32>,

    /// Directory holding bucket data and catalogs (overrides SIMPLE_STORAGE_DIR)
    #[arg(long = "dir")]
    pub storage_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge parsed CLI args with values from `lookup` (the environment in
    /// production). CLI wins over environment, environment over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_host = lookup("SIMPLE_STORAGE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match lookup("SIMPLE_STORAGE_PORT") {
            Some(value) => value
                .parse::<u32>()
                .with_context(|| format!("parsing SIMPLE_STORAGE_PORT value `{}`", value))?,
            None => u32::from(DEFAULT_PORT),
        };
        let env_storage = lookup("SIMPLE_STORAGE_DIR").unwrap_or_else(|| "data".into());

        let requested = args.port.unwrap_or(env_port);
        let port = match u16::try_from(requested) {
            Ok(port) if (MIN_PORT..=MAX_PORT).contains(&port) => port,
            _ => {
                tracing::warn!(
                    "Port {} is outside {}-{}; using {}",
                    requested,
                    MIN_PORT,
                    MAX_PORT,
                    DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port,
            storage_dir: args.storage_dir.unwrap_or_else(|| PathBuf::from(env_storage)),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("simple-storage").chain(argv.iter().copied()))
            .unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let cfg = AppConfig::resolve(args(&[]), no_env).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:8080");
        assert_eq!(cfg.storage_dir, PathBuf::from("data"));
    }

    #[test]
    fn flags_override_environment() {
        let env = |name: &str| match name {
            "SIMPLE_STORAGE_PORT" => Some("9000".to_string()),
            "SIMPLE_STORAGE_DIR" => Some("/srv/env".to_string()),
            _ => None,
        };

        let cfg = AppConfig::resolve(args(&["--dir", "/srv/flag"]), env).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.storage_dir, PathBuf::from("/srv/flag"));

        let cfg = AppConfig::resolve(args(&["--port", "9100"]), env).unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.storage_dir, PathBuf::from("/srv/env"));
    }

    #[test]
    fn out_of_range_port_falls_back_to_default() {
        let cfg = AppConfig::resolve(args(&["--port", "80"]), no_env).unwrap();
        assert_eq!(cfg.port, 8080);

        let cfg = AppConfig::resolve(args(&["--port", "70000"]), no_env).unwrap();
        assert_eq!(cfg.port, 8080);

        let env = |name: &str| (name == "SIMPLE_STORAGE_PORT").then(|| "65536".to_string());
        let cfg = AppConfig::resolve(args(&[]), env).unwrap();
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn unparsable_env_port_is_an_error() {
        let env = |name: &str| (name == "SIMPLE_STORAGE_PORT").then(|| "http".to_string());
        assert!(AppConfig::resolve(args(&[]), env).is_err());
    }
}
