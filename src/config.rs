//! Server configuration.
//!
//! Layers, lowest priority first: built-in defaults, an optional JSON file,
//! `TILED_*` environment variables, command-line flags.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON catalog document; the built-in demo tree is served when unset.
    pub catalog_path: Option<PathBuf>,
    pub allow_anonymous_access: bool,
    /// username -> token, registered before the first request.
    pub bootstrap_tokens: BTreeMap<String, String>,
    pub admin_users: Vec<String>,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub request_timeout_secs: u64,
    pub compute_timeout_secs: u64,
    pub max_concurrent_computations: usize,
    pub max_response_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            catalog_path: None,
            allow_anonymous_access: false,
            bootstrap_tokens: BTreeMap::new(),
            admin_users: vec!["admin".to_string()],
            default_page_limit: 10,
            max_page_limit: 300,
            request_timeout_secs: 60,
            compute_timeout_secs: 30,
            max_concurrent_computations: 4,
            max_response_bytes: 256 * 1024 * 1024,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Overlay `TILED_*` variables read through `lookup`. Unparseable values
    /// are an error rather than silently ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(h) = lookup("TILED_HOST") {
            self.host = h;
        }
        if let Some(p) = lookup("TILED_PORT") {
            self.port = p.parse().with_context(|| format!("TILED_PORT={p:?} is not a port number"))?;
        }
        if let Some(c) = lookup("TILED_CATALOG") {
            self.catalog_path = Some(PathBuf::from(c));
        }
        if let Some(a) = lookup("TILED_ALLOW_ANONYMOUS") {
            match parse_bool(&a) {
                Some(b) => self.allow_anonymous_access = b,
                None => bail!("TILED_ALLOW_ANONYMOUS={a:?} is not a boolean"),
            }
        }
        if let Some(t) = lookup("TILED_SINGLE_USER_TOKEN") {
            let user = self.admin_users.first().cloned().unwrap_or_else(|| "admin".to_string());
            self.bootstrap_tokens.insert(user, t);
        }
        Ok(())
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_limit == 0 {
            bail!("max_page_limit must be positive");
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            bail!(
                "default_page_limit must be between 1 and max_page_limit ({}), got {}",
                self.max_page_limit,
                self.default_page_limit
            );
        }
        if self.request_timeout_secs == 0 || self.compute_timeout_secs == 0 {
            bail!("timeouts must be positive");
        }
        if self.max_concurrent_computations == 0 {
            bail!("max_concurrent_computations must be positive");
        }
        if self.max_response_bytes == 0 {
            bail!("max_response_bytes must be positive");
        }
        for (user, token) in &self.bootstrap_tokens {
            if token.is_empty() {
                bail!("bootstrap token for {user} is empty");
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// Command line of the server binary.
#[derive(Debug, Parser)]
#[command(name = "tiled_server", version, about = "Serve a catalog of chunked arrays over HTTP")]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, env = "TILED_CONFIG")]
    pub config: Option<PathBuf>,
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,
    /// Port to bind
    #[arg(long, short)]
    pub port: Option<u16>,
    /// JSON catalog document to serve
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Let unauthenticated clients read
    #[arg(long)]
    pub public: bool,
    /// Upper bound on concurrently computing blocks
    #[arg(long)]
    pub workers: Option<usize>,
    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Cli {
    pub fn into_config(self) -> Result<ServerConfig> {
        self.into_config_with(|k| std::env::var(k).ok())
    }

    pub fn into_config_with<F>(self, env: F) -> Result<ServerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match &self.config {
            Some(path) => ServerConfig::load_file(path)?,
            None => ServerConfig::default(),
        };
        cfg.apply_env(env)?;
        if let Some(h) = self.host {
            cfg.host = h;
        }
        if let Some(p) = self.port {
            cfg.port = p;
        }
        if let Some(c) = self.catalog {
            cfg.catalog_path = Some(c);
        }
        if self.public {
            cfg.allow_anonymous_access = true;
        }
        if let Some(w) = self.workers {
            cfg.max_concurrent_computations = w;
        }
        if let Some(t) = self.timeout {
            cfg.request_timeout_secs = t;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ServerConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.default_page_limit, 10);
    }

    #[test]
    fn flags_beat_env_beat_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"port": 9000, "host": "0.0.0.0", "max_page_limit": 50}}"#).unwrap();
        let cli = Cli::parse_from(["tiled_server", "--config", f.path().to_str().unwrap(), "--port", "9100"]);
        let cfg = cli.into_config_with(env(&[("TILED_PORT", "9050"), ("TILED_ALLOW_ANONYMOUS", "yes")])).unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.max_page_limit, 50);
        assert!(cfg.allow_anonymous_access);
    }

    #[test]
    fn single_user_token_goes_to_first_admin() {
        let mut cfg = ServerConfig::default();
        cfg.apply_env(env(&[("TILED_SINGLE_USER_TOKEN", "secret")])).unwrap();
        assert_eq!(cfg.bootstrap_tokens.get("admin").map(String::as_str), Some("secret"));
    }

    #[test]
    fn bad_values_rejected() {
        let mut cfg = ServerConfig::default();
        assert!(cfg.apply_env(env(&[("TILED_PORT", "http")])).is_err());
        let cfg = ServerConfig { default_page_limit: 500, ..ServerConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
