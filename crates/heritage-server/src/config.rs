//! Runtime configuration, deserialised from `config.toml` layered with
//! `HERITAGE_*` environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime server configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  /// Base URL under which `/media/{key}` is reachable from clients.
  pub public_url:            String,
  pub store_path:            PathBuf,
  pub media_dir:             PathBuf,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes:      usize,
  #[serde(default = "default_janitor_interval_secs")]
  pub janitor_interval_secs: u64,
  pub mail_from:             String,
  /// When unset, notification emails are only logged.
  #[serde(default)]
  pub mail_webhook_url:      Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_max_upload_bytes() -> usize { 25 * 1024 * 1024 }

fn default_janitor_interval_secs() -> u64 { 300 }

impl ServerConfig {
  /// Load from an optional file plus the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("HERITAGE"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// Expand `~` in the filesystem paths.
  pub fn expand_paths(mut self) -> Self {
    self.store_path = expand_tilde(&self.store_path);
    self.media_dir = expand_tilde(&self.media_dir);
    self
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_fill_optional_fields() {
    let cfg = parse(
      r#"
        public_url = "http://localhost:8080"
        store_path = "heritage.db"
        media_dir  = "media"
        mail_from  = "registry@example.org"
      "#,
    );
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.janitor_interval_secs, 300);
    assert_eq!(cfg.max_upload_bytes, 25 * 1024 * 1024);
    assert!(cfg.mail_webhook_url.is_none());
  }

  #[test]
  fn explicit_values_win() {
    let cfg = parse(
      r#"
        host                  = "0.0.0.0"
        port                  = 9000
        public_url            = "https://heritage.example.org"
        store_path            = "/var/lib/heritage.db"
        media_dir             = "/var/lib/media"
        janitor_interval_secs = 60
        mail_from             = "registry@example.org"
        mail_webhook_url      = "https://mail.example.org/send"
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.janitor_interval_secs, 60);
    assert_eq!(
      cfg.mail_webhook_url.as_deref(),
      Some("https://mail.example.org/send")
    );
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/heritage.db")),
      PathBuf::from(home).join("heritage.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs/x")), PathBuf::from("/abs/x"));
  }
}
