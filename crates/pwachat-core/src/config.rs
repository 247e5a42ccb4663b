use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 19999;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const KEEPALIVE_INTERVAL_SECS: u64 = 30; // transport ping cadence per socket
pub const STREAMING_TIMEOUT_SECS: u64 = 30; // sliding window before a quiet stream is force-ended
pub const HISTORY_LIMIT: usize = 500; // persisted messages per user key
pub const EVENT_BUFFER_CAPACITY: usize = 500; // replayable events per user key
pub const MAX_PAYLOAD_BYTES: usize = 128 * 1024; // larger inbound frames are dropped, not fatal

/// Subdirectories of the state root.
pub const HISTORY_DIR: &str = "pwa-chat-history";
pub const PUSH_DIR: &str = "pwa-chat-push";

/// Top-level config (`pwa-chat.toml` + `PWACHAT_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Root directory for on-disk state. Defaults to `$HOME/.openclaw`.
    #[serde(default)]
    pub state_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    #[serde(rename = "pwa-chat", default)]
    pub pwa_chat: PwaChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwaChatConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for PwaChatConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared secret required from non-loopback, non-proxied clients.
    /// When unset, every connection is accepted.
    pub token: Option<String>,
}

fn default_enabled() -> bool {
    true
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}

impl RelayConfig {
    /// Load config from a TOML file with `PWACHAT_*` env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. `$HOME/.openclaw/pwa-chat.toml`
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RelayConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PWACHAT_").split("_"))
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;

        Ok(config)
    }

    /// The configured state root, if any. Callers fall back to the agent
    /// runtime's store path and then to [`default_state_dir`].
    pub fn state_dir(&self) -> Option<PathBuf> {
        self.state_dir.as_ref().map(PathBuf::from)
    }

    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.channels.pwa_chat.host, self.channels.pwa_chat.port
        )
    }
}

pub fn default_state_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".openclaw")
}

fn default_config_path() -> String {
    default_state_dir()
        .join("pwa-chat.toml")
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert!(config.channels.pwa_chat.enabled);
        assert_eq!(config.channels.pwa_chat.host, "127.0.0.1");
        assert_eq!(config.channels.pwa_chat.port, 19999);
        assert!(config.gateway.auth.token.is_none());
    }

    #[test]
    fn parses_hyphenated_channel_table() {
        let toml = r#"
            [channels.pwa-chat]
            enabled = false
            port = 8081

            [gateway.auth]
            token = "secret"
        "#;
        let config: RelayConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .expect("config should parse");
        assert!(!config.channels.pwa_chat.enabled);
        assert_eq!(config.channels.pwa_chat.port, 8081);
        assert_eq!(config.channels.pwa_chat.host, "127.0.0.1");
        assert_eq!(config.gateway.auth.token.as_deref(), Some("secret"));
    }

    #[test]
    fn bind_addr_combines_host_and_port() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:19999");
    }
}
