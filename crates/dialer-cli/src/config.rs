//! Config - 起動設定
//!
//! コマンドライン引数と環境変数（`.env` を含む）から `Settings` を組み立てます。
//!
//! # 方針
//! - 環境変数の解決は clap に任せ、`into_settings` は値の検証と組み立てだけを行う
//! - `--dry-run` では Twilio の認証情報を要求しない

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use dialer_core::DialerConfig;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "dialer", about = "Sequential outbound dialer with a small control API")]
pub struct Cli {
    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Public URL the provider uses to reach this service.
    #[arg(long, env = "PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub account_sid: Option<String>,

    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Caller id for outbound calls.
    #[arg(long, env = "TWILIO_PHONE_NUMBER")]
    pub from_number: Option<String>,

    #[arg(long, env = "TWILIO_API_BASE", default_value = "https://api.twilio.com")]
    pub api_base: String,

    /// JSON file with the numbers to dial.
    #[arg(long, env = "NUMBERS_PATH", default_value = "./numbers.json")]
    pub numbers: PathBuf,

    /// Directory served as the operator panel.
    #[arg(long, env = "PUBLIC_DIR", default_value = "./public")]
    pub public_dir: PathBuf,

    /// Record calls instead of placing them.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid bind host {0:?}")]
    InvalidHost(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioCredentials {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Twilio(TwilioCredentials),
    DryRun,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub numbers: PathBuf,
    pub public_dir: PathBuf,
    pub provider: Provider,
    pub dialer: DialerConfig,
}

impl Cli {
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let host: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        let base_url = non_empty(self.public_base_url).ok_or(ConfigError::Missing("PUBLIC_BASE_URL"))?;

        let (provider, caller_id) = if self.dry_run {
            let caller_id = non_empty(self.from_number).unwrap_or_else(|| "dry-run".to_string());
            (Provider::DryRun, caller_id)
        } else {
            let account_sid =
                non_empty(self.account_sid).ok_or(ConfigError::Missing("TWILIO_ACCOUNT_SID"))?;
            let auth_token =
                non_empty(self.auth_token).ok_or(ConfigError::Missing("TWILIO_AUTH_TOKEN"))?;
            let caller_id =
                non_empty(self.from_number).ok_or(ConfigError::Missing("TWILIO_PHONE_NUMBER"))?;
            let credentials = TwilioCredentials {
                api_base: self.api_base.trim_end_matches('/').to_string(),
                account_sid,
                auth_token,
            };
            (Provider::Twilio(credentials), caller_id)
        };

        Ok(Settings {
            bind: SocketAddr::new(host, self.port),
            numbers: self.numbers,
            public_dir: self.public_dir,
            provider,
            dialer: DialerConfig::from_base_url(caller_id, &base_url),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
