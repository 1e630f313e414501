//! dialer - 発信キューの HTTP フロントエンド
//!
//! # 構成
//! - 設定は環境変数 / `.env` / コマンドライン引数から読む
//! - `--dry-run` では実際の発信を行わず、記録用プロバイダで動かす
//! - 操作パネルは `--public-dir`（既定 `./public`）から配信する
//! - 終了時は発信を止め、生きている通話を切断してから抜ける

mod config;
mod http;
mod twilio;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use dialer_core::DialerBuilder;
use dialer_core::impls::{JsonFileTargetSource, RecordingTelephony};
use dialer_core::ports::Telephony;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Provider};
use crate::twilio::TwilioTelephony;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Cli::parse().into_settings()?;

    let telephony: Arc<dyn Telephony> = match settings.provider {
        Provider::Twilio(credentials) => Arc::new(TwilioTelephony::new(credentials)?),
        Provider::DryRun => {
            warn!("dry run: calls are recorded, not placed");
            Arc::new(RecordingTelephony::new())
        }
    };

    let engine = DialerBuilder::new()
        .telephony(telephony)
        .target_source(Arc::new(JsonFileTargetSource::new(&settings.numbers)))
        .config(settings.dialer)
        .build()?;
    let engine = Arc::new(engine);

    let listener = TcpListener::bind(settings.bind).await?;
    info!(addr = %settings.bind, numbers = %settings.numbers.display(), "dialer listening");

    axum::serve(listener, http::router(engine.clone(), &settings.public_dir))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.stop().await?;
    info!("dialer shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
    }
}
