//! # Observability 基盤
//!
//! `send-email` などのプロセスが起動時に一度だけ呼ぶトレーシング初期化。
//!
//! - 出力形式は `LOG_FORMAT`（`json` / `pretty`）で切り替える
//! - ログレベルは `RUST_LOG`、未設定なら [`DEFAULT_FILTER`]
//! - 初期化に成功すると、サービス名と出力形式を起動ログとして 1 行出力する

#[cfg(feature = "observability")]
use tracing_subscriber::{
    EnvFilter,
    Layer as _,
    fmt::{self, MakeWriter},
    layer::SubscriberExt as _,
    util::{SubscriberInitExt as _, TryInitError},
};

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,eventmanager=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 イベント 1 行の JSON（集約基盤向け）
    Json,
    /// 端末向けのテキスト
    #[default]
    Pretty,
}

impl LogFormat {
    /// 前後の空白と大文字小文字は無視する。
    ///
    /// 不明な値は `Pretty` として扱い、stderr に警告する
    /// （subscriber 初期化前に呼ばれるため tracing には出せない）。
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 起動ログの `service` フィールドに出力するプロセス名
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    /// 出力形式のみ `LOG_FORMAT` から決める
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }
}

/// グローバル subscriber を設定し、起動ログを出力する
///
/// 既に設定済みの場合は [`TryInitError`] を返し、起動ログは出さない。
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    build_subscriber(config, filter, std::io::stdout).try_init()?;
    log_startup(config);
    Ok(())
}

#[cfg(feature = "observability")]
fn build_subscriber<W>(
    config: &TracingConfig,
    filter: EnvFilter,
    writer: W,
) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry().with(filter).with(fmt_layer)
}

#[cfg(feature = "observability")]
fn log_startup(config: &TracingConfig) {
    tracing::info!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "トレーシングを初期化"
    );
}
