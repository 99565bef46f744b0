//! # Notifier 設定
//!
//! 環境変数から通知メールの送信設定を読み込む。
//! プロセス起動時に一度だけ読み込み、`EmailNotifier` のコンストラクタに渡す。

use std::{env, path::PathBuf, str::FromStr};

use eventmanager_infra::{SmtpConfig, SmtpSecurity};
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 値の形式が不正
    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// メールの送信先トランスポート
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MailTransportKind {
    /// SMTP サーバー経由で送信する
    #[default]
    Smtp,
    /// 送信せずログのみ出力する（SMTP のない開発環境向け）
    Noop,
}

/// Notifier の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    /// 送信先トランスポート
    pub transport:       MailTransportKind,
    /// SMTP 接続設定
    pub smtp:            SmtpConfig,
    /// サーバーのベース URL（確認メールのリンク用、末尾 `/` 込み）
    pub server_base_url: String,
    /// テンプレートディレクトリ（未設定なら埋め込みテンプレートを使う）
    pub templates_dir:   Option<PathBuf>,
}

impl NotifierConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// | 変数名 | デフォルト |
    /// |--------|-----------|
    /// | `MAIL_TRANSPORT` | `smtp`（`noop` でログ出力のみ） |
    /// | `SMTP_SERVER` | `localhost` |
    /// | `SMTP_PORT` | `587` |
    /// | `SMTP_USERNAME` | 空文字 |
    /// | `SMTP_PASSWORD` | 空文字 |
    /// | `SMTP_FROM_ADDRESS` | `SMTP_USERNAME` の値 |
    /// | `SMTP_SECURITY` | `starttls`（`none` で平文） |
    /// | `SERVER_BASE_URL` | `http://localhost:8000/` |
    /// | `EMAIL_TEMPLATES_DIR` | なし |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let transport = match lookup("MAIL_TRANSPORT") {
            Some(value) => {
                MailTransportKind::from_str(&value).map_err(|_| ConfigError::Invalid {
                    name: "MAIL_TRANSPORT",
                    value,
                })?
            }
            None => MailTransportKind::default(),
        };

        let port = match lookup("SMTP_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "SMTP_PORT",
                value,
            })?,
            None => 587,
        };

        let security = match lookup("SMTP_SECURITY") {
            Some(value) => SmtpSecurity::from_str(&value).map_err(|_| ConfigError::Invalid {
                name: "SMTP_SECURITY",
                value,
            })?,
            None => SmtpSecurity::default(),
        };

        let username = lookup("SMTP_USERNAME").unwrap_or_default();
        let from_address = lookup("SMTP_FROM_ADDRESS").unwrap_or_else(|| username.clone());

        Ok(Self {
            transport,
            smtp: SmtpConfig {
                server: lookup("SMTP_SERVER").unwrap_or_else(|| "localhost".to_string()),
                port,
                username,
                password: lookup("SMTP_PASSWORD").unwrap_or_default(),
                from_address,
                security,
            },
            server_base_url: lookup("SERVER_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8000/".to_string()),
            templates_dir: lookup("EMAIL_TEMPLATES_DIR").map(PathBuf::from),
        })
    }
}
