//! # Event Manager インフラ層
//!
//! 外部システム（SMTP サーバー）との通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはメール送信の抽象 [`notification::MailTransport`] と
//! その具体的な実装を提供する。SMTP の詳細をカプセル化し、notifier を
//! トランスポートの変更から保護する。
//!
//! ## モジュール構成
//!
//! - [`notification`] - メール送信トレイトと SMTP / Noop 実装
//! - `mock` - テスト用のインメモリ実装（`test-utils` feature）

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;

pub use notification::{
    MailTransport,
    NoopMailTransport,
    SmtpConfig,
    SmtpMailTransport,
    SmtpSecurity,
};
