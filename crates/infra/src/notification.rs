//! # メール送信
//!
//! メール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `MailTransport` trait でメール送信を抽象化
//! - **2 つの実装**: SMTP（lettre）、Noop（送信無効化用）
//! - **同期はトランスポート側の責務**: trait は `Send + Sync` を要求し、
//!   複数タスクからの同時送信は各実装が安全に扱う

mod noop;
mod smtp;

use async_trait::async_trait;
use eventmanager_domain::notification::{EmailMessage, NotificationError};
pub use noop::NoopMailTransport;
pub use smtp::{SmtpConfig, SmtpMailTransport, SmtpSecurity};

/// メール送信トレイト
///
/// 件名・HTML 本文・宛先を持つ [`EmailMessage`] を配送する。
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}
