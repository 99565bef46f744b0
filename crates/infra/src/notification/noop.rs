//! Noop メール送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! SMTP を使わない開発環境や通知無効化時に使用する。

use async_trait::async_trait;
use eventmanager_domain::notification::{EmailMessage, NotificationError};

use super::MailTransport;

/// Noop メール送信（ログ出力のみ）
#[derive(Debug, Clone, Default)]
pub struct NoopMailTransport;

#[async_trait]
impl MailTransport for NoopMailTransport {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
