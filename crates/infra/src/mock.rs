//! # テスト用モック
//!
//! notifier のテストで使用するインメモリのメール送信実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! eventmanager-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventmanager_domain::notification::{EmailMessage, NotificationError};

use crate::notification::MailTransport;

// ===== MockMailTransport =====

/// 送信したメッセージを記録するモック
///
/// `clone()` したインスタンス同士は記録を共有する。
#[derive(Clone, Default)]
pub struct MockMailTransport {
    sent:      Arc<Mutex<Vec<EmailMessage>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の送信を指定メッセージで失敗させる
    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::new();
        *mock.fail_with.lock().unwrap() = Some(message.into());
        mock
    }

    /// 送信されたメッセージ一覧
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(NotificationError::SendFailed(message));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
