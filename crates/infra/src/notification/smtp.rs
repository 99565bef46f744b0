//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 本番では STARTTLS + 認証、開発では Mailpit 等の平文 SMTP に接続する。

use async_trait::async_trait;
use eventmanager_domain::notification::{EmailMessage, NotificationError};
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::MailTransport;

/// SMTP 接続のセキュリティ方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SmtpSecurity {
    /// STARTTLS で暗号化してから認証する
    #[default]
    StartTls,
    /// 暗号化しない（ローカル SMTP 向け）
    None,
}

/// SMTP 接続設定
///
/// 呼び出し元の初期化処理で一度だけ組み立て、コンストラクタに渡す。
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    /// SMTP サーバーのホスト名
    pub server:       String,
    /// SMTP サーバーのポート番号
    pub port:         u16,
    pub username:     String,
    pub password:     String,
    /// 送信元メールアドレス
    pub from_address: String,
    pub security:     SmtpSecurity,
}

// パスワードをログに出さない
impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from_address", &self.from_address)
            .field("security", &self.security)
            .finish()
    }
}

/// SMTP メール送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// トランスポートは `Sync` のため、複数タスクから共有して送信できる。
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from:      Mailbox,
}

impl SmtpMailTransport {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// TLS パラメータや送信元アドレスが不正な場合は
    /// [`NotificationError::ConnectionInitFailed`] を返す。
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        let from: Mailbox = config.from_address.parse().map_err(|e| {
            NotificationError::ConnectionInitFailed(format!(
                "送信元アドレス不正 ({}): {e}",
                config.from_address
            ))
        })?;

        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server).map_err(
                    |e| NotificationError::ConnectionInitFailed(format!("TLS 設定失敗: {e}")),
                )?
            }
            // builder_dangerous: TLS なしで接続
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
            }
        };

        let builder = builder.port(config.port);
        let builder = if config.username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
        };

        tracing::debug!(
            server = %config.server,
            port = config.port,
            security = %config.security,
            "SMTP トランスポートを構築"
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, NotificationError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| NotificationError::SendFailed(format!("宛先アドレス不正: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}
