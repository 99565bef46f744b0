//! # メール通知サービス
//!
//! テンプレートレンダリング → メール送信を統合するサービス。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: 公開操作は送信失敗してもエラーを返さない（ログ出力のみ）。
//!   ユーザー登録などの主処理をメール送信の可否に左右させない
//! - **内部は Result**: `try_*` 系が [`NotificationError`] を返し、公開操作がそれを
//!   ログに変換して破棄する。テストでは `try_*` の結果を直接検証できる
//! - **縮退モード**: SMTP トランスポートの構築に失敗しても notifier は生成され、
//!   [`TransportState::Disconnected`] として送信が no-op になる

use std::sync::Arc;

use eventmanager_domain::{
    notification::{EmailKind, EmailMessage, NotificationError, UserContext},
    user::User,
};
use eventmanager_infra::notification::{MailTransport, SmtpConfig, SmtpMailTransport};

use super::TemplateRenderer;

/// 確認メールのリンクパス（ベース URL の直後に連結する）
const VERIFY_EMAIL_PATH: &str = "verify-email/";

/// トランスポートの接続状態
///
/// 構築時に一度だけ決まり、以降変化しない。
pub enum TransportState {
    Connected(Arc<dyn MailTransport>),
    /// 初期化に失敗した縮退モード
    Disconnected,
}

/// 送信処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// トランスポートに渡した
    Sent,
    /// 縮退モードのため何もしなかった
    Skipped,
}

/// メール通知サービス
///
/// メール種別ごとの件名を決め、レンダリングと送信を委譲する。
/// 公開操作（`send_*`）は常に正常終了する。
pub struct EmailNotifier {
    transport:       TransportState,
    renderer:        Arc<dyn TemplateRenderer>,
    server_base_url: String,
}

impl EmailNotifier {
    /// SMTP 設定からトランスポートを構築して notifier を作成する
    ///
    /// 構築に失敗した場合は警告を出力し、縮退モードで作成する。
    pub fn new(
        renderer: Arc<dyn TemplateRenderer>,
        smtp: &SmtpConfig,
        server_base_url: impl Into<String>,
    ) -> Self {
        let transport = match SmtpMailTransport::new(smtp) {
            Ok(transport) => TransportState::Connected(Arc::new(transport)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    server = %smtp.server,
                    port = smtp.port,
                    "SMTP トランスポートの初期化に失敗、メール送信を無効化"
                );
                TransportState::Disconnected
            }
        };

        Self {
            transport,
            renderer,
            server_base_url: server_base_url.into(),
        }
    }

    /// 構築済みのトランスポートで notifier を作成する
    pub fn with_transport(
        renderer: Arc<dyn TemplateRenderer>,
        transport: Arc<dyn MailTransport>,
        server_base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport: TransportState::Connected(transport),
            renderer,
            server_base_url: server_base_url.into(),
        }
    }

    /// 縮退モードの notifier を作成する
    pub fn disconnected(
        renderer: Arc<dyn TemplateRenderer>,
        server_base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport: TransportState::Disconnected,
            renderer,
            server_base_url: server_base_url.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.transport, TransportState::Connected(_))
    }

    /// メール種別名を指定してメールを送信する（fire-and-forget）
    ///
    /// 縮退モードでは警告のみ、失敗時はエラーログのみ出力して正常終了する。
    pub async fn send_user_email(&self, context: &UserContext, kind: &str) {
        let result = self.try_send_user_email(context, kind).await;
        report(result, kind);
    }

    /// メール種別を指定してメールを送信する（fire-and-forget）
    pub async fn send_email(&self, context: &UserContext, kind: EmailKind) {
        let result = self.try_send_email(context, kind).await;
        report(result, kind.template_name());
    }

    /// [`send_user_email`](Self::send_user_email) の内部処理
    ///
    /// 未知の種別名は [`NotificationError::UnrecognizedEmailKind`] を返す。
    /// 縮退モードの判定は種別の検証より先に行う。
    pub async fn try_send_user_email(
        &self,
        context: &UserContext,
        kind: &str,
    ) -> Result<Delivery, NotificationError> {
        let TransportState::Connected(transport) = &self.transport else {
            return Ok(Delivery::Skipped);
        };
        let kind = EmailKind::parse(kind)?;
        self.deliver(transport.as_ref(), context, kind).await
    }

    /// [`send_email`](Self::send_email) の内部処理
    pub async fn try_send_email(
        &self,
        context: &UserContext,
        kind: EmailKind,
    ) -> Result<Delivery, NotificationError> {
        let TransportState::Connected(transport) = &self.transport else {
            return Ok(Delivery::Skipped);
        };
        self.deliver(transport.as_ref(), context, kind).await
    }

    /// 確認メールのリンクを組み立てる
    ///
    /// ベース URL とパスは単純に連結する（ベース URL は末尾 `/` 込みで設定する）。
    pub fn verification_url(&self, user: &User) -> String {
        format!(
            "{}{VERIFY_EMAIL_PATH}{}/{}",
            self.server_base_url, user.id, user.verification_token
        )
    }

    /// アカウント確認メールを送信する（fire-and-forget）
    pub async fn send_verification_email(&self, user: &User) {
        let verification_url = self.verification_url(user);
        let context = UserContext::from([
            ("name", user.first_name.as_str()),
            ("verification_url", verification_url.as_str()),
            ("email", user.email.as_str()),
        ]);

        self.send_user_email(&context, EmailKind::EmailVerification.template_name())
            .await;
    }

    async fn deliver(
        &self,
        transport: &dyn MailTransport,
        context: &UserContext,
        kind: EmailKind,
    ) -> Result<Delivery, NotificationError> {
        let recipient = context.email().ok_or(NotificationError::MissingRecipient)?;

        let html_body = self.renderer.render(kind.template_name(), context)?;

        let email = EmailMessage {
            to:        recipient.to_string(),
            subject:   kind.subject().to_string(),
            html_body,
        };
        transport.send_email(&email).await?;

        tracing::info!(
            email_kind = %kind,
            recipient = %recipient,
            "メール送信成功"
        );
        Ok(Delivery::Sent)
    }
}

/// 内部処理の結果をログに変換して破棄する
fn report(result: Result<Delivery, NotificationError>, kind: &str) {
    match result {
        Ok(Delivery::Sent) => {}
        Ok(Delivery::Skipped) => {
            tracing::warn!(
                email_kind = kind,
                "SMTP クライアント未初期化のためメール送信をスキップ"
            );
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                email_kind = kind,
                "メール送信に失敗"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Mutex};

    use eventmanager_domain::user::UserId;
    use eventmanager_infra::{SmtpSecurity, mock::MockMailTransport};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    // ===== テスト用レンダラー =====

    /// 呼び出しを記録するレンダラー
    #[derive(Clone, Default)]
    struct MockTemplateRenderer {
        calls:     Arc<Mutex<Vec<(String, UserContext)>>>,
        fail_with: Option<String>,
    }

    impl MockTemplateRenderer {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(String, UserContext)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TemplateRenderer for MockTemplateRenderer {
        fn render(
            &self,
            template_name: &str,
            context: &UserContext,
        ) -> Result<String, NotificationError> {
            self.calls
                .lock()
                .unwrap()
                .push((template_name.to_string(), context.clone()));
            match &self.fail_with {
                Some(message) => Err(NotificationError::TemplateFailed(message.clone())),
                None => Ok(format!("<p>{template_name}</p>")),
            }
        }
    }

    // ===== ログ捕捉 =====

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// 現在のスレッドのログを捕捉する（guard が生きている間のみ）
    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (buffer, guard)
    }

    // ===== ヘルパー =====

    const BASE_URL: &str = "https://x.io/";

    fn make_context() -> UserContext {
        UserContext::from([
            ("email", "test@example.com"),
            ("name", "Test User"),
            ("verification_url", "http://example.com/verify?token=abc123"),
        ])
    }

    fn make_notifier(
        renderer: &MockTemplateRenderer,
        transport: &MockMailTransport,
    ) -> EmailNotifier {
        EmailNotifier::with_transport(
            Arc::new(renderer.clone()),
            Arc::new(transport.clone()),
            BASE_URL,
        )
    }

    fn make_user() -> User {
        User {
            id:                 UserId::from("42"),
            first_name:         "Taro".to_string(),
            email:              "taro@example.com".to_string(),
            verification_token: "abc".to_string(),
        }
    }

    // ===== send_user_email =====

    #[rstest]
    #[case("email_verification", "Verify Your Account")]
    #[case("password_reset", "Password Reset Instructions")]
    #[case("account_locked", "Account Locked Notification")]
    #[tokio::test]
    async fn 種別ごとのテンプレートと件名で送信する(
        #[case] kind: &str,
        #[case] subject: &str,
    ) {
        let renderer = MockTemplateRenderer::default();
        let transport = MockMailTransport::new();
        let notifier = make_notifier(&renderer, &transport);

        notifier.send_user_email(&make_context(), kind).await;

        assert_eq!(renderer.calls(), vec![(kind.to_string(), make_context())]);
        assert_eq!(
            transport.sent_emails(),
            vec![EmailMessage {
                to:        "test@example.com".to_string(),
                subject:   subject.to_string(),
                html_body: format!("<p>{kind}</p>"),
            }]
        );
    }

    #[tokio::test]
    async fn 送信成功時はsentを返す() {
        let renderer = MockTemplateRenderer::default();
        let transport = MockMailTransport::new();
        let notifier = make_notifier(&renderer, &transport);

        let result = notifier
            .try_send_user_email(&make_context(), "password_reset")
            .await;

        assert_eq!(result, Ok(Delivery::Sent));
    }

    #[tokio::test]
    async fn 未知の種別ではレンダリングも送信もせずエラーログを出す() {
        let (logs, _guard) = capture_logs();
        let renderer = MockTemplateRenderer::default();
        let transport = MockMailTransport::new();
        let notifier = make_notifier(&renderer, &transport);

        notifier.send_user_email(&make_context(), "newsletter").await;

        assert!(renderer.calls().is_empty());
        assert!(transport.sent_emails().is_empty());
        let logs = logs.contents();
        assert!(logs.contains("ERROR"), "ログ: {logs}");
        assert!(logs.contains("newsletter"), "ログ: {logs}");
    }

    #[tokio::test]
    async fn 未知の種別はunrecognized_email_kindを返す() {
        let notifier = make_notifier(&MockTemplateRenderer::default(), &MockMailTransport::new());

        let result = notifier
            .try_send_user_email(&make_context(), "newsletter")
            .await;

        assert_eq!(
            result,
            Err(NotificationError::UnrecognizedEmailKind(
                "newsletter".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn 縮退モードではレンダリングも送信もせず警告ログを出す() {
        let (logs, _guard) = capture_logs();
        let renderer = MockTemplateRenderer::default();
        let notifier = EmailNotifier::disconnected(Arc::new(renderer.clone()), BASE_URL);

        notifier
            .send_user_email(&make_context(), "email_verification")
            .await;

        assert!(!notifier.is_connected());
        assert!(renderer.calls().is_empty());
        let logs = logs.contents();
        assert!(logs.contains("WARN"), "ログ: {logs}");
        assert!(!logs.contains("ERROR"), "ログ: {logs}");
    }

    #[tokio::test]
    async fn 縮退モードでは未知の種別でもskippedを返す() {
        let notifier = EmailNotifier::disconnected(Arc::new(MockTemplateRenderer::default()), BASE_URL);

        let result = notifier
            .try_send_user_email(&make_context(), "newsletter")
            .await;

        assert_eq!(result, Ok(Delivery::Skipped));
    }

    #[tokio::test]
    async fn レンダリング失敗時は送信せずエラーログを出す() {
        let (logs, _guard) = capture_logs();
        let renderer = MockTemplateRenderer::failing("構文エラー");
        let transport = MockMailTransport::new();
        let notifier = make_notifier(&renderer, &transport);

        let result = notifier
            .try_send_user_email(&make_context(), "account_locked")
            .await;
        notifier
            .send_user_email(&make_context(), "account_locked")
            .await;

        assert_eq!(
            result,
            Err(NotificationError::TemplateFailed("構文エラー".to_string()))
        );
        assert!(transport.sent_emails().is_empty());
        assert!(logs.contents().contains("ERROR"));
    }

    #[tokio::test]
    async fn 送信失敗時はエラーログを出して正常終了する() {
        let (logs, _guard) = capture_logs();
        let renderer = MockTemplateRenderer::default();
        let transport = MockMailTransport::failing("接続拒否");
        let notifier = make_notifier(&renderer, &transport);

        let result = notifier
            .try_send_user_email(&make_context(), "email_verification")
            .await;
        notifier
            .send_user_email(&make_context(), "email_verification")
            .await;

        assert_eq!(
            result,
            Err(NotificationError::SendFailed("接続拒否".to_string()))
        );
        let logs = logs.contents();
        assert!(logs.contains("ERROR"), "ログ: {logs}");
        assert!(logs.contains("接続拒否"), "ログ: {logs}");
    }

    #[tokio::test]
    async fn emailがない場合はmissing_recipientで送信しない() {
        let renderer = MockTemplateRenderer::default();
        let transport = MockMailTransport::new();
        let notifier = make_notifier(&renderer, &transport);
        let context = UserContext::from([("name", "Test User")]);

        let result = notifier.try_send_user_email(&context, "account_locked").await;
        notifier.send_user_email(&context, "account_locked").await;

        assert_eq!(result, Err(NotificationError::MissingRecipient));
        assert!(transport.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn send_emailは型付きの種別で送信する() {
        let renderer = MockTemplateRenderer::default();
        let transport = MockMailTransport::new();
        let notifier = make_notifier(&renderer, &transport);

        notifier
            .send_email(&make_context(), EmailKind::AccountLocked)
            .await;

        let sent = transport.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Account Locked Notification");
    }

    // ===== send_verification_email =====

    #[test]
    fn 確認urlはベースurlとidとトークンを連結する() {
        let notifier = EmailNotifier::disconnected(Arc::new(MockTemplateRenderer::default()), BASE_URL);

        assert_eq!(
            notifier.verification_url(&make_user()),
            "https://x.io/verify-email/42/abc"
        );
    }

    #[tokio::test]
    async fn send_verification_emailは確認メールのコンテキストで送信する() {
        let renderer = MockTemplateRenderer::default();
        let transport = MockMailTransport::new();
        let notifier = make_notifier(&renderer, &transport);

        notifier.send_verification_email(&make_user()).await;

        let expected_context = UserContext::from([
            ("name", "Taro"),
            ("verification_url", "https://x.io/verify-email/42/abc"),
            ("email", "taro@example.com"),
        ]);
        assert_eq!(
            renderer.calls(),
            vec![("email_verification".to_string(), expected_context)]
        );

        let sent = transport.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "taro@example.com");
        assert_eq!(sent[0].subject, "Verify Your Account");
    }

    #[tokio::test]
    async fn send_verification_emailは送信失敗でも正常終了する() {
        let transport = MockMailTransport::failing("タイムアウト");
        let notifier = make_notifier(&MockTemplateRenderer::default(), &transport);

        // () を返す（コンパイル時検証）
        notifier.send_verification_email(&make_user()).await;

        assert!(transport.sent_emails().is_empty());
    }

    // ===== コンストラクタ =====

    fn make_smtp_config(from_address: &str) -> SmtpConfig {
        SmtpConfig {
            server:       "localhost".to_string(),
            port:         1025,
            username:     String::new(),
            password:     String::new(),
            from_address: from_address.to_string(),
            security:     SmtpSecurity::None,
        }
    }

    #[test]
    fn smtp設定が正しければ接続状態で作成される() {
        let notifier = EmailNotifier::new(
            Arc::new(MockTemplateRenderer::default()),
            &make_smtp_config("noreply@example.com"),
            BASE_URL,
        );

        assert!(notifier.is_connected());
    }

    #[test]
    fn smtp初期化に失敗しても縮退モードで作成され警告を出す() {
        let (logs, _guard) = capture_logs();

        let notifier = EmailNotifier::new(
            Arc::new(MockTemplateRenderer::default()),
            &make_smtp_config(""),
            BASE_URL,
        );

        assert!(!notifier.is_connected());
        assert!(logs.contents().contains("WARN"));
    }
}
