//! # send-email
//!
//! 通知メールを 1 通送信する確認用コマンド。
//! SMTP 設定やテンプレートの動作確認に使う。
//!
//! ## 使い方
//!
//! ```bash
//! # アカウント確認メール
//! send-email verification <user_id> <email> <first_name> <token>
//!
//! # 任意の種別（コンテキストは key=value で追加）
//! send-email password_reset user@example.com name=Taro reset_url=https://x.io/reset/abc
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 説明 |
//! |--------|------|
//! | `MAIL_TRANSPORT` | `smtp`（デフォルト）/ `noop`（送信せずログのみ） |
//! | `SMTP_SERVER` / `SMTP_PORT` | SMTP サーバー |
//! | `SMTP_USERNAME` / `SMTP_PASSWORD` | 認証情報 |
//! | `SMTP_FROM_ADDRESS` | 送信元（未設定なら `SMTP_USERNAME`） |
//! | `SMTP_SECURITY` | `starttls`（デフォルト）/ `none` |
//! | `SERVER_BASE_URL` | 確認リンクのベース URL |
//! | `EMAIL_TEMPLATES_DIR` | テンプレートディレクトリ（任意） |
//! | `LOG_FORMAT` | `json` / `pretty` |
//!
//! 送信の失敗はログに出力されるのみで、終了コードには反映されない。

use std::sync::Arc;

use anyhow::{Context as _, bail};
use eventmanager_domain::{
    notification::UserContext,
    user::{User, UserId},
};
use eventmanager_infra::NoopMailTransport;
use eventmanager_notifier::{
    config::{MailTransportKind, NotifierConfig},
    usecase::notification::{EmailNotifier, TemplateRenderer, TeraTemplateRenderer},
};
use eventmanager_shared::observability::{TracingConfig, init_tracing};

const USAGE: &str = "usage: send-email verification <user_id> <email> <first_name> <token>\n       send-email <kind> <email> [key=value...]";

/// コマンドライン引数
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Verification(User),
    UserEmail { kind: String, context: UserContext },
}

impl Command {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let args: Vec<String> = args.into_iter().collect();

        match args.as_slice() {
            [command, user_id, email, first_name, token] if command == "verification" => {
                Ok(Self::Verification(User {
                    id:                 UserId::from(user_id.as_str()),
                    first_name:         first_name.clone(),
                    email:              email.clone(),
                    verification_token: token.clone(),
                }))
            }
            [command, ..] if command == "verification" => bail!("{USAGE}"),
            [kind, email, pairs @ ..] => {
                let mut context = UserContext::new();
                for pair in pairs {
                    let (key, value) = pair
                        .split_once('=')
                        .with_context(|| format!("key=value 形式ではありません: {pair}\n{USAGE}"))?;
                    context.insert(key, value);
                }
                context.insert(UserContext::EMAIL_KEY, email.as_str());

                Ok(Self::UserEmail {
                    kind: kind.clone(),
                    context,
                })
            }
            _ => bail!("{USAGE}"),
        }
    }
}

/// 設定されたトランスポートで notifier を組み立てる
fn build_notifier(config: &NotifierConfig, renderer: Arc<dyn TemplateRenderer>) -> EmailNotifier {
    let base_url = config.server_base_url.as_str();
    match config.transport {
        MailTransportKind::Smtp => EmailNotifier::new(renderer, &config.smtp, base_url),
        MailTransportKind::Noop => {
            EmailNotifier::with_transport(renderer, Arc::new(NoopMailTransport), base_url)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("send-email"))?;

    let command = Command::parse(std::env::args().skip(1))?;
    let config = NotifierConfig::from_env()?;

    let renderer: Arc<dyn TemplateRenderer> = match &config.templates_dir {
        Some(dir) => Arc::new(TeraTemplateRenderer::from_dir(dir)?),
        None => Arc::new(TeraTemplateRenderer::new()?),
    };

    tracing::info!(
        transport = %config.transport,
        server = %config.smtp.server,
        port = config.smtp.port,
        security = %config.smtp.security,
        "通知メールを送信します"
    );

    let notifier = build_notifier(&config, renderer);

    match command {
        Command::Verification(user) => notifier.send_verification_email(&user).await,
        Command::UserEmail { kind, context } => notifier.send_user_email(&context, &kind).await,
    }

    Ok(())
}
