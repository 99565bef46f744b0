//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールの HTML 本文を生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: 既定のテンプレートはバイナリに埋め込まれる
//! - **ディレクトリ読み込み**: `from_dir()` で運用側のテンプレートに差し替え可能
//! - **メール向けスタイル**: メールクライアントは `<style>` を無視しがちなため、
//!   レンダリング後にインライン `style` 属性を付与する
//! - **テンプレート名**: `{name}.html`（例: `email_verification.html`）

use std::{error::Error as _, path::Path};

use eventmanager_domain::notification::{NotificationError, UserContext};
use regex::{Captures, Regex};
use tera::{Context, Tera};

/// テンプレートレンダリングトレイト
///
/// 名前付きテンプレートとコンテキストから HTML を生成する。
pub trait TemplateRenderer: Send + Sync {
    /// テンプレートをレンダリングする
    ///
    /// コンテキストの各キーがテンプレート変数として渡される。
    fn render(
        &self,
        template_name: &str,
        context: &UserContext,
    ) -> Result<String, NotificationError>;
}

/// tera ベースのテンプレートレンダラー
pub struct TeraTemplateRenderer {
    engine: Tera,
    styler: EmailStyler,
}

impl TeraTemplateRenderer {
    /// 埋め込みテンプレートでレンダラーを作成
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "email_verification.html",
                    include_str!("../../../templates/emails/email_verification.html"),
                ),
                (
                    "password_reset.html",
                    include_str!("../../../templates/emails/password_reset.html"),
                ),
                (
                    "account_locked.html",
                    include_str!("../../../templates/emails/account_locked.html"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(describe(&e)))?;

        Self::with_engine(engine)
    }

    /// ディレクトリ配下の `*.html` を読み込んでレンダラーを作成
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, NotificationError> {
        let pattern = dir.as_ref().join("**").join("*.html");
        let pattern = pattern.to_str().ok_or_else(|| {
            NotificationError::TemplateFailed(format!(
                "テンプレートディレクトリのパスが UTF-8 ではありません: {}",
                dir.as_ref().display()
            ))
        })?;

        let engine =
            Tera::new(pattern).map_err(|e| NotificationError::TemplateFailed(describe(&e)))?;

        tracing::debug!(
            dir = %dir.as_ref().display(),
            templates = engine.get_template_names().count(),
            "メールテンプレートを読み込み"
        );

        Self::with_engine(engine)
    }

    fn with_engine(engine: Tera) -> Result<Self, NotificationError> {
        Ok(Self {
            engine,
            styler: EmailStyler::new()?,
        })
    }

    /// 登録済みのテンプレート名（拡張子なし）を返す
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .engine
            .get_template_names()
            .filter_map(|name| name.strip_suffix(".html"))
            .collect();
        names.sort_unstable();
        names
    }
}

impl TemplateRenderer for TeraTemplateRenderer {
    fn render(
        &self,
        template_name: &str,
        context: &UserContext,
    ) -> Result<String, NotificationError> {
        let file_name = format!("{template_name}.html");
        if !self.engine.get_template_names().any(|name| name == file_name) {
            return Err(NotificationError::TemplateFailed(format!(
                "テンプレートが見つかりません: {file_name}"
            )));
        }

        let tera_context = Context::from_serialize(context)
            .map_err(|e| NotificationError::TemplateFailed(describe(&e)))?;

        let html = self
            .engine
            .render(&file_name, &tera_context)
            .map_err(|e| NotificationError::TemplateFailed(describe(&e)))?;

        Ok(self.styler.apply(&html))
    }
}

/// tera のエラーは原因がネストしているため、source を連結して 1 行にする
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// タグごとのインラインスタイル
const EMAIL_STYLES: &[(&str, &str)] = &[
    (
        "body",
        "font-family: Arial, Helvetica, sans-serif; color: #333333; line-height: 1.6; margin: 0; padding: 20px;",
    ),
    ("h1", "font-family: Arial, Helvetica, sans-serif; color: #2c3e50; font-size: 24px;"),
    ("h2", "font-family: Arial, Helvetica, sans-serif; color: #34495e; font-size: 20px;"),
    ("p", "font-family: Arial, Helvetica, sans-serif; color: #333333; font-size: 16px;"),
    ("a", "color: #0366d6; text-decoration: underline;"),
    ("footer", "font-family: Arial, Helvetica, sans-serif; color: #777777; font-size: 12px; margin-top: 24px;"),
];

/// レンダリング済み HTML にインラインスタイルを付与する
///
/// 既に `style` 属性を持つタグはそのまま残す。
/// 自己終了タグ（`<a href="x"/>`）は `/` の前に `style` を挿入する。
struct EmailStyler {
    opening_tag: Regex,
    attribute:   Regex,
}

impl EmailStyler {
    fn new() -> Result<Self, NotificationError> {
        let tags = EMAIL_STYLES
            .iter()
            .map(|(tag, _)| *tag)
            .collect::<Vec<_>>()
            .join("|");
        let opening_tag = Regex::new(&format!(r"(?i)<({tags})(\s[^>]*?)?(\s*/)?>"))
            .map_err(|e| NotificationError::TemplateFailed(format!("スタイル定義が不正: {e}")))?;
        let attribute = Regex::new(
            r#"\s([^\s"'>/=]+)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?"#,
        )
        .map_err(|e| NotificationError::TemplateFailed(format!("属性パターンが不正: {e}")))?;

        Ok(Self {
            opening_tag,
            attribute,
        })
    }

    fn apply(&self, html: &str) -> String {
        self.opening_tag
            .replace_all(html, |caps: &Captures| {
                let tag = &caps[1];
                let attrs = caps.get(2).map_or("", |m| m.as_str());
                let closing = caps.get(3).map_or("", |m| m.as_str());
                let style = EMAIL_STYLES
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(tag))
                    .map(|(_, style)| *style);

                match style {
                    Some(style) if !self.has_style(attrs) => {
                        format!(r#"<{tag}{attrs} style="{style}"{closing}>"#)
                    }
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// 属性名として `style` を持つか（属性値の中の文字列は対象外）
    fn has_style(&self, attrs: &str) -> bool {
        self.attribute
            .captures_iter(attrs)
            .any(|caps| caps[1].eq_ignore_ascii_case("style"))
    }
}
