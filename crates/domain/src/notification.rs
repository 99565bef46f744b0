//! # 通知
//!
//! メール通知に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`EmailKind`] | メール種別 | 3 種類: アカウント確認、パスワードリセット、アカウントロック |
//! | [`UserContext`] | ユーザーコンテキスト | テンプレートに渡すキー/値（`email` は必須） |
//! | [`EmailMessage`] | メールメッセージ | レンダリング済みの送信単位 |
//!
//! ## 設計方針
//!
//! - **閉じた enum**: メール種別ごとに件名とテンプレート名が固定で対応する
//! - **fire-and-forget**: 送信の失敗はユーザー登録などの主処理に影響しない
//! - **テンプレート分離**: 種別とメール生成は分離（レンダリングは notifier 側）

use std::{collections::BTreeMap, str::FromStr};

use serde::Serialize;
use strum::IntoStaticStr;
use thiserror::Error;

/// 通知送信エラー
///
/// 通知処理の内部でのみ使われ、呼び出し元には伝播しない。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    /// SMTP トランスポートの初期化に失敗
    #[error("SMTP 接続の初期化に失敗: {0}")]
    ConnectionInitFailed(String),

    /// 未知のメール種別
    #[error("不正なメール種別: {0}")]
    UnrecognizedEmailKind(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// コンテキストに `email` が含まれていない
    #[error("宛先メールアドレスがコンテキストに含まれていません")]
    MissingRecipient,
}

/// メール種別
///
/// snake_case の名前がそのままテンプレート名になる。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum EmailKind {
    /// アカウント確認: ユーザー登録直後に送信
    EmailVerification,
    /// パスワードリセット手順
    PasswordReset,
    /// アカウントロックの通知
    AccountLocked,
}

impl EmailKind {
    /// 種別ごとの固定件名を返す
    pub fn subject(self) -> &'static str {
        match self {
            Self::EmailVerification => "Verify Your Account",
            Self::PasswordReset => "Password Reset Instructions",
            Self::AccountLocked => "Account Locked Notification",
        }
    }

    /// テンプレート名を返す（例: `"email_verification"`）
    pub fn template_name(self) -> &'static str {
        self.into()
    }

    /// 種別名をパースする
    ///
    /// 未知の名前は [`NotificationError::UnrecognizedEmailKind`] になる。
    pub fn parse(name: &str) -> Result<Self, NotificationError> {
        Self::from_str(name).map_err(|_| NotificationError::UnrecognizedEmailKind(name.to_string()))
    }
}

/// テンプレートに渡すユーザーコンテキスト
///
/// 文字列キーから文字列値へのマッピング。宛先として `email` キーが必須。
/// キー順を安定させるため `BTreeMap` で保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserContext(BTreeMap<String, String>);

impl UserContext {
    /// 宛先メールアドレスのキー
    pub const EMAIL_KEY: &'static str = "email";

    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定する。既存の値があれば返す
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// 宛先メールアドレスを返す
    pub fn email(&self) -> Option<&str> {
        self.get(Self::EMAIL_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for UserContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for UserContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。`MailTransport` に渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
}
