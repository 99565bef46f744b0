//! # ユーザー
//!
//! 確認メール送信に必要なユーザー情報を定義する。
//!
//! 登録済みユーザーのうち、通知が参照するのは ID・名・メールアドレス・
//! 確認トークンのみ。永続化は扱わない。

use derive_more::Display;
use uuid::Uuid;

/// ユーザー ID
///
/// URL に埋め込まれる不透明な識別子。新規生成時は UUID v7 を使う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct UserId(String);

impl UserId {
    /// 新しいユーザー ID を生成する
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// ユーザー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id:                 UserId,
    pub first_name:         String,
    pub email:              String,
    /// メールアドレス確認用のトークン
    pub verification_token: String,
}
