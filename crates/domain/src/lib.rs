//! # Event Manager ドメイン層
//!
//! メール通知で扱うドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! notifier → infra → domain
//!     ↘               ↑
//!       ──────────────
//! ```
//!
//! ドメイン層は SMTP やテンプレートエンジンには一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`notification`] - メール種別、ユーザーコンテキスト、送信エラー
//! - [`user`] - 確認メール送信に必要なユーザー情報
//!
//! ## 使用例
//!
//! ```rust
//! use std::str::FromStr;
//!
//! use eventmanager_domain::notification::{EmailKind, UserContext};
//!
//! let kind = EmailKind::from_str("account_locked").unwrap();
//! assert_eq!(kind.subject(), "Account Locked Notification");
//!
//! let context = UserContext::from([("email", "user@example.com"), ("name", "Taro")]);
//! assert_eq!(context.email(), Some("user@example.com"));
//! ```

pub mod notification;
pub mod user;
