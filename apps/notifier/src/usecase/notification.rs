//! # 通知ユースケース
//!
//! ユーザー登録などに伴うメール通知の生成・送信を統合する。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによるメール本文生成
//! - [`notifier`] - テンプレートレンダリング + 送信の統合サービス

pub mod notifier;
pub mod template_renderer;

pub use notifier::{Delivery, EmailNotifier};
pub use template_renderer::{TemplateRenderer, TeraTemplateRenderer};
