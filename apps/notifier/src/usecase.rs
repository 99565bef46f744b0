//! # ユースケース層
//!
//! - [`notification`] - テンプレートレンダリング + メール送信

pub mod notification;
