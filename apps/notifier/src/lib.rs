//! # Notifier ライブラリ
//!
//! ユーザー向け通知メールの生成と送信を公開する。
//! 送信バイナリ（`send-email`）と統合テストから利用される。

pub mod config;
pub mod usecase;
