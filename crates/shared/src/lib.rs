//! # Event Manager 共有ユーティリティ
//!
//! 各クレートから利用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - 外部クレートへの依存は feature で必要な分だけ有効にする

pub mod observability;
