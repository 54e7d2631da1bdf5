//! Ports - 差し替え可能な境界
//!
//! ランタイムが外界に依存する箇所を trait で切り出します。
//! - **clock**: 現在時刻（`throttle_time` が使う）
//! - **view**: 描画関数と、その出力の受け手

pub mod clock;
pub mod view;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::view::{Renderer, View};
