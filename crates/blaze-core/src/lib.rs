//! blaze-core
//!
//! Core building blocks for the Blaze application runtime.
//!
//! # モジュール構成
//! - **di**: スコープ付き DI コンテナ（Key, Lifetime, ContainerBuilder, Container, 破棄）
//! - **rx**: rxrust の上の同期 push 型リアクティブ層（Subject, Observable, オペレータ, tick キュー）
//! - **connector**: Controller と View の結線（InputStreams, ViewBindings, Connector, Harness）
//! - **ports**: 差し替え可能な境界（Clock, View, Renderer）
//!
//! # 実行モデル
//! シングルスレッド・協調的・push 型です。共有は `Rc` / `RefCell` で表現し、
//! `Send` / `Sync` は要求しません。

pub mod di;
pub mod rx;
pub mod connector;
pub mod ports;
