//! Connector - Controller と View の結線
//!
//! # 流れ
//! 1. `InputHub` を初期 props で作る
//! 2. Controller を取得（直接 or DI の Key 経由）し、`InputStreams` を渡して呼ぶ
//! 3. 返ってきた `ControllerOutput` から初期スナップショットを同期的に計算
//! 4. mount で view state・副作用・外部イベントをまとめて購読し、
//!    スナップショットごとに再描画する
//! 5. unmount で購読を解除し、所有 Subject と hub を完了させる
//!
//! # 構成
//! - **props**: `Props` trait と型付きコールバック `Callback<A>`
//! - **inputs**: `InputHub` / `InputStreams`（名前付きイベント Subject の遅延生成）
//! - **dispatch**: View からのイベントを hub に流す `Dispatcher`
//! - **bindings**: view state のフィールドごとの宣言 `Binding` / `ViewBindings`
//! - **controller**: `Controller` と `ControllerOutput`、購読ストリームの組み立て
//! - **component**: `connect()` と `ConnectedComponent`（mount / unmount の状態機械）
//! - **harness**: 描画なしで controller を検証する `Harness`

use std::rc::Rc;

pub mod props;
pub mod inputs;
pub mod dispatch;
pub mod bindings;
pub mod controller;
pub mod component;
pub mod harness;

pub use self::bindings::{Binding, ViewBindings};
pub use self::component::{ConnectedComponent, Connector, Lifecycle, connect};
pub use self::controller::{Controller, ControllerOutput, ControllerSource};
pub use self::dispatch::{DispatchError, Dispatcher};
pub use self::harness::Harness;
pub use self::inputs::{InputHub, InputStreams};
pub use self::props::{AnyCallback, Callback, PropLookup, Props};

/// 1 つの接続の診断設定
#[derive(Debug, Clone)]
pub(crate) struct Diagnostics {
    pub(crate) component: Rc<str>,
    pub(crate) debug: bool,
}

impl Diagnostics {
    pub(crate) fn new(component: impl Into<Rc<str>>, debug: bool) -> Self {
        Self {
            component: component.into(),
            debug,
        }
    }
}
