//! DI - スコープ付き依存性注入
//!
//! # 構成
//! - **key**: 契約を表す型付きトークン `Key<T>`
//! - **lifetime**: インスタンス共有ポリシー（Transient / Scoped / Singleton）
//! - **disposable**: 破棄の capability（Disposable / AsyncDisposable / BaseDisposable）
//! - **registry**: 型消去された登録情報（Key → factory + lifetime）
//! - **builder**: `ContainerBuilder` とモジュール登録
//! - **container**: スコープツリーと解決ロジック
//! - **errors**: 登録時・解決時のエラー
//!
//! # 使用例
//! ```ignore
//! static CLOCK: LazyLock<Key<Rc<dyn Clock>>> = LazyLock::new(|| key("Clock"));
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register_with(&CLOCK, Lifetime::Singleton, |_| Ok(Rc::new(SystemClock) as Rc<dyn Clock>))?;
//! let root = builder.build()?;
//!
//! let clock = root.create_scope("screen").resolve(&CLOCK)?;
//! root.dispose().await;
//! ```

pub mod key;
pub mod lifetime;
pub mod disposable;
pub mod registry;
pub mod builder;
pub mod container;
pub mod errors;

// 主要な型を再エクスポート
pub use self::key::{Key, KeyInfo, key};
pub use self::lifetime::Lifetime;
pub use self::disposable::{
    AsyncDisposable, BaseDisposable, Disposable, DisposalKind, DisposeState, OnDispose, Teardown,
};
pub use self::builder::{ContainerBuilder, Module};
pub use self::container::Container;
pub use self::errors::{RegistrationError, ResolveError};
