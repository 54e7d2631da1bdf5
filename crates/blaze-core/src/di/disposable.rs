//! Disposable - 破棄の capability
//!
//! # 三種類の capability
//! - **NotDisposable**: 何もしない
//! - **SyncDisposable**: `Disposable::dispose()`
//! - **AsyncDisposable**: `AsyncDisposable::dispose_async().await`
//!
//! どの capability を持つかは登録時に宣言します
//! （`register_disposable` / `register_async_disposable`）。
//! 実行時にプロパティを探って判定することはしません。
//!
//! # BaseDisposable
//! 「最初の 1 回だけ teardown を実行する」基底です。
//! 2 回目以降の `dispose_async()` は何もせずにすぐ返ります。

use std::cell::Cell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use async_trait::async_trait;

/// 同期的に破棄できるオブジェクト
pub trait Disposable {
    fn dispose(&self);
}

/// 非同期に破棄できるオブジェクト
///
/// シングルスレッド前提なので future は `Send` を要求しません。
#[async_trait(?Send)]
pub trait AsyncDisposable {
    async fn dispose_async(&self);
}

impl<T: Disposable + ?Sized> Disposable for Rc<T> {
    fn dispose(&self) {
        (**self).dispose();
    }
}

#[async_trait(?Send)]
impl<T: AsyncDisposable + ?Sized> AsyncDisposable for Rc<T> {
    async fn dispose_async(&self) {
        (**self).dispose_async().await;
    }
}

/// 登録時に宣言される破棄の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalKind {
    NotDisposable,
    SyncDisposable,
    AsyncDisposable,
}

/// Teardown はキャッシュ済みインスタンスに紐づく破棄処理
#[derive(Clone)]
pub enum Teardown {
    NotDisposable,
    Sync(Rc<dyn Disposable>),
    Async(Rc<dyn AsyncDisposable>),
}

impl Teardown {
    pub fn kind(&self) -> DisposalKind {
        match self {
            Teardown::NotDisposable => DisposalKind::NotDisposable,
            Teardown::Sync(_) => DisposalKind::SyncDisposable,
            Teardown::Async(_) => DisposalKind::AsyncDisposable,
        }
    }

    /// 破棄を実行（非同期のものは完了まで待つ）
    pub async fn run(&self) {
        match self {
            Teardown::NotDisposable => {}
            Teardown::Sync(disposable) => disposable.dispose(),
            Teardown::Async(disposable) => disposable.dispose_async().await,
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Teardown({:?})", self.kind())
    }
}

/// DisposeState は「破棄済み」フラグ
///
/// `begin()` は最初の呼び出しでだけ `true` を返します。
#[derive(Debug, Default)]
pub struct DisposeState {
    disposed: Cell<bool>,
}

impl DisposeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// 破棄を開始する。すでに開始済みなら `false`
    pub fn begin(&self) -> bool {
        !self.disposed.replace(true)
    }
}

/// BaseDisposable が呼び出す teardown フック
#[async_trait(?Send)]
pub trait OnDispose {
    async fn on_dispose(&self);
}

/// BaseDisposable は exactly-once の非同期 teardown を与えるラッパー
///
/// # 使用例
/// ```ignore
/// struct Connection { .. }
///
/// #[async_trait(?Send)]
/// impl OnDispose for Connection {
///     async fn on_dispose(&self) { self.close().await }
/// }
///
/// let conn = BaseDisposable::new(Connection::new());
/// conn.dispose_async().await; // on_dispose が走る
/// conn.dispose_async().await; // 何もしない
/// assert!(conn.is_disposed());
/// ```
pub struct BaseDisposable<T> {
    inner: T,
    state: DisposeState,
}

impl<T> BaseDisposable<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            state: DisposeState::new(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }
}

impl<T> Deref for BaseDisposable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

#[async_trait(?Send)]
impl<T: OnDispose> AsyncDisposable for BaseDisposable<T> {
    async fn dispose_async(&self) {
        if !self.state.begin() {
            return;
        }
        self.inner.on_dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        calls: Cell<u32>,
    }

    #[async_trait(?Send)]
    impl OnDispose for Counting {
        async fn on_dispose(&self) {
            tokio::task::yield_now().await;
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[tokio::test]
    async fn base_disposable_runs_hook_once() {
        let disposable = BaseDisposable::new(Counting { calls: Cell::new(0) });
        assert!(!disposable.is_disposed());

        disposable.dispose_async().await;
        disposable.dispose_async().await;

        assert!(disposable.is_disposed());
        assert_eq!(disposable.calls.get(), 1);
    }

    #[tokio::test]
    async fn rc_forwards_to_inner() {
        let disposable = Rc::new(BaseDisposable::new(Counting { calls: Cell::new(0) }));
        let teardown = Teardown::Async(disposable.clone());
        assert_eq!(teardown.kind(), DisposalKind::AsyncDisposable);

        teardown.run().await;
        teardown.run().await;
        assert_eq!(disposable.calls.get(), 1);
    }

    #[test]
    fn dispose_state_begins_once() {
        let state = DisposeState::new();
        assert!(state.begin());
        assert!(!state.begin());
        assert!(state.is_disposed());
    }
}
