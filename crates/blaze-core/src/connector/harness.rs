//! Harness - 描画なしで controller を検証する
//!
//! ConnectedComponent と同じ結線・購読・後始末を、View なしで行います。
//! - `event()` で入力 Subject を直接取り出して値を流す
//! - `out()` で最新のスナップショット、`history()` でこれまでの全スナップショット
//! - `flush()` で次の tick のタスクを実行する
//!
//! 外部イベントは mount を待たずに転送されます。

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::error;

use super::Diagnostics;
use super::controller::Controller;
use super::inputs::{InputHub, InputStreams};
use super::props::Props;
use crate::rx::{Completable, Notification, StreamError, Subject, Subscription, scheduler};

const HARNESS_NAME: &str = "Harness";

/// Harness は controller のテスト用ドライバ
///
/// # 使用例
/// ```ignore
/// let harness = Harness::new(&counter_controller(), ());
/// harness.mount();
/// harness.event::<()>("increment").next(());
/// assert_eq!(harness.out().val, 1);
/// ```
pub struct Harness<P: Props, S: Default + Clone + 'static> {
    hub: InputHub<P>,
    state: Rc<RefCell<S>>,
    history: Rc<RefCell<Vec<S>>>,
    error: Rc<RefCell<Option<StreamError>>>,
    subscription: Subscription,
    owned: Vec<Box<dyn Completable>>,
    disposed: bool,
}

impl<P: Props, S: Default + Clone + 'static> Harness<P, S> {
    /// controller を呼び出して購読を始める（mount はまだ通知しない）
    pub fn new(controller: &Controller<P, S>, props: P) -> Self {
        let diagnostics = Diagnostics::new(HARNESS_NAME, false);
        let hub = InputHub::new(props.clone());
        let output = controller.invoke(hub.streams());
        let state = Rc::new(RefCell::new(output.view_state().initial_state(&props)));
        let history = Rc::new(RefCell::new(Vec::new()));

        let on_state = {
            let state = state.clone();
            let history = history.clone();
            move |snapshot: &S| {
                *state.borrow_mut() = snapshot.clone();
                history.borrow_mut().push(snapshot.clone());
            }
        };
        let (stream, owned) = output.wire(hub.streams(), false, &diagnostics, on_state);

        let error_slot = Rc::new(RefCell::new(None));
        let sink = error_slot.clone();
        let subscription = stream.subscribe_with(move |notification| {
            if let Notification::Error(err) = notification {
                error!(component = HARNESS_NAME, error = %err, "subscription stopped by error");
                *sink.borrow_mut() = Some(err);
            }
        });

        Self {
            hub,
            state,
            history,
            error: error_slot,
            subscription,
            owned,
            disposed: false,
        }
    }

    /// controller に渡したのと同じ入力
    pub fn inputs(&self) -> &InputStreams<P> {
        self.hub.streams()
    }

    /// 名前付きイベントの Subject
    pub fn event<A: Clone + 'static>(&self, name: &str) -> Subject<A> {
        self.hub.streams().event(name)
    }

    /// 最新のスナップショット
    pub fn out(&self) -> S {
        self.state.borrow().clone()
    }

    /// 最新のスナップショットを借用して調べる
    pub fn out_ref<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    /// 購読開始からのすべてのスナップショット
    pub fn history(&self) -> Vec<S> {
        self.history.borrow().clone()
    }

    /// mount を通知し、次の tick のタスクまで実行する
    pub fn mount(&self) {
        self.hub.trigger_mount();
        scheduler::flush();
    }

    pub fn unmount(&self) {
        self.hub.trigger_unmount();
    }

    /// props を更新し、次の tick のタスクまで実行する
    pub fn set_props(&self, props: P) {
        self.hub.set_props(props);
        scheduler::flush();
    }

    /// 次の tick のタスクを実行する
    pub fn flush(&self) -> usize {
        scheduler::flush()
    }

    /// 購読を止めたエラー
    pub fn error(&self) -> Option<StreamError> {
        self.error.borrow().clone()
    }

    /// unmount → hub を完了 → 所有 Subject を完了 → 購読解除
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.hub.trigger_unmount();
        self.hub.complete();
        for subject in self.owned.drain(..) {
            subject.complete();
        }
        self.subscription.unsubscribe();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl<P: Props, S: Default + Clone + 'static> Drop for Harness<P, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: Props, S: Default + Clone + 'static> fmt::Debug for Harness<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("disposed", &self.disposed)
            .field("snapshots", &self.history.borrow().len())
            .finish()
    }
}
