//! Subscription - teardown の集まり
//!
//! rxrust の購読ハンドルは値で消費されるので、`&self` で何度でも呼べる
//! このハンドルに包んで connector に渡します。

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Subscription は購読の解除ハンドル
///
/// `unsubscribe()` は登録された teardown を登録順に 1 回だけ実行します。
/// 解除済みの Subscription に追加された teardown は即座に実行されます。
/// drop しても解除はされません（明示的に `unsubscribe()` を呼ぶ）。
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

#[derive(Default)]
struct SubscriptionInner {
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub fn add_teardown(&self, teardown: impl FnOnce() + 'static) {
        if self.is_closed() {
            teardown();
            return;
        }
        self.inner.teardowns.borrow_mut().push(Box::new(teardown));
    }

    /// 子の Subscription をぶら下げる（親の解除で子も解除）
    pub fn add(&self, child: Subscription) {
        if Rc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        self.add_teardown(move || child.unsubscribe());
    }

    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardowns = mem::take(&mut *self.inner.teardowns.borrow_mut());
        for teardown in teardowns {
            teardown();
        }
    }
}

impl rxrust::subscription::Subscription for Subscription {
    fn unsubscribe(self) {
        Subscription::unsubscribe(&self);
    }

    fn is_closed(&self) -> bool {
        Subscription::is_closed(self)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("teardowns", &self.inner.teardowns.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardowns_run_once_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let subscription = Subscription::new();
        for i in 0..3 {
            let log = log.clone();
            subscription.add_teardown(move || log.borrow_mut().push(i));
        }

        subscription.unsubscribe();
        subscription.unsubscribe();

        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(subscription.is_closed());
    }

    #[test]
    fn teardown_added_after_close_runs_immediately() {
        let ran = Rc::new(Cell::new(false));
        let subscription = Subscription::new();
        subscription.unsubscribe();

        let flag = ran.clone();
        subscription.add_teardown(move || flag.set(true));
        assert!(ran.get());
    }

    #[test]
    fn children_close_with_parent() {
        let parent = Subscription::new();
        let child = Subscription::new();
        parent.add(child.clone());
        parent.add(parent.clone());

        parent.unsubscribe();
        assert!(child.is_closed());
    }
}
