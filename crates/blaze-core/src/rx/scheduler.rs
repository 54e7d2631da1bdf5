//! Scheduler - 「次の tick」
//!
//! スレッドローカルな FIFO キューです。`schedule()` で積んだタスクは
//! `flush()` が呼ばれるまで実行されません。
//! flush 中に積まれたタスクも同じ flush の中で実行されます。
//!
//! connector の Dispatcher はビューからのイベントを配送した直後に `flush()` するので、
//! 同じイベントに反応する副作用は「リセット前」の状態を観測し、
//! その後で遅延されたリセットが適用されます。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
}

/// タスクを次の tick に積む
pub fn schedule(task: impl FnOnce() + 'static) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// 積まれたタスクを空になるまで実行し、実行した数を返す
///
/// flush 中の再入呼び出しは何もせず 0 を返します。
pub fn flush() -> usize {
    if FLUSHING.with(|flushing| flushing.replace(true)) {
        return 0;
    }
    let _guard = FlushGuard;

    let mut ran = 0;
    while let Some(task) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        task();
        ran += 1;
    }
    ran
}

/// 未実行のタスク数
pub fn pending() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        FLUSHING.with(|flushing| flushing.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn tasks_wait_for_flush() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        schedule(move || sink.borrow_mut().push("later"));
        log.borrow_mut().push("now");

        assert_eq!(pending(), 1);
        assert_eq!(flush(), 1);
        assert_eq!(*log.borrow(), vec!["now", "later"]);
        assert_eq!(pending(), 0);
    }

    #[test]
    fn tasks_scheduled_during_flush_run_in_same_flush() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        schedule(move || {
            sink.borrow_mut().push(1);
            let inner = sink.clone();
            schedule(move || inner.borrow_mut().push(2));
            assert_eq!(flush(), 0);
        });

        assert_eq!(flush(), 2);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }
}
