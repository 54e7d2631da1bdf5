//! Subject - hot な multicast
//!
//! - **Subject**: 購読後に流れた値だけを全購読者に配る
//! - **BehaviorSubject**: 初期値を持ち、購読時に現在値を 1 つ流す
//!
//! どちらも rxrust の `Subject` / `BehaviorSubject` に終端状態を足した薄い包みです。
//! 終端した後に購読した側には、その終端（完了 or エラー）だけが届きます。
//!
//! # 再入
//! rxrust の Subject は配送中に購読者リストを借用しています。
//! 配送中に同じ Subject へ `next()` / `complete()` を呼んではいけません。
//! 配送中の購読は次の `next()` から有効になります。

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rxrust::behavior::Behavior;
use rxrust::observable::defer;
use rxrust::observer::Observer;
use rxrust::ops::box_it::{BoxIt, CloneableBoxOp};
use rxrust::subject::{BehaviorSubject as RxBehaviorSubject, Subject as RxSubject};

use super::error::StreamError;
use super::observable::Observable;

type RxShared<T> = RxSubject<'static, T, StreamError>;

/// 完了・解除できるもの（connector が所有 Subject をまとめて閉じるのに使う）
pub trait Completable {
    fn complete(&self);
    fn is_closed(&self) -> bool;
}

#[derive(Clone)]
enum Terminal {
    Error(StreamError),
    Complete,
}

/// 共有される終端状態
type TerminalSlot = Rc<RefCell<Option<Terminal>>>;

/// 終端済みならその終端を、そうでなければ `live` を購読させる
fn guarded<T: Clone + 'static>(
    terminal: &TerminalSlot,
    live: impl Fn() -> CloneableBoxOp<'static, T, StreamError> + Clone + 'static,
) -> Observable<T> {
    let terminal = terminal.clone();
    Observable::from_rx(defer(move || match terminal.borrow().clone() {
        Some(Terminal::Complete) => Observable::<T>::empty().to_rx(),
        Some(Terminal::Error(err)) => Observable::<T>::throw(err).to_rx(),
        None => live(),
    }))
}

/// Subject は hot な multicast ストリーム
pub struct Subject<T> {
    inner: RxShared<T>,
    terminal: TerminalSlot,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            terminal: self.terminal.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: RxShared::default(),
            terminal: Rc::new(RefCell::new(None)),
        }
    }

    /// 現在の購読者に値を配る（終端後は捨てる）
    pub fn next(&self, value: T) {
        if self.is_closed() {
            return;
        }
        let mut inner = self.inner.clone();
        inner.next(value);
    }

    pub fn error(&self, err: StreamError) {
        if self.terminate(Terminal::Error(err.clone())) {
            self.inner.clone().error(err);
        }
    }

    pub fn complete(&self) {
        if self.terminate(Terminal::Complete) {
            self.inner.clone().complete();
        }
    }

    fn terminate(&self, terminal: Terminal) -> bool {
        let mut slot = self.terminal.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(terminal);
        true
    }

    pub fn as_observable(&self) -> Observable<T> {
        let inner = self.inner.clone();
        guarded(&self.terminal, move || inner.clone().box_it())
    }

    pub fn is_closed(&self) -> bool {
        self.terminal.borrow().is_some()
    }

    /// 同じ Subject を指しているか
    pub fn same_as(&self, other: &Subject<T>) -> bool {
        Rc::ptr_eq(&self.terminal, &other.terminal)
    }
}

impl<T: Clone + 'static> Completable for Subject<T> {
    fn complete(&self) {
        Subject::complete(self);
    }

    fn is_closed(&self) -> bool {
        Subject::is_closed(self)
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("closed", &self.terminal.borrow().is_some())
            .finish()
    }
}

/// BehaviorSubject は現在値を持つ Subject
///
/// # 使用例
/// ```ignore
/// let props = BehaviorSubject::new(initial_props);
/// props.as_observable().subscribe(|p| render(&p)); // 現在値がすぐ流れる
/// props.next(next_props);
/// assert_eq!(props.value(), next_props);
/// ```
pub struct BehaviorSubject<T> {
    inner: RxBehaviorSubject<T, RxShared<T>>,
    terminal: TerminalSlot,
}

impl<T: Clone> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            terminal: self.terminal.clone(),
        }
    }
}

impl<T: Clone + 'static> BehaviorSubject<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: RxBehaviorSubject::new(initial),
            terminal: Rc::new(RefCell::new(None)),
        }
    }

    pub fn value(&self) -> T {
        Behavior::<T, StreamError>::peek(&self.inner)
    }

    /// 現在値を更新して配る（終端後は値も更新しない）
    pub fn next(&self, value: T) {
        if self.is_closed() {
            return;
        }
        let mut inner = self.inner.clone();
        Observer::<T, StreamError>::next(&mut inner, value);
    }

    pub fn error(&self, err: StreamError) {
        if self.terminate(Terminal::Error(err.clone())) {
            Observer::<T, StreamError>::error(self.inner.clone(), err);
        }
    }

    pub fn complete(&self) {
        if self.terminate(Terminal::Complete) {
            Observer::<T, StreamError>::complete(self.inner.clone());
        }
    }

    fn terminate(&self, terminal: Terminal) -> bool {
        let mut slot = self.terminal.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(terminal);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.terminal.borrow().is_some()
    }

    /// 現在値から始まるストリーム
    pub fn as_observable(&self) -> Observable<T> {
        let inner = self.inner.clone();
        guarded(&self.terminal, move || inner.clone().box_it())
    }
}

impl<T: Clone + 'static> Completable for BehaviorSubject<T> {
    fn complete(&self) {
        BehaviorSubject::complete(self);
    }

    fn is_closed(&self) -> bool {
        BehaviorSubject::is_closed(self)
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for BehaviorSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorSubject")
            .field("value", &self.value())
            .field("closed", &self.is_closed())
            .finish()
    }
}
