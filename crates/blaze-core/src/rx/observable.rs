//! Observable - rxrust のストリームを包む cold な Observable
//!
//! # Observable
//! `Observable<T>` は rxrust の `CloneableBoxOp<'static, T, StreamError>` を包んだ型です。
//! 購読のたびに上流を購読し直し、オペレータの状態は購読ごとに独立します。
//!
//! # 購読
//! - `subscribe_with()`: `Notification<T>` を受け取る sink で購読
//! - `subscribe()`: 値だけを受け取る（処理されなかったエラーは `error!` で出す）
//!
//! error / complete を受け取った後の通知は sink に届きません。
//! どちらも返り値の `Subscription` で解除します。

use std::cell::Cell;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;

use rxrust::observable::{self as rx, Observable as RxObservable};
use rxrust::observer::{BoxObserver, Observer};
use rxrust::ops::box_it::{BoxIt, CloneableBoxOp};
use rxrust::prelude::ObservableExt;
use rxrust::subscriber::Subscriber;
use tracing::error;

use super::error::StreamError;
use super::subscription::Subscription;

/// ストリームが運ぶ通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

/// 自前のオペレータが値を渡す下流
pub(crate) type Downstream<T> = Subscriber<BoxObserver<'static, T, StreamError>>;

/// Observable は rxrust のストリームに型を固定した cold なストリーム
pub struct Observable<T: 'static> {
    inner: CloneableBoxOp<'static, T, StreamError>,
}

impl<T: 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Observable")
    }
}

impl<T: 'static> Observable<T> {
    /// rxrust のストリームから作る
    ///
    /// # 使用例
    /// ```ignore
    /// let subject = rxrust::subject::Subject::<'static, u32, StreamError>::default();
    /// let stream = Observable::from_rx(subject.clone().map(|v| v * 2));
    /// ```
    pub fn from_rx<S>(source: S) -> Self
    where
        S: BoxIt<CloneableBoxOp<'static, T, StreamError>>,
    {
        Self {
            inner: source.box_it(),
        }
    }

    /// rxrust のオペレータへ渡すための複製
    pub fn to_rx(&self) -> CloneableBoxOp<'static, T, StreamError> {
        self.inner.clone()
    }

    /// 下流を受け取って上流を購読する関数から作る
    pub(crate) fn from_producer(subscribe: impl Fn(Downstream<T>) -> Subscription + 'static) -> Self {
        Self::from_rx(Producer {
            subscribe: Rc::new(subscribe),
        })
    }

    /// rxrust の Observer で購読する
    pub(crate) fn subscribe_observer<O>(&self, observer: O) -> Subscription
    where
        O: Observer<T, StreamError> + 'static,
    {
        let handle = <CloneableBoxOp<'static, T, StreamError> as RxObservable<T, StreamError, O>>::actual_subscribe(
            self.inner.clone(),
            observer,
        );
        let subscription = Subscription::new();
        subscription.add_teardown(move || rxrust::subscription::Subscription::unsubscribe(handle));
        subscription
    }

    /// すべての通知を受け取る sink で購読
    pub fn subscribe_with(&self, sink: impl Fn(Notification<T>) + 'static) -> Subscription {
        self.subscribe_observer(SinkObserver {
            sink: Rc::new(sink),
            stopped: Rc::new(Cell::new(false)),
        })
    }

    /// 値だけを受け取って購読
    ///
    /// 処理されなかったエラーは `error!` でログに出して捨てます。
    pub fn subscribe(&self, next: impl Fn(T) + 'static) -> Subscription {
        self.subscribe_with(move |notification| match notification {
            Notification::Next(value) => next(value),
            Notification::Error(err) => error!(error = %err, "unhandled stream error"),
            Notification::Complete => {}
        })
    }

    /// 何も流さずに完了する
    pub fn empty() -> Self {
        Self::from_producer(|downstream| {
            downstream.complete();
            Subscription::new()
        })
    }

    /// 何も流さず、完了もしない
    pub fn never() -> Self {
        Self::from_producer(|_| Subscription::new())
    }

    /// 購読と同時にエラーになる
    pub fn throw(err: StreamError) -> Self {
        Self::from_producer(move |downstream| {
            downstream.error(err.clone());
            Subscription::new()
        })
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// 1 つの値を流して完了する
    pub fn of(value: T) -> Self {
        Self::from_iter([value])
    }

    /// 値を順に流して完了する
    pub fn from_iter(values: impl IntoIterator<Item = T>) -> Self {
        let values: Vec<T> = values.into_iter().collect();
        Self::from_rx(rx::from_iter(values).on_error_map(never_fails))
    }
}

fn never_fails(err: Infallible) -> StreamError {
    match err {}
}

/// `from_producer` の rxrust 側の実体
struct Producer<T> {
    subscribe: Rc<dyn Fn(Downstream<T>) -> Subscription>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe: self.subscribe.clone(),
        }
    }
}

impl<T: 'static, O> RxObservable<T, StreamError, O> for Producer<T>
where
    O: Observer<T, StreamError> + 'static,
{
    type Unsub = Subscription;

    fn actual_subscribe(self, observer: O) -> Subscription {
        let downstream = Subscriber::<BoxObserver<'static, T, StreamError>>::new::<T, StreamError>(Some(
            BoxObserver::new(observer),
        ));
        (self.subscribe)(downstream)
    }
}

impl<T> ObservableExt<T, StreamError> for Producer<T> {}

/// `subscribe_with` の終端
///
/// 終端通知は印を付けるだけで、配送中に上流の購読は解除しません。
struct SinkObserver<T> {
    sink: Rc<dyn Fn(Notification<T>)>,
    stopped: Rc<Cell<bool>>,
}

impl<T> Observer<T, StreamError> for SinkObserver<T> {
    fn next(&mut self, value: T) {
        if !self.stopped.get() {
            (self.sink)(Notification::Next(value));
        }
    }

    fn error(self, err: StreamError) {
        if !self.stopped.replace(true) {
            (self.sink)(Notification::Error(err));
        }
    }

    fn complete(self) {
        if !self.stopped.replace(true) {
            (self.sink)(Notification::Complete);
        }
    }

    fn is_finished(&self) -> bool {
        self.stopped.get()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{Notification, Observable};
    use crate::rx::subscription::Subscription;

    /// 受け取った通知を記録する（テスト用）
    pub(crate) fn record<T: Clone + 'static>(
        source: &Observable<T>,
    ) -> (Rc<RefCell<Vec<Notification<T>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let subscription = source.subscribe_with(move |n| sink.borrow_mut().push(n));
        (log, subscription)
    }

    pub(crate) fn values<T: Clone>(log: &Rc<RefCell<Vec<Notification<T>>>>) -> Vec<T> {
        log.borrow()
            .iter()
            .filter_map(|n| match n {
                Notification::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}
