//! Operators
//!
//! controller が使うオペレータ群です。いずれも購読ごとに独立した状態を持ちます。
//! ほとんどは rxrust のオペレータをそのまま呼び、型を `Observable<T>` に戻すだけです。
//!
//! | オペレータ | 振る舞い | 実装 |
//! |---|---|---|
//! | `map` / `filter` / `tap` | 値ごとの変換・選別・観測 | rxrust |
//! | `try_map` | 失敗した変換をストリームのエラーにする | 自前 |
//! | `scan` | 累積値を流す（種は流さない） | rxrust `scan_initial` |
//! | `start_with` | 購読時に先頭の値を流す | rxrust |
//! | `distinct_until_changed` | 直前と同じ値を捨てる | rxrust |
//! | `with_latest_from` | 他方の最新値と組にする（他方が未発行なら捨てる） | rxrust |
//! | `share` | 最初の購読で上流に 1 度だけ接続し、値を multicast する | rxrust |
//! | `delay_to_next_tick` | 配送を `scheduler::flush()` まで遅らせる | 自前 |
//! | `throttle_time` | 先頭の値を流し、一定時間は後続を捨てる | 自前（`Clock` で時刻を読む） |
//!
//! `merge` / `combine_latest` は rxrust の 2 項演算を畳み込んで n 項にしたものです。

use std::rc::Rc;
use std::time::{Duration, Instant};

use rxrust::observer::Observer;
use rxrust::prelude::ObservableExt;

use super::error::StreamError;
use super::observable::{Downstream, Observable};
use super::scheduler;
use crate::ports::clock::{Clock, SystemClock};

impl<T: Clone + 'static> Observable<T> {
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Observable<U> {
        let f = Rc::new(f);
        Observable::from_rx(self.to_rx().map(move |value| f(value)))
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Observable<T> {
        let predicate = Rc::new(predicate);
        Observable::from_rx(self.to_rx().filter(move |value: &T| predicate(value)))
    }

    pub fn tap(&self, f: impl Fn(&T) + 'static) -> Observable<T> {
        let f = Rc::new(f);
        Observable::from_rx(self.to_rx().tap(move |value: &T| f(value)))
    }

    /// 失敗した変換はストリームのエラーになる
    pub fn try_map<U: 'static>(
        &self,
        f: impl Fn(T) -> Result<U, StreamError> + 'static,
    ) -> Observable<U> {
        let source = self.clone();
        let project: Rc<dyn Fn(T) -> Result<U, StreamError>> = Rc::new(f);
        Observable::from_producer(move |downstream| {
            source.subscribe_observer(TryMap {
                downstream,
                project: project.clone(),
            })
        })
    }

    pub fn scan<A: Clone + 'static>(
        &self,
        seed: A,
        f: impl Fn(A, T) -> A + 'static,
    ) -> Observable<A> {
        let f = Rc::new(f);
        Observable::from_rx(self.to_rx().scan_initial(seed, move |acc, value| f(acc, value)))
    }

    pub fn start_with(&self, value: T) -> Observable<T> {
        Observable::from_rx(self.to_rx().start_with(vec![value]))
    }

    pub fn distinct_until_changed(&self) -> Observable<T>
    where
        T: PartialEq,
    {
        Observable::from_rx(self.to_rx().distinct_until_changed())
    }

    /// `other` の最新値と組にする。`other` がまだ値を出していなければ捨てる
    pub fn with_latest_from<U: Clone + 'static>(&self, other: &Observable<U>) -> Observable<(T, U)> {
        Observable::from_rx(self.to_rx().with_latest_from(other.to_rx()))
    }

    /// 最初の購読で上流に 1 度だけ接続し、以後の購読者と値を分け合う
    ///
    /// 購読前に流れた値は再生しません。上流が終端した後に購読しても何も届きません。
    pub fn share(&self) -> Observable<T> {
        Observable::from_rx(self.to_rx().share())
    }

    /// 通知を次の tick まで遅らせる
    pub fn delay_to_next_tick(&self) -> Observable<T> {
        let source = self.clone();
        Observable::from_producer(move |downstream| {
            let subscription = source.subscribe_observer(NextTick {
                downstream: downstream.clone(),
            });
            subscription.add_teardown(move || rxrust::subscription::Subscription::unsubscribe(downstream));
            subscription
        })
    }

    /// 先頭の値を流し、`window` の間は後続の値を捨てる
    pub fn throttle_time(&self, window: Duration) -> Observable<T> {
        self.throttle_time_with(window, Rc::new(SystemClock))
    }

    pub fn throttle_time_with(&self, window: Duration, clock: Rc<dyn Clock>) -> Observable<T> {
        let source = self.clone();
        Observable::from_producer(move |downstream| {
            source.subscribe_observer(Throttle {
                downstream,
                window,
                clock: clock.clone(),
                last: None,
            })
        })
    }
}

/// 複数のストリームを到着順に 1 本にする。すべて完了したら完了
pub fn merge<T: Clone + 'static>(sources: impl IntoIterator<Item = Observable<T>>) -> Observable<T> {
    let mut sources = sources.into_iter();
    let Some(first) = sources.next() else {
        return Observable::empty();
    };
    sources.fold(first, |merged, source| {
        Observable::from_rx(merged.to_rx().merge(source.to_rx()))
    })
}

/// 位置ごとの最新値の組を流す
///
/// すべての入力が少なくとも 1 つ値を出すまでは何も流しません。
/// すべての入力が完了したときに完了します。
pub fn combine_latest<T: Clone + 'static>(
    sources: impl IntoIterator<Item = Observable<T>>,
) -> Observable<Vec<T>> {
    let mut sources = sources.into_iter();
    let Some(first) = sources.next() else {
        return Observable::empty();
    };
    sources.fold(first.map(|value| vec![value]), |combined, source| {
        Observable::from_rx(combined.to_rx().combine_latest(source.to_rx(), |mut row: Vec<T>, value| {
            row.push(value);
            row
        }))
    })
}

/// 2 本の異なる型のストリームの combine_latest
pub fn combine_latest2<A, B>(a: &Observable<A>, b: &Observable<B>) -> Observable<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    Observable::from_rx(a.to_rx().combine_latest(b.to_rx(), |a, b| (a, b)))
}

struct TryMap<T, U> {
    downstream: Downstream<U>,
    project: Rc<dyn Fn(T) -> Result<U, StreamError>>,
}

impl<T: 'static, U: 'static> Observer<T, StreamError> for TryMap<T, U> {
    fn next(&mut self, value: T) {
        match (self.project)(value) {
            Ok(mapped) => self.downstream.next(mapped),
            Err(err) => self.downstream.clone().error(err),
        }
    }

    fn error(self, err: StreamError) {
        self.downstream.error(err);
    }

    fn complete(self) {
        self.downstream.complete();
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

struct NextTick<T> {
    downstream: Downstream<T>,
}

impl<T: 'static> Observer<T, StreamError> for NextTick<T> {
    fn next(&mut self, value: T) {
        let mut downstream = self.downstream.clone();
        scheduler::schedule(move || downstream.next(value));
    }

    fn error(self, err: StreamError) {
        let downstream = self.downstream;
        scheduler::schedule(move || downstream.error(err));
    }

    fn complete(self) {
        let downstream = self.downstream;
        scheduler::schedule(move || downstream.complete());
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

struct Throttle<T> {
    downstream: Downstream<T>,
    window: Duration,
    clock: Rc<dyn Clock>,
    last: Option<Instant>,
}

impl<T: 'static> Observer<T, StreamError> for Throttle<T> {
    fn next(&mut self, value: T) {
        let now = self.clock.now();
        let open = match self.last {
            Some(at) => now.saturating_duration_since(at) >= self.window,
            None => true,
        };
        if open {
            self.last = Some(now);
            self.downstream.next(value);
        }
    }

    fn error(self, err: StreamError) {
        self.downstream.error(err);
    }

    fn complete(self) {
        self.downstream.complete();
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}
