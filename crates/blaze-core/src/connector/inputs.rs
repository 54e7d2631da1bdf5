//! Input Stream Hub - controller への入力
//!
//! # よく知られたストリーム
//! - `props()`: 初期 props を持つ最新値ストリーム（`set_props` で更新）
//! - `mount()` / `unmount()`: ライフサイクル通知（値なし）
//!
//! # 名前付きイベント
//! それ以外の入力は `event::<A>(name)` で取り出します。
//! 最初のアクセスで Subject を作り、以後同じ名前には同じ Subject を返します。
//! controller 側（`InputStreams`）と View 側（`Dispatcher`）は同じ表を共有します。

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::dispatch::{DispatchError, Dispatcher};
use super::Diagnostics;
use crate::rx::{BehaviorSubject, Observable, Subject};

/// payload 型を消した Subject
trait ErasedSubject {
    fn as_any(&self) -> &dyn Any;
    fn complete(&self);
    fn payload_type(&self) -> &'static str;
}

impl<A: Clone + 'static> ErasedSubject for Subject<A> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn complete(&self) {
        Subject::complete(self);
    }

    fn payload_type(&self) -> &'static str {
        type_name::<A>()
    }
}

/// 名前 → Subject の表
#[derive(Default)]
pub(crate) struct EventTable {
    events: RefCell<HashMap<String, Rc<dyn ErasedSubject>>>,
    completed: Cell<bool>,
}

impl EventTable {
    /// 名前に対応する Subject を取り出す（なければ作る）
    ///
    /// hub が完了した後に作られる Subject は最初から完了しています。
    pub(crate) fn lookup<A: Clone + 'static>(&self, name: &str) -> Result<Subject<A>, DispatchError> {
        if let Some(existing) = self.events.borrow().get(name) {
            return match existing.as_any().downcast_ref::<Subject<A>>() {
                Some(subject) => Ok(subject.clone()),
                None => Err(DispatchError::PayloadMismatch {
                    name: name.to_string(),
                    expected: existing.payload_type(),
                    actual: type_name::<A>(),
                }),
            };
        }

        let subject = Subject::<A>::new();
        if self.completed.get() {
            subject.complete();
        }
        self.events
            .borrow_mut()
            .insert(name.to_string(), Rc::new(subject.clone()));
        trace!(event = name, payload = type_name::<A>(), "input subject created");
        Ok(subject)
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.get()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.events.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    fn complete(&self) {
        self.completed.set(true);
        let subjects: Vec<Rc<dyn ErasedSubject>> = self.events.borrow().values().cloned().collect();
        for subject in subjects {
            subject.complete();
        }
    }
}

/// InputStreams は controller に渡される入力
///
/// ライフサイクル操作（mount の発火・完了など）は含みません。
pub struct InputStreams<P> {
    props: BehaviorSubject<P>,
    mount: Subject<()>,
    unmount: Subject<()>,
    table: Rc<EventTable>,
}

impl<P: Clone> Clone for InputStreams<P> {
    fn clone(&self) -> Self {
        Self {
            props: self.props.clone(),
            mount: self.mount.clone(),
            unmount: self.unmount.clone(),
            table: self.table.clone(),
        }
    }
}

impl<P: Clone + 'static> InputStreams<P> {
    /// 現在の props から始まる props のストリーム
    pub fn props(&self) -> Observable<P> {
        self.props.as_observable()
    }

    pub fn current_props(&self) -> P {
        self.props.value()
    }

    pub fn mount(&self) -> Observable<()> {
        self.mount.as_observable()
    }

    pub fn unmount(&self) -> Observable<()> {
        self.unmount.as_observable()
    }

    /// 名前付きイベントの Subject
    ///
    /// # Panics
    /// 同じ名前を異なる payload 型で取り出したとき。
    pub fn event<A: Clone + 'static>(&self, name: &str) -> Subject<A> {
        match self.table.lookup::<A>(name) {
            Ok(subject) => subject,
            Err(err) => panic!("{err}"),
        }
    }

    /// 名前付きイベントの Observable（`event(name).as_observable()`）
    pub fn on<A: Clone + 'static>(&self, name: &str) -> Observable<A> {
        self.event::<A>(name).as_observable()
    }

    /// これまでに作られたイベント名（ソート済み）
    pub fn event_names(&self) -> Vec<String> {
        self.table.names()
    }
}

impl<P> fmt::Debug for InputStreams<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStreams")
            .field("events", &self.table.events.borrow().len())
            .field("completed", &self.table.completed.get())
            .finish()
    }
}

/// InputHub は InputStreams の所有者（ライフサイクル操作を持つ）
pub struct InputHub<P> {
    streams: InputStreams<P>,
}

impl<P: Clone + 'static> InputHub<P> {
    pub fn new(initial: P) -> Self {
        Self {
            streams: InputStreams {
                props: BehaviorSubject::new(initial),
                mount: Subject::new(),
                unmount: Subject::new(),
                table: Rc::new(EventTable::default()),
            },
        }
    }

    pub fn streams(&self) -> &InputStreams<P> {
        &self.streams
    }

    pub fn trigger_mount(&self) {
        self.streams.mount.next(());
    }

    pub fn trigger_unmount(&self) {
        self.streams.unmount.next(());
    }

    pub fn set_props(&self, props: P) {
        self.streams.props.next(props);
    }

    /// 作成済みのすべての Subject と props / mount / unmount を完了させる
    ///
    /// 完了後のイベントは捨てられます。
    pub fn complete(&self) {
        self.streams.table.complete();
        self.streams.props.complete();
        self.streams.mount.complete();
        self.streams.unmount.complete();
    }

    pub fn is_completed(&self) -> bool {
        self.streams.table.is_completed()
    }

    pub(crate) fn dispatcher(&self, diagnostics: &Diagnostics) -> Dispatcher {
        Dispatcher::new(self.streams.table.clone(), diagnostics.clone())
    }
}
