//! Controller - 入力ストリームから出力の宣言を作る純粋関数
//!
//! controller は `InputStreams` を受け取り、同期的に `ControllerOutput` を返します。
//! 呼び出しの中で副作用を起こしてはいけません。副作用はすべてストリームとして
//! 宣言し、connector が mount 時に購読します。

use std::any::type_name;
use std::fmt::Debug;
use std::rc::Rc;

use tracing::{debug, error};

use super::Diagnostics;
use super::bindings::ViewBindings;
use super::dispatch::DispatchError;
use super::inputs::InputStreams;
use super::props::{PropLookup, Props};
use crate::di::{Container, Key, ResolveError};
use crate::rx::{Completable, Observable, combine_latest2, merge};

/// Controller は `InputStreams<P>` → `ControllerOutput<P, S>` の関数
pub struct Controller<P: 'static, S: 'static> {
    f: Rc<dyn Fn(&InputStreams<P>) -> ControllerOutput<P, S>>,
}

impl<P: 'static, S: 'static> Clone for Controller<P, S> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<P: Props, S: Default + Clone + 'static> Controller<P, S> {
    pub fn new(f: impl Fn(&InputStreams<P>) -> ControllerOutput<P, S> + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    pub fn invoke(&self, inputs: &InputStreams<P>) -> ControllerOutput<P, S> {
        (self.f)(inputs)
    }
}

/// 外部イベントを props のコールバックへ転送する配線
struct ExternalEvent<P: 'static> {
    name: &'static str,
    wire: Box<dyn Fn(&WiringContext<P>) -> Observable<()>>,
}

struct WiringContext<P: 'static> {
    props: Observable<P>,
    /// Some のときは mount 後にだけ流す
    gate: Option<Observable<()>>,
    diagnostics: Diagnostics,
}

/// ControllerOutput は controller が返す出力の宣言
///
/// # 使用例
/// ```ignore
/// ControllerOutput::new(
///     ViewBindings::new().field("name", Binding::stream(name$, String::new()), |s, v| s.name = v),
/// )
/// .effect(add_item_effect$)
/// .external_event("on_added", added$)
/// .owns(name_subject)
/// ```
pub struct ControllerOutput<P: 'static, S: 'static> {
    view_state: ViewBindings<P, S>,
    effects: Vec<Observable<()>>,
    external_events: Vec<ExternalEvent<P>>,
    owned: Vec<Box<dyn Completable>>,
}

impl<P: Props, S: Default + Clone + 'static> ControllerOutput<P, S> {
    pub fn new(view_state: ViewBindings<P, S>) -> Self {
        Self {
            view_state,
            effects: Vec::new(),
            external_events: Vec::new(),
            owned: Vec::new(),
        }
    }

    /// 副作用のためだけに購読するストリーム（値は捨てる）
    pub fn effect<T: Clone + 'static>(mut self, stream: Observable<T>) -> Self {
        self.effects.push(stream.map(|_| ()));
        self
    }

    /// 値を現在の props の同名コールバックへ転送するストリーム
    pub fn external_event<A: Clone + Debug + 'static>(
        mut self,
        name: &'static str,
        stream: Observable<A>,
    ) -> Self {
        let wire = move |ctx: &WiringContext<P>| -> Observable<()> {
            let values = match &ctx.gate {
                Some(mount) => combine_latest2(&stream, mount).map(|(value, _)| value),
                None => stream.clone(),
            };
            let diagnostics = ctx.diagnostics.clone();
            values
                .with_latest_from(&ctx.props)
                .map(move |(value, props)| deliver(&props, name, value, &diagnostics))
        };
        self.external_events.push(ExternalEvent {
            name,
            wire: Box::new(wire),
        });
        self
    }

    /// unmount 時に完了させる Subject
    pub fn owns(mut self, subject: impl Completable + 'static) -> Self {
        self.owned.push(Box::new(subject));
        self
    }

    pub fn view_state(&self) -> &ViewBindings<P, S> {
        &self.view_state
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn external_event_names(&self) -> Vec<&'static str> {
        self.external_events.iter().map(|e| e.name).collect()
    }

    /// 購読すべきストリームを 1 本にまとめる
    ///
    /// スナップショットごとに `on_state` が呼ばれます。
    /// `gate_on_mount` が true なら外部イベントは mount 後にだけ転送されます。
    pub(crate) fn wire(
        self,
        inputs: &InputStreams<P>,
        gate_on_mount: bool,
        diagnostics: &Diagnostics,
        on_state: impl Fn(&S) + 'static,
    ) -> (Observable<()>, Vec<Box<dyn Completable>>) {
        let props = inputs.props();
        let snapshots = self
            .view_state
            .snapshot_stream(&props, diagnostics)
            .tap(on_state)
            .map(|_| ());

        let ctx = WiringContext {
            props,
            gate: gate_on_mount.then(|| inputs.mount()),
            diagnostics: diagnostics.clone(),
        };
        let mut streams = vec![snapshots];
        streams.extend(self.effects);
        streams.extend(self.external_events.iter().map(|event| (event.wire)(&ctx)));
        (merge(streams), self.owned)
    }
}

fn deliver<P: Props, A: Clone + Debug + 'static>(
    props: &P,
    name: &str,
    value: A,
    diagnostics: &Diagnostics,
) {
    match props.callback(name) {
        PropLookup::Callable(callback) => match callback.downcast::<A>() {
            Some(callback) => {
                if diagnostics.debug {
                    debug!(component = %diagnostics.component, event = name, payload = ?value, "external event");
                }
                callback.call(value);
            }
            None => {
                let err = DispatchError::PayloadMismatch {
                    name: name.to_string(),
                    expected: callback.payload_type(),
                    actual: type_name::<A>(),
                };
                error!(component = %diagnostics.component, "{err}");
            }
        },
        PropLookup::NotCallable => {
            let err = DispatchError::NotCallable(name.to_string());
            error!(component = %diagnostics.component, "{err}");
        }
        PropLookup::Missing => {
            let err = DispatchError::MissingCallback(name.to_string());
            debug!(component = %diagnostics.component, "{err}");
        }
    }
}

/// Controller の取得方法
pub enum ControllerSource<P: 'static, S: 'static> {
    /// 直接作る
    Factory(Rc<dyn Fn() -> Controller<P, S>>),
    /// DI コンテナから解決する
    Key(Key<Controller<P, S>>),
}

impl<P: Props, S: Default + Clone + 'static> ControllerSource<P, S> {
    pub fn factory(f: impl Fn() -> Controller<P, S> + 'static) -> Self {
        ControllerSource::Factory(Rc::new(f))
    }

    pub fn obtain(&self, container: &Container) -> Result<Controller<P, S>, ResolveError> {
        match self {
            ControllerSource::Factory(factory) => Ok(factory()),
            ControllerSource::Key(key) => container.resolve(key),
        }
    }
}

impl<P: 'static, S: 'static> From<Key<Controller<P, S>>> for ControllerSource<P, S> {
    fn from(key: Key<Controller<P, S>>) -> Self {
        ControllerSource::Key(key)
    }
}

impl<P, S> From<&Key<Controller<P, S>>> for ControllerSource<P, S> {
    fn from(key: &Key<Controller<P, S>>) -> Self {
        ControllerSource::Key(*key)
    }
}

impl<P: 'static, S: 'static> From<Controller<P, S>> for ControllerSource<P, S> {
    fn from(controller: Controller<P, S>) -> Self {
        ControllerSource::Factory(Rc::new(move || controller.clone()))
    }
}
