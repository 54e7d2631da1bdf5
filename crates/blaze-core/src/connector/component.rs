//! ConnectedComponent - View と Controller を結線したコンポーネント
//!
//! # 状態機械
//! ```text
//! Created --mount()--> Mounted --unmount()--> Disposed
//!    |                                           ^
//!    +-----------------unmount()-----------------+
//! ```
//! - **instantiate**: hub を作り、controller を呼び、初期スナップショットを同期計算
//! - **mount**: まとめたストリームを購読（スナップショットごとに描画）してから mount を通知
//! - **unmount**: unmount を通知 → 購読解除 → 所有 Subject を完了 → hub を完了
//!
//! mount 中に drop された場合も unmount と同じ後始末をします。

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, warn};

use super::Diagnostics;
use super::controller::ControllerSource;
use super::dispatch::Dispatcher;
use super::inputs::InputHub;
use super::props::Props;
use crate::di::{Container, ResolveError};
use crate::ports::{Renderer, View};
use crate::rx::{Completable, Notification, Observable, Subscription, scheduler};

/// View を Controller に結線する
///
/// # 使用例
/// ```ignore
/// let counter = connect(CounterView, &COUNTER_CONTROLLER_KEY).debug_log(true);
/// let mut component = counter.instantiate(&scope, ())?;
/// component.mount(|line: String| println!("{line}"));
/// component.dispatcher().dispatch("increment", ());
/// component.unmount();
/// ```
pub fn connect<V, P>(view: V, source: impl Into<ControllerSource<P, V::State>>) -> Connector<V, P>
where
    V: View,
    V::State: Default,
    P: Props,
{
    Connector {
        view: Rc::new(view),
        source: source.into(),
        display_name: None,
        debug: false,
    }
}

/// Connector は結線の設定（インスタンス化の前）
pub struct Connector<V: View, P: Props> {
    view: Rc<V>,
    source: ControllerSource<P, V::State>,
    display_name: Option<String>,
    debug: bool,
}

impl<V, P> Connector<V, P>
where
    V: View,
    V::State: Default,
    P: Props,
{
    /// 診断用の名前（既定は `BoundTo{View 名}`）
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// イベント・フィールド変化の debug ログ
    pub fn debug_log(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn name(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => format!("BoundTo{}", self.view.name()),
        }
    }

    /// コンポーネントを作る（まだ購読はしない）
    ///
    /// # Errors
    /// Controller を DI から解決できなかったとき。
    pub fn instantiate(
        &self,
        container: &Container,
        props: P,
    ) -> Result<ConnectedComponent<V, P>, ResolveError> {
        let diagnostics = Diagnostics::new(self.name(), self.debug);
        let controller = self.source.obtain(container)?;

        let hub = InputHub::new(props.clone());
        let output = controller.invoke(hub.streams());
        let state = Rc::new(RefCell::new(output.view_state().initial_state(&props)));
        let dispatcher = hub.dispatcher(&diagnostics);
        let renderer: SharedRenderer<V::Output> = Rc::new(RefCell::new(None));

        let on_state = {
            let state = state.clone();
            let renderer = renderer.clone();
            let view = self.view.clone();
            let dispatcher = dispatcher.clone();
            move |snapshot: &V::State| {
                *state.borrow_mut() = snapshot.clone();
                if let Some(renderer) = renderer.borrow().as_ref() {
                    let output = View::render(view.as_ref(), snapshot, &dispatcher);
                    Renderer::render(renderer.as_ref(), output);
                }
            }
        };
        let (stream, owned) = output.wire(hub.streams(), true, &diagnostics, on_state);
        debug!(component = %diagnostics.component, "instantiated");

        Ok(ConnectedComponent {
            diagnostics,
            view: self.view.clone(),
            hub,
            dispatcher,
            state,
            renderer,
            stream,
            owned,
            subscription: None,
            lifecycle: Lifecycle::Created,
        })
    }
}

type SharedRenderer<O> = Rc<RefCell<Option<Box<dyn Renderer<O>>>>>;

/// コンポーネントのライフサイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Mounted,
    Disposed,
}

/// ConnectedComponent は結線済みのコンポーネント
pub struct ConnectedComponent<V: View, P: Props> {
    diagnostics: Diagnostics,
    view: Rc<V>,
    hub: InputHub<P>,
    dispatcher: Dispatcher,
    state: Rc<RefCell<V::State>>,
    renderer: SharedRenderer<V::Output>,
    stream: Observable<()>,
    owned: Vec<Box<dyn Completable>>,
    subscription: Option<Subscription>,
    lifecycle: Lifecycle,
}

impl<V: View, P: Props> ConnectedComponent<V, P> {
    /// 購読を始めて mount を通知する
    ///
    /// 購読と同時に初期スナップショットが描画されます。
    /// 購読中のエラーはログに出し、このコンポーネントの購読だけが止まります。
    pub fn mount(&mut self, renderer: impl Renderer<V::Output> + 'static) {
        if self.lifecycle != Lifecycle::Created {
            warn!(component = %self.diagnostics.component, lifecycle = ?self.lifecycle, "mount ignored");
            return;
        }
        *self.renderer.borrow_mut() = Some(Box::new(renderer));

        let component = self.diagnostics.component.clone();
        let subscription = self.stream.subscribe_with(move |notification| {
            if let Notification::Error(err) = notification {
                error!(component = %component, error = %err, "subscription stopped by error");
            }
        });
        self.subscription = Some(subscription);
        self.lifecycle = Lifecycle::Mounted;
        debug!(component = %self.diagnostics.component, "mounted");
        self.hub.trigger_mount();
        scheduler::flush();
    }

    /// 購読を解除し、所有 Subject と hub を完了させる（2 回目以降は何もしない）
    pub fn unmount(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        if self.lifecycle == Lifecycle::Mounted {
            self.hub.trigger_unmount();
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        for subject in self.owned.drain(..) {
            subject.complete();
        }
        self.hub.complete();
        self.renderer.borrow_mut().take();
        self.lifecycle = Lifecycle::Disposed;
        debug!(component = %self.diagnostics.component, "disposed");
    }

    /// props を更新する。前回と等しければ何もしない
    pub fn set_props(&mut self, props: P) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        if self.hub.streams().current_props() == props {
            return;
        }
        self.hub.set_props(props);
        scheduler::flush();
    }

    /// 現在のスナップショットを描画する
    pub fn render(&self) -> V::Output {
        let state = self.state();
        View::render(self.view.as_ref(), &state, &self.dispatcher)
    }

    /// 現在のスナップショット
    pub fn state(&self) -> V::State {
        self.state.borrow().clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn props(&self) -> P {
        self.hub.streams().current_props()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn name(&self) -> &str {
        &self.diagnostics.component
    }
}

impl<V: View, P: Props> Drop for ConnectedComponent<V, P> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<V: View, P: Props> fmt::Debug for ConnectedComponent<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedComponent")
            .field("name", &self.diagnostics.component)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::bindings::{Binding, ViewBindings};
    use crate::connector::controller::{Controller, ControllerOutput};
    use crate::connector::inputs::InputStreams;
    use crate::connector::props::{Callback, PropLookup};
    use crate::di::{ContainerBuilder, Key, Lifetime, key};
    use crate::rx::{StreamError, Subject, merge};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct CountState {
        label: String,
        count: i32,
    }

    #[derive(Clone, PartialEq)]
    struct CountProps {
        label: String,
        on_reset: Option<Callback<()>>,
    }

    impl Props for CountProps {
        fn callback(&self, name: &str) -> PropLookup {
            match name {
                "on_reset" => (&self.on_reset).into(),
                _ => PropLookup::Missing,
            }
        }
    }

    struct CountView;

    impl View for CountView {
        type State = CountState;
        type Output = String;

        fn render(&self, state: &CountState, _events: &Dispatcher) -> String {
            format!("{}={}", state.label, state.count)
        }
    }

    fn count_controller(owned: Subject<u32>) -> Controller<CountProps, CountState> {
        Controller::new(move |inputs: &InputStreams<CountProps>| {
            let count = merge([
                inputs.on::<()>("increment").map(|_| 1),
                inputs.mount().map(|_| 0),
            ])
            .scan(0, |acc, delta| if delta == 0 { 0 } else { acc + delta });
            let resets = inputs.on::<()>("reset");
            ControllerOutput::new(
                ViewBindings::new()
                    .field("label", Binding::from_props(|p: &CountProps| p.label.clone()), |s: &mut CountState, v| {
                        s.label = v
                    })
                    .field("count", Binding::stream(count, 0), |s: &mut CountState, v| s.count = v),
            )
            .external_event("on_reset", resets)
            .owns(owned.clone())
        })
    }

    fn props(label: &str) -> CountProps {
        CountProps {
            label: label.to_string(),
            on_reset: None,
        }
    }

    fn root() -> Container {
        ContainerBuilder::new().build().unwrap()
    }

    fn frames() -> (Rc<RefCell<Vec<String>>>, impl Fn(String) + 'static) {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = frames.clone();
        (frames, move |frame: String| sink.borrow_mut().push(frame))
    }

    #[test]
    fn display_name_defaults_to_bound_view_name() {
        let connector = connect(CountView, count_controller(Subject::new()));
        assert_eq!(connector.name(), "BoundToCountView");
        assert_eq!(connector.display_name("Counter").name(), "Counter");
    }

    #[test]
    fn initial_snapshot_is_available_before_mount() {
        let component = connect(CountView, count_controller(Subject::new()))
            .instantiate(&root(), props("clicks"))
            .unwrap();

        assert_eq!(component.lifecycle(), Lifecycle::Created);
        assert_eq!(component.render(), "clicks=0");
    }

    #[test]
    fn renders_each_snapshot_after_mount() {
        let mut component = connect(CountView, count_controller(Subject::new()))
            .instantiate(&root(), props("clicks"))
            .unwrap();
        let (frames, renderer) = frames();

        component.mount(renderer);
        component.dispatcher().dispatch("increment", ());
        component.dispatcher().dispatch("increment", ());
        component.set_props(props("clicks"));
        component.set_props(props("taps"));

        assert_eq!(*frames.borrow(), vec!["clicks=0", "clicks=1", "clicks=2", "taps=2"]);
        assert_eq!(component.state().count, 2);
    }

    #[test]
    fn unmount_completes_owned_subjects_and_drops_events() {
        let owned = Subject::new();
        let mut component = connect(CountView, count_controller(owned.clone()))
            .instantiate(&root(), props("clicks"))
            .unwrap();
        let (frames, renderer) = frames();
        component.mount(renderer);

        component.unmount();
        component.dispatcher().dispatch("increment", ());
        component.unmount();

        assert!(owned.is_closed());
        assert_eq!(component.lifecycle(), Lifecycle::Disposed);
        assert_eq!(*frames.borrow(), vec!["clicks=0"]);
    }

    #[test]
    fn drop_while_mounted_tears_down() {
        let owned = Subject::new();
        {
            let mut component = connect(CountView, count_controller(owned.clone()))
                .instantiate(&root(), props("clicks"))
                .unwrap();
            component.mount(|_: String| {});
        }
        assert!(owned.is_closed());
    }

    #[test]
    fn external_event_reaches_current_callback() {
        let resets = Rc::new(RefCell::new(0));
        let sink = resets.clone();
        let mut component = connect(CountView, count_controller(Subject::new()))
            .instantiate(
                &root(),
                CountProps {
                    label: "c".into(),
                    on_reset: Some(Callback::new(move |_: ()| *sink.borrow_mut() += 1)),
                },
            )
            .unwrap();

        component.mount(|_: String| {});
        component.dispatcher().dispatch("reset", ());
        component.set_props(props("c"));
        component.dispatcher().dispatch("reset", ());

        assert_eq!(*resets.borrow(), 1);
    }

    #[test]
    fn controller_is_resolved_by_key() {
        let controller_key: Key<Controller<CountProps, CountState>> = key("CountController");
        let mut builder = ContainerBuilder::new();
        builder
            .register_with(&controller_key, Lifetime::Transient, |_| Ok(count_controller(Subject::new())))
            .unwrap();
        let root = builder.build().unwrap();

        let component = connect(CountView, &controller_key)
            .instantiate(&root.create_scope("screen"), props("k"))
            .unwrap();
        assert_eq!(component.render(), "k=0");

        let missing: Key<Controller<CountProps, CountState>> = key("Missing");
        let result = connect(CountView, missing).instantiate(&root, props("k"));
        assert!(matches!(result, Err(ResolveError::UnregisteredKey(_))));
    }

    #[test]
    fn stream_error_stops_only_this_component() {
        let failing = Controller::new(|inputs: &InputStreams<CountProps>| {
            let count = inputs
                .on::<i32>("set")
                .try_map(|v| if v < 0 { Err(StreamError::new("negative")) } else { Ok(v) });
            ControllerOutput::new(
                ViewBindings::new().field("count", Binding::stream(count, 0), |s: &mut CountState, v| s.count = v),
            )
        });
        let mut component = connect(CountView, failing).instantiate(&root(), props("n")).unwrap();
        let (frames, renderer) = frames();
        component.mount(renderer);

        component.dispatcher().dispatch("set", 3);
        component.dispatcher().dispatch("set", -1);
        component.dispatcher().dispatch("set", 4);

        assert_eq!(*frames.borrow(), vec!["=0", "=3"]);
    }

    #[derive(Clone, PartialEq)]
    struct SizeProps {
        n: i32,
    }

    impl Props for SizeProps {}

    struct SizeView;

    impl View for SizeView {
        type State = CountState;
        type Output = String;

        fn render(&self, state: &CountState, _events: &Dispatcher) -> String {
            format!("n={}", state.count)
        }
    }

    #[test]
    fn deferred_work_from_mount_and_props_is_flushed() {
        let deferred = Controller::new(|inputs: &InputStreams<SizeProps>| {
            let n = inputs.props().map(|p| p.n).delay_to_next_tick();
            ControllerOutput::new(
                ViewBindings::new().field("count", Binding::stream(n, 0), |s: &mut CountState, v| s.count = v),
            )
        });
        let mut component = connect(SizeView, deferred)
            .instantiate(&root(), SizeProps { n: 1 })
            .unwrap();
        let (frames, renderer) = frames();

        component.mount(renderer);
        assert_eq!(component.state().count, 1);
        assert_eq!(scheduler::pending(), 0);

        component.set_props(SizeProps { n: 5 });
        assert_eq!(component.state().count, 5);
        assert_eq!(scheduler::pending(), 0);
        assert_eq!(*frames.borrow(), vec!["n=0", "n=1", "n=5"]);
    }
}
