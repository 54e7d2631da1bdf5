//! Counter - 増減ボタンだけのコンポーネント
//!
//! mount のたびに 0 に戻ります。

use std::sync::LazyLock;

use blaze_core::connector::{Binding, Controller, ControllerOutput, Dispatcher, InputStreams, ViewBindings};
use blaze_core::di::{ContainerBuilder, Key, Lifetime, RegistrationError, key};
use blaze_core::ports::View;
use blaze_core::rx::merge;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CounterState {
    pub val: i32,
}

pub static COUNTER_CONTROLLER_KEY: LazyLock<Key<Controller<(), CounterState>>> =
    LazyLock::new(|| key("CounterController"));

/// 増減イベントを累積する controller
///
/// mount は 0 として流れ、累積値をリセットします。
pub fn counter_controller() -> Controller<(), CounterState> {
    Controller::new(|inputs: &InputStreams<()>| {
        let val = merge([
            inputs.on::<()>("on_decrement_click").map(|_| -1),
            inputs.on::<()>("on_increment_click").map(|_| 1),
            inputs.mount().map(|_| 0),
        ])
        .scan(0, |acc, delta| if delta == 0 { 0 } else { acc + delta })
        .share();

        ControllerOutput::new(
            ViewBindings::new().field("val", Binding::stream(val, 0), |s: &mut CounterState, v| s.val = v),
        )
    })
}

pub struct CounterView;

impl View for CounterView {
    type State = CounterState;
    type Output = String;

    fn render(&self, state: &CounterState, _events: &Dispatcher) -> String {
        format!("[-] {} [+]", state.val)
    }
}

pub fn counter_module(builder: &mut ContainerBuilder) -> Result<(), RegistrationError> {
    builder.register_with(&*COUNTER_CONTROLLER_KEY, Lifetime::Transient, |_| Ok(counter_controller()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaze_core::connector::{Harness, Lifecycle, connect};
    use rstest::rstest;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[rstest]
    #[case::on_mount(&[], 0)]
    #[case::increment(&["on_increment_click"], 1)]
    #[case::decrement(&["on_decrement_click"], -1)]
    #[case::increment_and_decrement(&["on_increment_click", "on_decrement_click"], 0)]
    #[case::twice_up(&["on_increment_click", "on_increment_click"], 2)]
    fn counts_clicks(#[case] clicks: &[&str], #[case] expected: i32) {
        let harness = Harness::new(&counter_controller(), ());
        harness.mount();

        for name in clicks {
            harness.event::<()>(name).next(());
        }

        assert_eq!(harness.out().val, expected);
    }

    #[test]
    fn remount_resets_to_zero() {
        let harness = Harness::new(&counter_controller(), ());
        harness.mount();
        harness.event::<()>("on_increment_click").next(());
        harness.event::<()>("on_increment_click").next(());
        harness.mount();

        assert_eq!(harness.out().val, 0);
    }

    #[test]
    fn connects_through_container() {
        let mut builder = ContainerBuilder::new();
        builder.register_module(counter_module).unwrap();
        let root = builder.build().unwrap();

        let mut counter = connect(CounterView, *COUNTER_CONTROLLER_KEY)
            .instantiate(&root.create_scope("screen"), ())
            .unwrap();
        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = frames.clone();
        counter.mount(move |frame: String| sink.borrow_mut().push(frame));
        counter.dispatcher().dispatch("on_increment_click", ());
        counter.unmount();

        assert_eq!(*frames.borrow(), vec!["[-] 0 [+]", "[-] 1 [+]"]);
        assert_eq!(counter.lifecycle(), Lifecycle::Disposed);
    }
}
