//! TodoInput - 新しい todo の入力欄
//!
//! Enter か追加ボタンで入力中の文字列を `add_todo` に渡し、
//! 次の tick で入力欄を空に戻します。
//! 空白だけの入力は捨てますが、渡す文字列は入力のままです（trim しない）。

use std::rc::Rc;
use std::sync::LazyLock;

use blaze_core::connector::{
    Binding, Callback, Controller, ControllerOutput, Dispatcher, InputStreams, PropLookup, Props, ViewBindings,
};
use blaze_core::di::{Key, key};
use blaze_core::ports::View;
use blaze_core::rx::merge;
use serde::Serialize;

use super::state::TodoStateService;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoInputProps {
    /// 追加された todo の本文を受け取る
    pub on_added: Option<Callback<String>>,
}

impl Props for TodoInputProps {
    fn callback(&self, name: &str) -> PropLookup {
        match name {
            "on_added" => (&self.on_added).into(),
            _ => PropLookup::Missing,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TodoInputState {
    pub name: String,
}

pub static TODO_INPUT_CONTROLLER_KEY: LazyLock<Key<Controller<TodoInputProps, TodoInputState>>> =
    LazyLock::new(|| key("TodoInputController"));

pub fn todo_input_controller(service: Rc<dyn TodoStateService>) -> Controller<TodoInputProps, TodoInputState> {
    Controller::new(move |inputs: &InputStreams<TodoInputProps>| {
        let add_item = merge([
            inputs.on::<()>("on_key_down_enter"),
            inputs.on::<()>("on_add_button_click"),
        ]);

        // 追加の effect が入力中の値を読み終えてから空に戻す
        let name = merge([
            inputs.on::<String>("on_change"),
            add_item.map(|_| String::new()).delay_to_next_tick(),
        ])
        .start_with(String::new());

        let added = add_item
            .with_latest_from(&name)
            .map(|(_, name)| name)
            .filter(|name: &String| !name.trim().is_empty());

        let service = service.clone();
        let add_todo = added.tap(move |name| service.add_todo(name));

        ControllerOutput::new(ViewBindings::new().field(
            "name",
            Binding::stream(name, String::new()),
            |s: &mut TodoInputState, v| s.name = v,
        ))
        .effect(add_todo)
        .external_event("on_added", added)
    })
}

pub struct TodoInputView;

impl View for TodoInputView {
    type State = TodoInputState;
    type Output = String;

    fn render(&self, state: &TodoInputState, _events: &Dispatcher) -> String {
        if state.name.is_empty() {
            "> (what needs to be done?)".to_string()
        } else {
            format!("> {}", state.name)
        }
    }
}
