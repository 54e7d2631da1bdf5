//! TodoItems - todo の一覧とフィルタ
//!
//! 一覧は `items()` と選択中のフィルタの `combine_latest` です。
//! 削除ボタンの連打は 300ms の `throttle_time` で間引きます。

use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;

use blaze_core::connector::{Binding, Controller, ControllerOutput, Dispatcher, InputStreams, ViewBindings};
use blaze_core::di::{Key, key};
use blaze_core::ports::{Clock, View};
use blaze_core::rx::{combine_latest2, merge};
use serde::Serialize;

use super::state::{TodoItem, TodoStateService};

pub const REMOVE_THROTTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FilterType {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterType {
    pub fn accepts(self, item: &TodoItem) -> bool {
        match self {
            FilterType::All => true,
            FilterType::Active => !item.completed,
            FilterType::Completed => item.completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TodoItemsState {
    pub list_items: Vec<ListItem>,
    pub filter_type: FilterType,
}

pub static TODO_ITEMS_CONTROLLER_KEY: LazyLock<Key<Controller<(), TodoItemsState>>> =
    LazyLock::new(|| key("TodoItemsController"));

pub fn todo_items_controller(service: Rc<dyn TodoStateService>, clock: Rc<dyn Clock>) -> Controller<(), TodoItemsState> {
    Controller::new(move |inputs: &InputStreams<()>| {
        let items = service.items();
        let filter_type = merge([
            inputs.mount().map(|_| FilterType::All),
            inputs.on::<FilterType>("on_filter_changed"),
        ]);

        let list_items = combine_latest2(&items, &filter_type).map(|(items, filter)| {
            items
                .iter()
                .filter(|item| filter.accepts(item))
                .map(|item| ListItem {
                    id: item.id.clone(),
                    text: item.value.clone(),
                    completed: item.completed,
                })
                .collect::<Vec<_>>()
        });

        let toggle = {
            let service = service.clone();
            inputs.on::<String>("on_item_toggle").tap(move |id| service.toggle(id))
        };
        let remove = {
            let service = service.clone();
            inputs
                .on::<String>("on_item_remove")
                .throttle_time_with(REMOVE_THROTTLE, clock.clone())
                .tap(move |id| service.remove(id))
        };
        let toggle_all = {
            let service = service.clone();
            inputs
                .on::<()>("on_toggle_all_click")
                .with_latest_from(&items)
                .tap(move |(_, items)| {
                    let all_completed = items.iter().all(|item| item.completed);
                    service.toggle_all(!all_completed);
                })
        };
        let remove_completed = {
            let service = service.clone();
            inputs
                .on::<()>("on_remove_completed_click")
                .tap(move |_| service.remove_completed())
        };

        ControllerOutput::new(
            ViewBindings::new()
                .field("list_items", Binding::stream(list_items, Vec::new()), |s: &mut TodoItemsState, v| {
                    s.list_items = v
                })
                .field("filter_type", Binding::stream(filter_type, FilterType::All), |s: &mut TodoItemsState, v| {
                    s.filter_type = v
                }),
        )
        .effect(toggle)
        .effect(remove)
        .effect(toggle_all)
        .effect(remove_completed)
    })
}

pub struct TodoItemsView;

impl View for TodoItemsView {
    type State = TodoItemsState;
    type Output = String;

    fn render(&self, state: &TodoItemsState, _events: &Dispatcher) -> String {
        let mut lines = vec![format!("filter: {:?}", state.filter_type)];
        lines.extend(state.list_items.iter().map(|item| {
            let mark = if item.completed { 'x' } else { ' ' };
            format!("  [{mark}] {} ({})", item.text, item.id)
        }));
        lines.join("\n")
    }
}
