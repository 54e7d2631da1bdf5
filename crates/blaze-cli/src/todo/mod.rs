//! Todo - TodoMVC 風の画面
//!
//! - **state**: `TodoStateService` とインメモリ実装 `TodoStore`
//! - **input**: 新規入力欄（追加後に次の tick で空に戻す）
//! - **items**: 一覧・フィルタ・一括操作

pub mod input;
pub mod items;
pub mod state;

pub use self::input::{TODO_INPUT_CONTROLLER_KEY, TodoInputProps, TodoInputView, todo_input_controller};
pub use self::items::{FilterType, TODO_ITEMS_CONTROLLER_KEY, TodoItemsView, todo_items_controller};
pub use self::state::{TodoStateService, TodoStore};

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use async_trait::async_trait;
    use blaze_core::di::AsyncDisposable;
    use blaze_core::rx::{BehaviorSubject, Observable};

    use super::state::{TodoItem, TodoStateService};

    /// 呼び出しを記録するだけの TodoStateService
    pub(crate) struct FakeTodoService {
        items: BehaviorSubject<Vec<TodoItem>>,
        calls: RefCell<Vec<String>>,
        deliveries: Rc<Cell<usize>>,
    }

    impl Default for FakeTodoService {
        fn default() -> Self {
            Self::with_items(&[])
        }
    }

    impl FakeTodoService {
        pub(crate) fn with_items(items: &[(&str, bool)]) -> Self {
            let items = items
                .iter()
                .map(|(id, completed)| TodoItem {
                    id: id.to_string(),
                    value: format!("item {id}"),
                    completed: *completed,
                })
                .collect();
            Self {
                items: BehaviorSubject::new(items),
                calls: RefCell::new(Vec::new()),
                deliveries: Rc::new(Cell::new(0)),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        /// `items()` が購読者に届けたリストの数
        pub(crate) fn deliveries(&self) -> usize {
            self.deliveries.get()
        }

        /// add_todo に渡された本文
        pub(crate) fn added(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|call| call.strip_prefix("add ").map(str::to_string))
                .collect()
        }

        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }
    }

    #[async_trait(?Send)]
    impl AsyncDisposable for FakeTodoService {
        async fn dispose_async(&self) {
            self.items.complete();
        }
    }

    impl TodoStateService for FakeTodoService {
        fn add_todo(&self, value: &str) {
            self.record(format!("add {value}"));
        }

        fn toggle_all(&self, completed: bool) {
            self.record(format!("toggle_all {completed}"));
        }

        fn toggle(&self, id: &str) {
            self.record(format!("toggle {id}"));
        }

        fn remove(&self, id: &str) {
            self.record(format!("remove {id}"));
        }

        fn remove_completed(&self) {
            self.record("remove_completed".to_string());
        }

        fn items(&self) -> Observable<Vec<TodoItem>> {
            let deliveries = self.deliveries.clone();
            self.items
                .as_observable()
                .tap(move |_| deliveries.set(deliveries.get() + 1))
        }
    }
}
