//! TodoStateService - todo リストの状態
//!
//! 状態は `BehaviorSubject<Vec<TodoItem>>` が持ち、操作はすべて `Action` を
//! 純粋関数 `reduce` に通して次の状態を作ります。
//! 購読者がいない間の操作も失われません。

use std::rc::Rc;

use async_trait::async_trait;
use blaze_core::di::{AsyncDisposable, BaseDisposable, OnDispose};
use blaze_core::rx::{BehaviorSubject, Observable};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use tracing::debug;

const ID_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    pub id: String,
    pub value: String,
    pub completed: bool,
}

/// todo リストの操作と購読
///
/// # 使用例
/// ```ignore
/// let service: Rc<dyn TodoStateService> = TodoStore::shared();
/// service.add_todo("write docs");
/// service.items().subscribe(|items| println!("{} items", items.len()));
/// service.dispose_async().await;
/// ```
pub trait TodoStateService: AsyncDisposable {
    fn add_todo(&self, value: &str);
    fn toggle_all(&self, completed: bool);
    fn toggle(&self, id: &str);
    fn remove(&self, id: &str);
    fn remove_completed(&self);

    /// 現在のリストを即座に流し、以後は変化ごとに流す
    fn items(&self) -> Observable<Vec<TodoItem>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddTodo { id: String, value: String },
    ToggleAll { completed: bool },
    Toggle { id: String },
    Remove { id: String },
    RemoveCompleted,
}

pub fn reduce(items: &[TodoItem], action: Action) -> Vec<TodoItem> {
    match action {
        Action::AddTodo { id, value } => {
            let mut next = items.to_vec();
            next.push(TodoItem {
                id,
                value,
                completed: false,
            });
            next
        }
        Action::ToggleAll { completed } => items
            .iter()
            .map(|item| TodoItem {
                completed,
                ..item.clone()
            })
            .collect(),
        Action::Toggle { id } => items
            .iter()
            .map(|item| {
                if item.id == id {
                    TodoItem {
                        completed: !item.completed,
                        ..item.clone()
                    }
                } else {
                    item.clone()
                }
            })
            .collect(),
        Action::Remove { id } => items.iter().filter(|item| item.id != id).cloned().collect(),
        Action::RemoveCompleted => items.iter().filter(|item| !item.completed).cloned().collect(),
    }
}

fn new_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// TodoStore はインメモリの TodoStateService
pub struct TodoStore {
    state: BehaviorSubject<Vec<TodoItem>>,
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore {
    pub fn new() -> Self {
        Self {
            state: BehaviorSubject::new(Vec::new()),
        }
    }

    /// 破棄可能な共有インスタンス
    pub fn shared() -> Rc<dyn TodoStateService> {
        Rc::new(BaseDisposable::new(Self::new()))
    }

    fn apply(&self, action: Action) {
        if self.state.is_closed() {
            debug!(?action, "todo store is disposed, action ignored");
            return;
        }
        let next = reduce(&self.state.value(), action);
        self.state.next(next);
    }
}

#[async_trait(?Send)]
impl OnDispose for TodoStore {
    async fn on_dispose(&self) {
        debug!(items = self.state.value().len(), "todo store disposed");
        self.state.complete();
    }
}

impl TodoStateService for BaseDisposable<TodoStore> {
    fn add_todo(&self, value: &str) {
        self.apply(Action::AddTodo {
            id: new_id(),
            value: value.to_string(),
        });
    }

    fn toggle_all(&self, completed: bool) {
        self.apply(Action::ToggleAll { completed });
    }

    fn toggle(&self, id: &str) {
        self.apply(Action::Toggle { id: id.to_string() });
    }

    fn remove(&self, id: &str) {
        self.apply(Action::Remove { id: id.to_string() });
    }

    fn remove_completed(&self) {
        self.apply(Action::RemoveCompleted);
    }

    fn items(&self) -> Observable<Vec<TodoItem>> {
        self.state.as_observable()
    }
}
