//! Composition root - すべてのモジュールの登録
//!
//! Key はモジュールレベルの static として一度だけ作ります。

use std::rc::Rc;
use std::sync::LazyLock;

use blaze_core::di::{Container, ContainerBuilder, Key, Lifetime, RegistrationError, key};
use blaze_core::ports::{Clock, SystemClock};

use crate::counter::counter_module;
use crate::todo::{
    TODO_INPUT_CONTROLLER_KEY, TODO_ITEMS_CONTROLLER_KEY, TodoStateService, TodoStore, todo_input_controller,
    todo_items_controller,
};

pub static CLOCK_KEY: LazyLock<Key<Rc<dyn Clock>>> = LazyLock::new(|| key("Clock"));

pub static TODO_STATE_KEY: LazyLock<Key<Rc<dyn TodoStateService>>> = LazyLock::new(|| key("TodoStateService"));

pub fn main_module(builder: &mut ContainerBuilder) -> Result<(), RegistrationError> {
    builder.register_with(&*CLOCK_KEY, Lifetime::Singleton, |_| Ok(Rc::new(SystemClock) as Rc<dyn Clock>))?;
    builder.register_module(counter_module)?;
    Ok(())
}

pub fn todo_module(builder: &mut ContainerBuilder) -> Result<(), RegistrationError> {
    builder.register_async_disposable(&*TODO_STATE_KEY, Lifetime::Singleton, |_| Ok(TodoStore::shared()))?;
    builder.register_with(&*TODO_INPUT_CONTROLLER_KEY, Lifetime::Transient, |c| {
        Ok(todo_input_controller(c.resolve(&*TODO_STATE_KEY)?))
    })?;
    builder.register_with(&*TODO_ITEMS_CONTROLLER_KEY, Lifetime::Transient, |c| {
        Ok(todo_items_controller(c.resolve(&*TODO_STATE_KEY)?, c.resolve(&*CLOCK_KEY)?))
    })?;
    Ok(())
}

/// root コンテナを作る
///
/// # Errors
/// 同じ Key が二度登録されたとき。
pub fn create_container() -> Result<Container, RegistrationError> {
    let mut builder = ContainerBuilder::new();
    builder.register_module(main_module)?;
    builder.register_module(todo_module)?;
    builder.build()
}
