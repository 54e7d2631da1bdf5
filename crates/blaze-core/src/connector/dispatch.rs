//! Dispatcher - View からのイベントを hub に流す
//!
//! View は props のコールバック部分をすべて Dispatcher から受け取ります。
//! 配送のたびに tick キューを flush するので、遅延されたリセットは
//! 同じイベントに反応した副作用がすべて終わった後に適用されます。

use std::fmt::Debug;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, error};

use super::Diagnostics;
use super::inputs::EventTable;
use super::props::Callback;
use crate::rx::scheduler;

/// DispatchError はイベント配送・コールバック転送のエラー
///
/// connector はこれを呼び出し元に返さず、ログに出して処理を飛ばします。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Event `{0}` was dispatched after the component was disposed")]
    Closed(String),

    #[error("Event `{name}` carries `{expected}`, but `{actual}` was used")]
    PayloadMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Prop `{0}` is not a callback")]
    NotCallable(String),

    #[error("No callback `{0}` in props")]
    MissingCallback(String),
}

/// Dispatcher は名前付きイベントの送り口
#[derive(Clone)]
pub struct Dispatcher {
    table: Rc<EventTable>,
    diagnostics: Diagnostics,
}

impl Dispatcher {
    pub(crate) fn new(table: Rc<EventTable>, diagnostics: Diagnostics) -> Self {
        Self { table, diagnostics }
    }

    /// イベントを配送し、tick キューを flush する
    pub fn try_dispatch<A: Clone + Debug + 'static>(
        &self,
        name: &str,
        payload: A,
    ) -> Result<(), DispatchError> {
        if self.table.is_completed() {
            return Err(DispatchError::Closed(name.to_string()));
        }
        let subject = self.table.lookup::<A>(name)?;
        if self.diagnostics.debug {
            debug!(component = %self.diagnostics.component, event = name, ?payload, "input event");
        }
        subject.next(payload);
        scheduler::flush();
        Ok(())
    }

    /// イベントを配送する。失敗はログに出して捨てる
    pub fn dispatch<A: Clone + Debug + 'static>(&self, name: &str, payload: A) {
        match self.try_dispatch(name, payload) {
            Ok(()) => {}
            Err(err @ DispatchError::Closed(_)) => {
                debug!(component = %self.diagnostics.component, "{err}");
            }
            Err(err) => {
                error!(component = %self.diagnostics.component, "{err}");
            }
        }
    }

    /// イベントに紐づく型付きコールバック
    pub fn callback<A: Clone + Debug + 'static>(&self, name: &str) -> Callback<A> {
        let dispatcher = self.clone();
        let name = name.to_string();
        Callback::new(move |payload| dispatcher.dispatch(&name, payload))
    }

    pub fn component(&self) -> &str {
        &self.diagnostics.component
    }
}

impl Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("component", &self.diagnostics.component)
            .finish()
    }
}
