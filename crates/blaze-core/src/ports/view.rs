//! View port - 描画関数と出力の受け手
//!
//! View は props のスナップショット（データ部分）と Dispatcher（コールバック部分）から
//! 出力を作る純粋関数です。コールバックは常に connector が生成した Dispatcher から
//! 供給され、view state には含まれません。

use std::any::type_name;

use crate::connector::Dispatcher;

/// View はスナップショットを出力に変換する
///
/// # 使用例
/// ```ignore
/// struct CounterView;
///
/// impl View for CounterView {
///     type State = CounterState;
///     type Output = String;
///
///     fn render(&self, state: &CounterState, _events: &Dispatcher) -> String {
///         format!("count: {}", state.val)
///     }
/// }
/// ```
pub trait View: 'static {
    type State: Clone + 'static;
    type Output;

    /// 診断用の名前（既定は型名の最後のセグメント）
    fn name(&self) -> String {
        let full = type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    fn render(&self, state: &Self::State, events: &Dispatcher) -> Self::Output;
}

/// Renderer は View の出力を受け取って表示する側
pub trait Renderer<O> {
    fn render(&self, output: O);
}

impl<O, F> Renderer<O> for F
where
    F: Fn(O),
{
    fn render(&self, output: O) {
        self(output)
    }
}
