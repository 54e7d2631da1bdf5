//! blaze-cli - composition root binary
//!
//! カウンタと todo 画面をテキストで描画するデモです。
//! ログは `RUST_LOG` で調整できます（例: `RUST_LOG=blaze_core=debug`）。

mod composition_root;
mod counter;
mod todo;

use std::error::Error;

use blaze_core::connector::{Callback, connect};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::counter::{COUNTER_CONTROLLER_KEY, CounterView};
use crate::todo::{
    FilterType, TODO_INPUT_CONTROLLER_KEY, TODO_ITEMS_CONTROLLER_KEY, TodoInputProps, TodoInputView, TodoItemsView,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "blaze_core=info,blaze_cli=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting blaze demo");

    let root = composition_root::create_container()?;
    let screen = root.create_scope("todo-screen");

    // 1) カウンタ
    let mut counter = connect(CounterView, *COUNTER_CONTROLLER_KEY)
        .debug_log(true)
        .instantiate(&screen, ())?;
    counter.mount(|frame: String| println!("counter | {frame}"));
    let events = counter.dispatcher().clone();
    events.dispatch("on_increment_click", ());
    events.dispatch("on_increment_click", ());
    events.dispatch("on_decrement_click", ());
    counter.unmount();

    // 2) todo の入力と一覧（状態サービスは root の singleton を共有）
    let props = TodoInputProps {
        on_added: Some(Callback::new(|name: String| info!(todo = %name, "todo added"))),
    };
    let mut input = connect(TodoInputView, *TODO_INPUT_CONTROLLER_KEY).instantiate(&screen, props)?;
    let mut items = connect(TodoItemsView, *TODO_ITEMS_CONTROLLER_KEY).instantiate(&screen, ())?;
    input.mount(|frame: String| println!("input   | {frame}"));
    items.mount(|frame: String| println!("items   | {}", frame.replace('\n', "\n        | ")));

    for text in ["write docs", "ship release", "   "] {
        input.dispatcher().dispatch("on_change", text.to_string());
        input.dispatcher().dispatch("on_add_button_click", ());
    }

    if let Some(first) = items.state().list_items.first() {
        items.dispatcher().dispatch("on_item_toggle", first.id.clone());
    }
    items.dispatcher().dispatch("on_filter_changed", FilterType::Active);

    println!("{}", serde_json::to_string_pretty(&items.state())?);

    input.unmount();
    items.unmount();

    screen.dispose().await;
    root.dispose().await;
    info!("Finished blaze demo");
    Ok(())
}
