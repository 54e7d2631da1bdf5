//! Rx - rxrust の上に置いた同期 push 型のリアクティブ層
//!
//! ストリームの実体は rxrust です。このモジュールはエラー型を `StreamError` に固定し、
//! `&self` で扱える `Observable` / `Subject` と tick キューを足しています。
//!
//! # 構成
//! - **observable**: `Observable<T>`（rxrust の box 化ストリームを包む cold なストリーム）
//! - **subject**: hot な multicast（`Subject` / `BehaviorSubject`）
//! - **operators**: controller が使うオペレータ群と `merge` / `combine_latest`
//! - **subscription**: teardown をまとめる `Subscription`
//! - **scheduler**: 「次の tick」を表すスレッドローカルなタスクキュー
//! - **error**: ストリームを流れるエラー `StreamError`
//!
//! # 実行モデル
//! すべてシングルスレッド・同期です。`next()` は購読者のコールバックを
//! その場で呼び出し、戻った時点で下流の処理は終わっています。
//! 例外は `delay_to_next_tick()` で、これは `scheduler::flush()` まで配送を遅らせます。

pub mod error;
pub mod subscription;
pub mod observable;
pub mod subject;
pub mod operators;
pub mod scheduler;

pub use self::error::StreamError;
pub use self::observable::{Notification, Observable};
pub use self::operators::{combine_latest, combine_latest2, merge};
pub use self::subject::{BehaviorSubject, Completable, Subject};
pub use self::subscription::Subscription;
