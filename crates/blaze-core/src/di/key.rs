//! Key - 登録対象の契約を表す識別トークン
//!
//! # ULID ベースの identity
//! `Key<T>` は生成のたびに新しい ULID を割り当てます。
//! 等価性・ハッシュは ULID のみで決まり、label は診断用のラベルにすぎません。
//! 同じ label で 2 回 `key()` を呼ぶと、異なる（等しくない）Key になります。
//!
//! ## Phantom Type パターン
//! `T` は PhantomData で、実行時にはメモリを消費しませんが、
//! `Key<Rc<dyn TodoStateService>>` と `Key<Controller<..>>` を混同できないことを
//! コンパイル時に保証します。
//!
//! # 使用例
//! ```ignore
//! // モジュールレベルの定数として一度だけ作る
//! pub static TODO_STATE_KEY: LazyLock<Key<Rc<dyn TodoStateService>>> =
//!     LazyLock::new(|| key("TodoStateService"));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use ulid::Ulid;

/// 契約 `T` に解決される不透明なトークン
///
/// `PhantomData<fn() -> T>` なので `T` が `Send` / `Sync` でなくても
/// `static` に置けます。
pub struct Key<T> {
    id: Ulid,
    label: &'static str,
    _marker: PhantomData<fn() -> T>,
}

/// 新しい Key を作成（`label` は診断用のみ）
pub fn key<T>(label: &'static str) -> Key<T> {
    Key::new(label)
}

impl<T> Key<T> {
    /// 新しい Key を作成
    pub fn new(label: &'static str) -> Self {
        Self {
            id: Ulid::new(),
            label,
            _marker: PhantomData,
        }
    }

    /// label なしの Key を作成
    pub fn anonymous() -> Self {
        Self::new("")
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// 型情報を落とした診断用の表現
    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            id: self.id,
            label: self.label,
        }
    }
}

// derive だと `T: Clone` などの不要な境界が付くため手で実装する

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("label", &self.label)
            .field("id", &self.id)
            .finish()
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.info().fmt(f)
    }
}

/// KeyInfo は型を消した Key（エラー・ログ用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyInfo {
    pub id: Ulid,
    pub label: &'static str,
}

impl fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "\"key-{}\"", self.id)
        } else {
            write!(f, "\"{}\"", self.label)
        }
    }
}
