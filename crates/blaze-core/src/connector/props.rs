//! Props - View に渡る props とコールバック
//!
//! props はデータ部分とコールバック部分からなります。
//! connector が外部イベントを転送するときは、現在の props から
//! 同名のコールバックを `Props::callback()` で探します。

use std::any::{Any, type_name};
use std::fmt;
use std::ptr;
use std::rc::Rc;

/// Callback は props に載せる型付きコールバック
///
/// 等価性は中身の関数ではなく参照の同一性で決まります
/// （props の浅い比較で同じ Callback なら「変化なし」とみなす）。
pub struct Callback<A> {
    f: Rc<dyn Fn(A)>,
}

impl<A: 'static> Callback<A> {
    pub fn new(f: impl Fn(A) + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    pub fn call(&self, payload: A) {
        (self.f)(payload)
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<A> PartialEq for Callback<A> {
    fn eq(&self, other: &Self) -> bool {
        ptr::addr_eq(Rc::as_ptr(&self.f), Rc::as_ptr(&other.f))
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback<{}>", type_name::<A>())
    }
}

/// AnyCallback は payload 型を消した Callback
#[derive(Clone)]
pub struct AnyCallback {
    inner: Rc<dyn Any>,
    payload: &'static str,
}

impl AnyCallback {
    pub fn of<A: 'static>(callback: &Callback<A>) -> Self {
        Self {
            inner: Rc::new(callback.clone()),
            payload: type_name::<A>(),
        }
    }

    /// payload 型が `A` なら型付きの Callback に戻す
    pub fn downcast<A: 'static>(&self) -> Option<Callback<A>> {
        self.inner.downcast_ref::<Callback<A>>().cloned()
    }

    pub fn payload_type(&self) -> &'static str {
        self.payload
    }
}

impl fmt::Debug for AnyCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyCallback<{}>", self.payload)
    }
}

/// props から名前でコールバックを探した結果
#[derive(Debug, Clone)]
pub enum PropLookup {
    /// その名前の prop がない（または None）
    Missing,
    /// その名前の prop はあるがコールバックではない
    NotCallable,
    Callable(AnyCallback),
}

impl<A: 'static> From<&Callback<A>> for PropLookup {
    fn from(callback: &Callback<A>) -> Self {
        PropLookup::Callable(AnyCallback::of(callback))
    }
}

impl<A: 'static> From<&Option<Callback<A>>> for PropLookup {
    fn from(callback: &Option<Callback<A>>) -> Self {
        match callback {
            Some(callback) => callback.into(),
            None => PropLookup::Missing,
        }
    }
}

/// Props はコンポーネントの入力 props
///
/// 外部イベントを受けるコンポーネントは `callback()` を実装して、
/// イベント名に対応するコールバックを返します。
///
/// # 使用例
/// ```ignore
/// #[derive(Clone, PartialEq)]
/// struct TodoInputProps {
///     placeholder: String,
///     on_added: Option<Callback<String>>,
/// }
///
/// impl Props for TodoInputProps {
///     fn callback(&self, name: &str) -> PropLookup {
///         match name {
///             "on_added" => (&self.on_added).into(),
///             "placeholder" => PropLookup::NotCallable,
///             _ => PropLookup::Missing,
///         }
///     }
/// }
/// ```
pub trait Props: Clone + PartialEq + 'static {
    fn callback(&self, _name: &str) -> PropLookup {
        PropLookup::Missing
    }
}

impl Props for () {}
