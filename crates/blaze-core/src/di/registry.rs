//! Registry - 型消去された登録情報
//!
//! # Type erasure
//! `register::<T>(key, factory)` の時点では `T` が分かっていますが、
//! コンテナは異なる `T` を 1 つの HashMap に格納する必要があります。
//! そこで `TypedFactory<T, F>` を object-safe な `DynFactory` に変換し、
//! 生成物は `Box<dyn Any>` として扱います。
//! 取り出し側（`Container::resolve`）は `Key<T>` を持っているので
//! downcast で型を復元できます。

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;

use ulid::Ulid;

use super::container::Container;
use super::disposable::{AsyncDisposable, Disposable, DisposalKind, Teardown};
use super::errors::{RegistrationError, ResolveError};
use super::key::KeyInfo;
use super::lifetime::Lifetime;

/// DynFactory は object-safe な factory の抽象化
pub(crate) trait DynFactory {
    fn create(&self, container: &Container) -> Result<Box<dyn Any>, ResolveError>;

    /// キャッシュ済みインスタンスの破棄処理を取り出す
    fn teardown(&self, instance: &dyn Any) -> Teardown;

    fn disposal(&self) -> DisposalKind;
}

pub(crate) struct TypedFactory<T, F> {
    factory: F,
    disposal: DisposalKind,
    capture: fn(&T) -> Teardown,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> TypedFactory<T, F>
where
    T: Clone + 'static,
    F: Fn(&Container) -> Result<T, ResolveError> + 'static,
{
    pub(crate) fn plain(factory: F) -> Self {
        Self {
            factory,
            disposal: DisposalKind::NotDisposable,
            capture: |_| Teardown::NotDisposable,
            _marker: PhantomData,
        }
    }
}

impl<T, F> TypedFactory<T, F>
where
    T: Disposable + Clone + 'static,
    F: Fn(&Container) -> Result<T, ResolveError> + 'static,
{
    pub(crate) fn sync_disposable(factory: F) -> Self {
        Self {
            factory,
            disposal: DisposalKind::SyncDisposable,
            capture: capture_sync::<T>,
            _marker: PhantomData,
        }
    }
}

impl<T, F> TypedFactory<T, F>
where
    T: AsyncDisposable + Clone + 'static,
    F: Fn(&Container) -> Result<T, ResolveError> + 'static,
{
    pub(crate) fn async_disposable(factory: F) -> Self {
        Self {
            factory,
            disposal: DisposalKind::AsyncDisposable,
            capture: capture_async::<T>,
            _marker: PhantomData,
        }
    }
}

fn capture_sync<T: Disposable + Clone + 'static>(instance: &T) -> Teardown {
    Teardown::Sync(Rc::new(instance.clone()))
}

fn capture_async<T: AsyncDisposable + Clone + 'static>(instance: &T) -> Teardown {
    Teardown::Async(Rc::new(instance.clone()))
}

impl<T, F> DynFactory for TypedFactory<T, F>
where
    T: Clone + 'static,
    F: Fn(&Container) -> Result<T, ResolveError> + 'static,
{
    fn create(&self, container: &Container) -> Result<Box<dyn Any>, ResolveError> {
        let instance = (self.factory)(container)?;
        Ok(Box::new(instance))
    }

    fn teardown(&self, instance: &dyn Any) -> Teardown {
        match instance.downcast_ref::<T>() {
            Some(instance) => (self.capture)(instance),
            None => Teardown::NotDisposable,
        }
    }

    fn disposal(&self) -> DisposalKind {
        self.disposal
    }
}

/// RegistryItem は 1 つの Key に対する factory と lifetime の組
pub(crate) struct RegistryItem {
    pub(crate) key: KeyInfo,
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: Rc<dyn DynFactory>,
}

/// Registry は Key（ULID）→ RegistryItem の対応表
///
/// `build()` 後は `Rc<Registry>` としてスコープツリー全体で共有され、
/// 以後は変更されません。
#[derive(Default)]
pub struct Registry {
    items: HashMap<Ulid, RegistryItem>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, item: RegistryItem) -> Result<(), RegistrationError> {
        if self.items.contains_key(&item.key.id) {
            return Err(RegistrationError::DuplicateRegistration(item.key));
        }
        self.items.insert(item.key.id, item);
        Ok(())
    }

    pub(crate) fn get(&self, id: Ulid) -> Option<&RegistryItem> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: Ulid) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 登録済み Key の診断情報
    pub fn registered_keys(&self) -> Vec<KeyInfo> {
        self.items.values().map(|item| item.key).collect()
    }

    /// 登録済み Key の lifetime
    pub fn lifetime_of(&self, id: Ulid) -> Option<Lifetime> {
        self.items.get(&id).map(|item| item.lifetime)
    }

    /// 登録時に宣言された破棄の種類
    pub fn disposal_of(&self, id: Ulid) -> Option<DisposalKind> {
        self.items.get(&id).map(|item| item.factory.disposal())
    }
}
