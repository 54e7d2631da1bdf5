//! ContainerBuilder - 登録の収集と凍結
//!
//! # Fail-fast 設計
//! - 同じ Key の二重登録は `register` の時点で `DuplicateRegistration`
//! - `build()` 後の `register` / 2 回目の `build()` は `BuilderAlreadyBuilt`
//!
//! # モジュール
//! モジュールは builder を受け取って `register` を何回か呼ぶだけの関数です。
//! 登録をまとめるための便宜で、それ以上の意味はありません。

use std::mem;
use std::rc::Rc;

use tracing::trace;

use super::container::Container;
use super::disposable::{AsyncDisposable, Disposable};
use super::errors::{RegistrationError, ResolveError};
use super::key::Key;
use super::lifetime::Lifetime;
use super::registry::{DynFactory, Registry, RegistryItem, TypedFactory};

/// モジュール関数の型
///
/// クロージャを渡したい場合は `register_module` がそのまま受け付けます。
pub type Module = fn(&mut ContainerBuilder) -> Result<(), RegistrationError>;

/// ContainerBuilder は登録を集めて root Container を作る
///
/// # 使用例
/// ```ignore
/// fn todo_module(builder: &mut ContainerBuilder) -> Result<(), RegistrationError> {
///     builder.register_with(&TODO_STATE_KEY, Lifetime::Singleton, |_| Ok(TodoStore::shared()))?;
///     builder.register_with(&TODO_INPUT_KEY, Lifetime::Transient, |c| {
///         Ok(todo_input_controller(c.resolve(&TODO_STATE_KEY)?))
///     })?;
///     Ok(())
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_module(todo_module)?;
/// let root = builder.build()?;
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    registry: Registry,
    built: bool,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scoped として登録
    pub fn register<T, F>(&mut self, key: &Key<T>, factory: F) -> Result<&mut Self, RegistrationError>
    where
        T: Clone + 'static,
        F: Fn(&Container) -> Result<T, ResolveError> + 'static,
    {
        self.register_with(key, Lifetime::Scoped, factory)
    }

    /// lifetime を指定して登録（破棄はしない）
    pub fn register_with<T, F>(
        &mut self,
        key: &Key<T>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        T: Clone + 'static,
        F: Fn(&Container) -> Result<T, ResolveError> + 'static,
    {
        self.insert(key, lifetime, Rc::new(TypedFactory::plain(factory)))
    }

    /// 同期的に破棄できるインスタンスとして登録
    ///
    /// キャッシュされた（Scoped / Singleton の）インスタンスは、
    /// 所属スコープの破棄時に `Disposable::dispose()` が呼ばれます。
    pub fn register_disposable<T, F>(
        &mut self,
        key: &Key<T>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        T: Disposable + Clone + 'static,
        F: Fn(&Container) -> Result<T, ResolveError> + 'static,
    {
        self.insert(key, lifetime, Rc::new(TypedFactory::sync_disposable(factory)))
    }

    /// 非同期に破棄できるインスタンスとして登録
    ///
    /// スコープの破棄は `dispose_async()` の完了を待ってから終わります。
    pub fn register_async_disposable<T, F>(
        &mut self,
        key: &Key<T>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        T: AsyncDisposable + Clone + 'static,
        F: Fn(&Container) -> Result<T, ResolveError> + 'static,
    {
        self.insert(key, lifetime, Rc::new(TypedFactory::async_disposable(factory)))
    }

    /// モジュールを適用
    pub fn register_module<M>(&mut self, module: M) -> Result<&mut Self, RegistrationError>
    where
        M: FnOnce(&mut ContainerBuilder) -> Result<(), RegistrationError>,
    {
        if self.built {
            return Err(RegistrationError::BuilderAlreadyBuilt);
        }
        module(&mut *self)?;
        Ok(self)
    }

    /// 登録を凍結して root Container を返す
    pub fn build(&mut self) -> Result<Container, RegistrationError> {
        if self.built {
            return Err(RegistrationError::BuilderAlreadyBuilt);
        }
        self.built = true;
        let registry = mem::take(&mut self.registry);
        trace!(registrations = registry.len(), "container built");
        Ok(Container::root(Rc::new(registry)))
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    fn insert<T>(
        &mut self,
        key: &Key<T>,
        lifetime: Lifetime,
        factory: Rc<dyn DynFactory>,
    ) -> Result<&mut Self, RegistrationError> {
        if self.built {
            return Err(RegistrationError::BuilderAlreadyBuilt);
        }
        self.registry.insert(RegistryItem {
            key: key.info(),
            lifetime,
            factory,
        })?;
        trace!(key = %key, %lifetime, "registered");
        Ok(self)
    }
}
