//! Container - スコープツリーと解決ロジック
//!
//! # スコープ
//! root は `ContainerBuilder::build()` が作り、子スコープは `create_scope()` で作ります。
//! registry は `Rc` でツリー全体に共有され、キャッシュは各スコープが専有します。
//!
//! # Lifetime ごとの解決
//! - **Transient**: 毎回 factory を呼ぶ。キャッシュしない
//! - **Scoped**: 自スコープのキャッシュ → なければ factory(self) してキャッシュ
//! - **Singleton**: root に委譲し、root のキャッシュに 1 つだけ作る
//!
//! # Singleton 構築中ガード
//! root ごとの深さカウンタです（プロセス全体のグローバルではない）。
//! Singleton の factory 実行中は深さが 1 以上になり、その間の Scoped 解決は
//! `ScopedFromSingleton` で失敗します。Singleton の入れ子構築は許可され、
//! カウンタは最も外側の構築が終わったときに 0 に戻ります。
//!
//! 逆方向（Scoped の factory から Singleton を解決する）は許可しています。
//!
//! # 循環
//! 自分自身の factory から同じ Key を解決する循環は呼び出し側の誤りで、検出しません。

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::rc::Rc;

use async_trait::async_trait;
use tracing::{debug, error, trace};
use ulid::Ulid;

use super::disposable::{AsyncDisposable, DisposeState, Teardown};
use super::errors::ResolveError;
use super::key::{Key, KeyInfo};
use super::lifetime::Lifetime;
use super::registry::{Registry, RegistryItem};

const ROOT_SCOPE_NAME: &str = "root";

/// Container はスコープツリーの 1 ノード
///
/// `Clone` は同じスコープへのハンドルを増やすだけです。
#[derive(Clone)]
pub struct Container {
    inner: Rc<Scope>,
}

struct Scope {
    name: String,
    registry: Rc<Registry>,
    cache: RefCell<Cache>,
    parent: Option<Container>,
    /// 自分が root のときは None
    root: Option<Container>,
    singleton_depth: Cell<usize>,
    disposed: DisposeState,
}

#[derive(Default)]
struct Cache {
    values: HashMap<Ulid, Box<dyn Any>>,
    /// 作成順
    teardowns: Vec<(KeyInfo, Teardown)>,
}

/// Singleton 構築中であることを示す RAII ガード
struct SingletonGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> SingletonGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for SingletonGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

impl Container {
    pub(crate) fn root(registry: Rc<Registry>) -> Self {
        Self::with_parent(ROOT_SCOPE_NAME.to_string(), registry, None)
    }

    fn with_parent(name: String, registry: Rc<Registry>, parent: Option<Container>) -> Self {
        let root = parent.as_ref().map(|p| p.root_container());
        Self {
            inner: Rc::new(Scope {
                name,
                registry,
                cache: RefCell::new(Cache::default()),
                parent,
                root,
                singleton_depth: Cell::new(0),
                disposed: DisposeState::new(),
            }),
        }
    }

    /// 子スコープを作成（`name` は診断用）
    pub fn create_scope(&self, name: impl Into<String>) -> Container {
        let name = name.into();
        trace!(parent = %self.inner.name, scope = %name, "scope created");
        Self::with_parent(name, self.inner.registry.clone(), Some(self.clone()))
    }

    /// Key を解決
    ///
    /// # Errors
    /// - `UnregisteredKey`: 登録がない
    /// - `ScopedFromSingleton`: Singleton の構築中に Scoped を解決しようとした
    /// - factory が返したエラーはそのまま伝播
    pub fn resolve<T: Clone + 'static>(&self, key: &Key<T>) -> Result<T, ResolveError> {
        let Some(item) = self.inner.registry.get(key.id()) else {
            let err = ResolveError::UnregisteredKey(key.info());
            error!(scope = %self.inner.name, key = %key, "{err}");
            return Err(err);
        };

        match item.lifetime {
            Lifetime::Transient => {
                trace!(scope = %self.inner.name, key = %key, "creating transient");
                let instance = item.factory.create(self)?;
                Ok(downcast::<T>(instance.as_ref(), key))
            }
            Lifetime::Scoped => self.cached_instance(key, item),
            Lifetime::Singleton => self.root_container().cached_instance(key, item),
        }
    }

    fn cached_instance<T: Clone + 'static>(
        &self,
        key: &Key<T>,
        item: &RegistryItem,
    ) -> Result<T, ResolveError> {
        if item.lifetime == Lifetime::Scoped && self.is_constructing_singleton() {
            let err = ResolveError::ScopedFromSingleton(key.info());
            error!(scope = %self.inner.name, key = %key, "{err}");
            return Err(err);
        }

        let cached = self
            .inner
            .cache
            .borrow()
            .values
            .get(&key.id())
            .map(|instance| downcast::<T>(instance.as_ref(), key));
        if let Some(instance) = cached {
            return Ok(instance);
        }

        debug!(scope = %self.inner.name, key = %key, lifetime = %item.lifetime, "creating instance");
        let created = {
            let _guard = (item.lifetime == Lifetime::Singleton)
                .then(|| SingletonGuard::enter(&self.inner.singleton_depth));
            item.factory.create(self)?
        };

        let instance = downcast::<T>(created.as_ref(), key);
        let teardown = item.factory.teardown(created.as_ref());
        let mut cache = self.inner.cache.borrow_mut();
        cache.values.insert(key.id(), created);
        cache.teardowns.push((item.key, teardown));
        Ok(instance)
    }

    fn is_constructing_singleton(&self) -> bool {
        match &self.inner.root {
            Some(root) => root.inner.singleton_depth.get() > 0,
            None => self.inner.singleton_depth.get() > 0,
        }
    }

    fn root_container(&self) -> Container {
        match &self.inner.root {
            Some(root) => root.clone(),
            None => self.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// 同じ registry を共有しているか
    pub fn shares_registry_with(&self, other: &Container) -> bool {
        Rc::ptr_eq(&self.inner.registry, &other.inner.registry)
    }

    /// このスコープにキャッシュされているインスタンス数
    pub fn cached_len(&self) -> usize {
        self.inner.cache.borrow().values.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.is_disposed()
    }

    /// このスコープを破棄
    ///
    /// キャッシュ済みインスタンスの破棄処理を作成と逆順に実行し、
    /// 非同期のものは完了を待ちます。親・子スコープには波及しません。
    /// 2 回目以降の呼び出しは何もしません。
    pub async fn dispose(&self) {
        if !self.inner.disposed.begin() {
            return;
        }
        let cache = mem::take(&mut *self.inner.cache.borrow_mut());
        debug!(scope = %self.inner.name, instances = cache.values.len(), "disposing scope");

        for (key, teardown) in cache.teardowns.iter().rev() {
            trace!(scope = %self.inner.name, %key, kind = ?teardown.kind(), "disposing instance");
            teardown.run().await;
        }
        drop(cache);
    }
}

#[async_trait(?Send)]
impl AsyncDisposable for Container {
    async fn dispose_async(&self) {
        self.dispose().await;
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.inner.name)
            .field("root", &self.is_root())
            .field("cached", &self.cached_len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn downcast<T: Clone + 'static>(instance: &dyn Any, key: &Key<T>) -> T {
    match instance.downcast_ref::<T>() {
        Some(instance) => instance.clone(),
        // Key<T> と TypedFactory<T, _> は同じ T でしか結び付かない
        None => unreachable!("registry entry for {key} holds a value of another type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::builder::ContainerBuilder;
    use crate::di::disposable::{BaseDisposable, Disposable, OnDispose};
    use crate::di::errors::RegistrationError;
    use crate::di::key::key;
    use rstest::rstest;

    struct Service {
        id: u32,
    }

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    fn service_factory(
        created: &Rc<Cell<u32>>,
    ) -> impl Fn(&Container) -> Result<Rc<Service>, ResolveError> + 'static {
        let created = created.clone();
        move |_| {
            created.set(created.get() + 1);
            Ok(Rc::new(Service { id: created.get() }))
        }
    }

    fn build_with(lifetime: Lifetime, created: &Rc<Cell<u32>>) -> (Container, Key<Rc<Service>>) {
        let k: Key<Rc<Service>> = key("Service");
        let mut builder = ContainerBuilder::new();
        builder.register_with(&k, lifetime, service_factory(created)).unwrap();
        (builder.build().unwrap(), k)
    }

    #[test]
    fn unregistered_key_fails() {
        let root = ContainerBuilder::new().build().unwrap();
        let k: Key<u32> = key("Missing");

        assert_eq!(root.resolve(&k), Err(ResolveError::UnregisteredKey(k.info())));
        assert_eq!(
            root.resolve(&k).unwrap_err().to_string(),
            "Cannot resolve object. There is no registry with key \"Missing\""
        );
    }

    #[test]
    fn scoped_is_shared_within_scope_only() {
        let created = counter();
        let (root, k) = build_with(Lifetime::Scoped, &created);
        let left = root.create_scope("left");
        let right = root.create_scope("right");

        let a = left.resolve(&k).unwrap();
        let b = left.resolve(&k).unwrap();
        let c = right.resolve(&k).unwrap();

        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(created.get(), 2);
        assert_eq!(root.cached_len(), 0);
    }

    #[test]
    fn singleton_is_cached_once_in_root() {
        let created = counter();
        let (root, k) = build_with(Lifetime::Singleton, &created);
        let child = root.create_scope("child");
        let grandchild = child.create_scope("grandchild");

        let a = grandchild.resolve(&k).unwrap();
        let b = child.resolve(&k).unwrap();
        let c = root.resolve(&k).unwrap();

        assert!(Rc::ptr_eq(&a, &b));
        assert!(Rc::ptr_eq(&a, &c));
        assert_eq!(created.get(), 1);
        assert_eq!(root.cached_len(), 1);
        assert_eq!(child.cached_len(), 0);
        assert_eq!(grandchild.cached_len(), 0);
    }

    #[rstest]
    #[case::once(1)]
    #[case::few(3)]
    #[case::many(10)]
    fn transient_yields_distinct_instances(#[case] n: usize) {
        let created = counter();
        let (root, k) = build_with(Lifetime::Transient, &created);
        let scope = root.create_scope("scope");

        let instances: Vec<_> = (0..n).map(|_| scope.resolve(&k).unwrap()).collect();

        for (i, a) in instances.iter().enumerate() {
            for b in &instances[i + 1..] {
                assert!(!Rc::ptr_eq(a, b));
                assert_ne!(a.id, b.id);
            }
        }
        assert_eq!(created.get(), n as u32);
        assert_eq!(scope.cached_len(), 0);
    }

    #[rstest]
    #[case::from_root(false)]
    #[case::from_child(true)]
    fn scoped_from_singleton_fails(#[case] via_child: bool) {
        let scoped: Key<u32> = key("Scoped");
        let singleton: Key<u32> = key("Singleton");
        let mut builder = ContainerBuilder::new();
        builder
            .register(&scoped, |_| Ok(1))
            .unwrap()
            .register_with(&singleton, Lifetime::Singleton, move |c| Ok(c.resolve(&scoped)? + 1))
            .unwrap();
        let root = builder.build().unwrap();
        let requester = if via_child { root.create_scope("child") } else { root.clone() };

        assert_eq!(
            requester.resolve(&singleton),
            Err(ResolveError::ScopedFromSingleton(scoped.info()))
        );
        assert_eq!(root.cached_len(), 0);
    }

    #[test]
    fn guard_resets_after_failure() {
        let scoped: Key<u32> = key("Scoped");
        let singleton: Key<u32> = key("Singleton");
        let mut builder = ContainerBuilder::new();
        builder
            .register(&scoped, |_| Ok(7))
            .unwrap()
            .register_with(&singleton, Lifetime::Singleton, move |c| c.resolve(&scoped))
            .unwrap();
        let root = builder.build().unwrap();

        assert!(root.resolve(&singleton).is_err());
        assert_eq!(root.create_scope("after").resolve(&scoped), Ok(7));
    }

    #[test]
    fn nested_singletons_are_allowed() {
        let inner: Key<u32> = key("Inner");
        let outer: Key<u32> = key("Outer");
        let scoped: Key<u32> = key("Scoped");
        let mut builder = ContainerBuilder::new();
        builder
            .register_with(&inner, Lifetime::Singleton, |_| Ok(1))
            .unwrap()
            .register_with(&outer, Lifetime::Singleton, move |c| {
                let value = c.resolve(&inner)?;
                // 内側の構築が終わってもまだ外側の構築中
                c.resolve(&scoped).map(|s| s + value)
            })
            .unwrap()
            .register(&scoped, |_| Ok(10))
            .unwrap();
        let root = builder.build().unwrap();

        assert_eq!(
            root.resolve(&outer),
            Err(ResolveError::ScopedFromSingleton(scoped.info()))
        );
        assert_eq!(root.resolve(&inner), Ok(1));
    }

    #[test]
    fn singleton_from_scoped_factory_is_allowed() {
        let singleton: Key<u32> = key("Singleton");
        let scoped: Key<u32> = key("Scoped");
        let mut builder = ContainerBuilder::new();
        builder
            .register_with(&singleton, Lifetime::Singleton, |_| Ok(5))
            .unwrap()
            .register(&scoped, move |c| Ok(c.resolve(&singleton)? * 2))
            .unwrap();
        let root = builder.build().unwrap();
        let scope = root.create_scope("screen");

        assert_eq!(scope.resolve(&scoped), Ok(10));
        assert_eq!(root.cached_len(), 1);
        assert_eq!(scope.cached_len(), 1);
    }

    #[test]
    fn independent_roots_do_not_share_guard() {
        let scoped: Key<u32> = key("Scoped");
        let mut other = ContainerBuilder::new();
        other.register(&scoped, |_| Ok(3)).unwrap();
        let other_root = other.build().unwrap();

        let singleton: Key<u32> = key("Singleton");
        let mut builder = ContainerBuilder::new();
        builder
            .register_with(&singleton, Lifetime::Singleton, move |_| other_root.resolve(&scoped))
            .unwrap();
        let root = builder.build().unwrap();

        assert_eq!(root.resolve(&singleton), Ok(3));
    }

    #[test]
    fn scopes_share_the_registry() {
        let root = ContainerBuilder::new().build().unwrap();
        let child = root.create_scope("child");
        let grandchild = child.create_scope("grandchild");

        assert!(grandchild.shares_registry_with(&root));
        assert!(root.is_root());
        assert!(!grandchild.is_root());
        assert_eq!(grandchild.parent().map(Container::name), Some("child"));
        assert_eq!(root.name(), "root");
    }

    struct Tracked {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Disposable for Tracked {
        fn dispose(&self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[async_trait(?Send)]
    impl OnDispose for Tracked {
        async fn on_dispose(&self) {
            tokio::task::yield_now().await;
            self.log.borrow_mut().push(self.name);
        }
    }

    #[tokio::test]
    async fn dispose_runs_each_teardown_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let first: Key<Rc<Tracked>> = key("First");
        let second: Key<Rc<BaseDisposable<Tracked>>> = key("Second");
        let plain: Key<u32> = key("Plain");
        let mut builder = ContainerBuilder::new();
        let l1 = log.clone();
        let l2 = log.clone();
        builder
            .register_disposable(&first, Lifetime::Scoped, move |_| {
                Ok(Rc::new(Tracked { name: "first", log: l1.clone() }))
            })
            .unwrap()
            .register_async_disposable(&second, Lifetime::Scoped, move |_| {
                Ok(Rc::new(BaseDisposable::new(Tracked { name: "second", log: l2.clone() })))
            })
            .unwrap()
            .register(&plain, |_| Ok(1))
            .unwrap();
        let root = builder.build().unwrap();
        let scope = root.create_scope("screen");
        scope.resolve(&first).unwrap();
        let second_instance = scope.resolve(&second).unwrap();
        scope.resolve(&plain).unwrap();

        scope.dispose().await;
        scope.dispose().await;

        assert_eq!(*log.borrow(), vec!["second", "first"]);
        assert!(scope.is_disposed());
        assert!(second_instance.is_disposed());
        assert_eq!(scope.cached_len(), 0);
    }

    #[tokio::test]
    async fn dispose_does_not_cascade() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let k: Key<Rc<Tracked>> = key("Tracked");
        let mut builder = ContainerBuilder::new();
        let l = log.clone();
        builder
            .register_disposable(&k, Lifetime::Scoped, move |c| {
                let name = if c.is_root() { "root" } else { "child" };
                Ok(Rc::new(Tracked { name, log: l.clone() }))
            })
            .unwrap();
        let root = builder.build().unwrap();
        let child = root.create_scope("child");
        root.resolve(&k).unwrap();
        child.resolve(&k).unwrap();

        child.dispose().await;
        assert_eq!(*log.borrow(), vec!["child"]);
        assert!(!root.is_disposed());

        root.dispose_async().await;
        assert_eq!(*log.borrow(), vec!["child", "root"]);
    }

    #[tokio::test]
    async fn transient_instances_are_not_disposed() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let k: Key<Rc<Tracked>> = key("Tracked");
        let mut builder = ContainerBuilder::new();
        let l = log.clone();
        builder
            .register_disposable(&k, Lifetime::Transient, move |_| {
                Ok(Rc::new(Tracked { name: "transient", log: l.clone() }))
            })
            .unwrap();
        let root = builder.build().unwrap();
        root.resolve(&k).unwrap();

        root.dispose().await;
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn fresh_builder_is_unaffected_by_disposed_root() -> Result<(), RegistrationError> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let k: Key<Rc<Tracked>> = key("Tracked");
        let module = |builder: &mut ContainerBuilder| -> Result<(), RegistrationError> {
            let l = log.clone();
            builder.register_disposable(&k, Lifetime::Singleton, move |_| {
                Ok(Rc::new(Tracked { name: "singleton", log: l.clone() }))
            })?;
            Ok(())
        };

        let mut first = ContainerBuilder::new();
        first.register_module(module)?;
        let first_root = first.build()?;
        let first_instance = first_root.create_scope("screen").resolve(&k).unwrap();
        first_root.dispose().await;
        assert_eq!(first_root.cached_len(), 0);
        assert_eq!(log.borrow().len(), 1);

        let mut second = ContainerBuilder::new();
        second.register_module(module)?;
        let second_root = second.build()?;
        let second_instance = second_root.resolve(&k).unwrap();

        assert!(!Rc::ptr_eq(&first_instance, &second_instance));
        assert!(!second_root.is_disposed());
        assert_eq!(second_root.cached_len(), 1);
        assert_eq!(log.borrow().len(), 1);
        Ok(())
    }
}
