//! Lifetime - インスタンス共有ポリシー

use std::fmt;

/// Lifetime はインスタンスのキャッシュと共有の方法を決める
///
/// - **Transient**: 解決のたびに新しいインスタンス。キャッシュせず、破棄もしない（呼び出し側の所有）
/// - **Scoped**: スコープ（Container）ごとに 1 つ。そのスコープの破棄時に破棄される
/// - **Singleton**: スコープツリー全体で 1 つ。root にだけキャッシュされ、root の破棄時に破棄される
///
/// `register()` の既定値は Scoped です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    Transient,
    #[default]
    Scoped,
    Singleton,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
            Lifetime::Singleton => "singleton",
        };
        f.write_str(name)
    }
}
