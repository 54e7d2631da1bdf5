//! Errors - 登録時・解決時のエラー
//!
//! # 分類
//! - **RegistrationError**: `register` / `build` の呼び出し元に同期的に返る（fail-fast）
//! - **ResolveError**: `resolve` の呼び出し元に同期的に返る（リトライしない）

use thiserror::Error;

use super::key::KeyInfo;

/// RegistrationError は ContainerBuilder の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Duplicate registration {0}")]
    DuplicateRegistration(KeyInfo),

    #[error("Container has been already built")]
    BuilderAlreadyBuilt,
}

/// ResolveError は Container の解決エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Cannot resolve object. There is no registry with key {0}")]
    UnregisteredKey(KeyInfo),

    /// Singleton の構築中に Scoped を解決しようとした（寿命の不整合）
    #[error("Cannot resolve object. Scoped object {0} cannot be resolved from Singleton")]
    ScopedFromSingleton(KeyInfo),
}
