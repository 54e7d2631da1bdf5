//! StreamError - ストリームを流れるエラー

use std::rc::Rc;

use thiserror::Error;

/// StreamError はストリームの error 通知が運ぶ値
///
/// 複数の購読者に配るので安価に clone できる必要があります。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StreamError {
    message: Rc<str>,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Rc::from(message.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for StreamError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for StreamError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
