//! Clock port - 時刻の抽象化

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Clock は現在時刻を提供
///
/// # テスト容易性
/// - trait により時刻を差し替え可能
/// - テストでは FixedClock を使用
pub trait Clock {
    fn now(&self) -> Instant;
}

/// 本番用
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// テスト用。`advance` / `set` で進めるまで止まっている
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<Instant>,
}

impl FixedClock {
    pub fn new(now: Instant) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, now: Instant) {
        self.now.set(now);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}
