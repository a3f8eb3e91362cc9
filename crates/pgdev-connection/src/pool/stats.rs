//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Point-in-time view of a pool's connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Idle plus borrowed connections
    total: usize,
    idle: usize,
    /// Connections currently borrowed
    active: usize,
    /// Callers blocked in `get`
    waiting: usize,
    closed: bool,
}

impl PoolStats {
    pub fn new(idle: usize, active: usize, waiting: usize, closed: bool) -> Self {
        Self {
            total: idle + active,
            idle,
            active,
            waiting,
            closed,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn waiting(&self) -> usize {
        self.waiting
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Check if the pool is fully utilized (all connections in use)
    pub fn is_full(&self) -> bool {
        self.idle == 0 && self.total > 0
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new(0, 0, 0, false)
    }
}
