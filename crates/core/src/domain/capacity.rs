// Capacity Domain Model

use crate::error::{QueueError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Maximum number of entries (pending + executing) a queue may hold
///
/// Always at least 1: the executing slot itself counts against capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Capacity(NonZeroUsize);

impl Capacity {
    /// Strictest bound: a second call is rejected while one is running
    pub const ONE: Capacity = Capacity(NonZeroUsize::MIN);

    pub fn new(limit: usize) -> Result<Self> {
        NonZeroUsize::new(limit)
            .map(Self)
            .ok_or(QueueError::InvalidCapacity(limit))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for Capacity {
    type Error = QueueError;

    fn try_from(limit: usize) -> Result<Self> {
        Self::new(limit)
    }
}

impl From<Capacity> for usize {
    fn from(capacity: Capacity) -> Self {
        capacity.get()
    }
}

impl FromStr for Capacity {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self> {
        let limit: usize = s
            .trim()
            .parse()
            .map_err(|_| QueueError::Config(format!("capacity must be a positive integer, got '{}'", s)))?;
        Self::new(limit)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
