use rand::Rng;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Selector picks the connection the next request goes to.
pub trait Selector: Debug + Send + Sync + 'static {
    /// Return an index in `0..len`. `len` is never zero.
    fn select(&self, len: usize) -> usize;
}

/// Cycle through connections in order.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    next: AtomicUsize,
}

impl RoundRobinSelector {
    /// Create a selector starting at the first connection.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobinSelector {
    fn select(&self, len: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % len
    }
}

/// Pick a connection uniformly at random.
#[derive(Debug, Default)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn select(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}
