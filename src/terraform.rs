//! The diff and state a walk reads and mutates, and the lock-carrying
//! handles they are shared through.

pub mod diff;
pub mod state;

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use diff::{AttrDiff, Diff, DiffChangeType, InstanceDiff, ModuleDiff};
pub use state::{InstanceState, ModuleState, ResourceState, State};

/// A shared value whose lock travels with the handle. Guards release the
/// lock when dropped, so every exit path out of a critical section unlocks.
#[derive(Debug, Default)]
pub struct Locked<T>(Arc<RwLock<T>>);

impl<T> Clone for Locked<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Locked<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().await
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Locked<T> {
    pub async fn snapshot(&self) -> T {
        self.0.read().await.clone()
    }
}

pub type SharedState = Locked<State>;
pub type SharedDiff = Locked<Diff>;
