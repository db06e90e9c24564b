//! Registry of flushed tasks awaiting a commit.

use std::collections::HashMap;

use tokio::sync::oneshot;

use super::task::TaskToken;

/// Continuations of flushed tasks, keyed by token
///
/// Each entry is owned by the registry until it is taken exactly once.
pub(crate) struct PendingRegistry<R> {
    tasks: HashMap<TaskToken, oneshot::Sender<R>>,
}

impl<R> PendingRegistry<R> {
    pub(crate) fn new() -> Self {
        Self { tasks: HashMap::new() }
    }

    pub(crate) fn insert(&mut self, token: TaskToken, continuation: oneshot::Sender<R>) {
        let previous = self.tasks.insert(token, continuation);
        debug_assert!(previous.is_none(), "token {token} registered twice");
    }

    /// Remove a task; a second take of the same token returns `None`
    pub(crate) fn take(&mut self, token: TaskToken) -> Option<oneshot::Sender<R>> {
        self.tasks.remove(&token)
    }

    pub(crate) fn contains(&self, token: TaskToken) -> bool {
        self.tasks.contains_key(&token)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}
