//! Delayed auto-call scheduling.
//!
//! One pending task per session; scheduling again replaces the pending
//! task and cancellation is idempotent.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::game::entities::SessionId;

/// Tracks one abortable delayed task per session.
#[derive(Clone, Default)]
pub struct CallScheduler {
    tasks: Arc<Mutex<HashMap<SessionId, JoinHandle<()>>>>,
}

impl CallScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, replacing any pending task for the session.
    pub fn schedule<F>(&self, session_id: SessionId, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let tasks = Arc::clone(&self.tasks);
        let handle = tokio::spawn({
            let tasks = Arc::clone(&tasks);
            async move {
                time::sleep(delay).await;
                task.await;
                if let Ok(mut tasks) = tasks.lock() {
                    tasks.remove(&session_id);
                }
            }
        });

        let mut tasks = tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = tasks.insert(session_id, handle) {
            previous.abort();
        }
    }

    /// Abort the pending task for the session, if any. Safe to call when
    /// nothing is scheduled or the task already fired.
    pub fn cancel(&self, session_id: SessionId) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = tasks.remove(&session_id) {
            handle.abort();
        }
    }

    /// Whether the session has a pending (not yet fired) task.
    #[must_use]
    pub fn is_scheduled(&self, session_id: SessionId) -> bool {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.contains_key(&session_id)
    }
}
