use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSyncConfig {
    /// Compute and report without writing any tasks.
    #[serde(default)]
    pub dry_run: bool,
    /// How long a sync waits for another in-flight sync of the same student
    /// before giving up.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for TaskSyncConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            lock_timeout_ms: default_lock_timeout_ms()
        }
    }
}

impl TaskSyncConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
