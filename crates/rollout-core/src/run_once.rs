//! Records which run-once actions already executed for a target environment.
//!
//! Entries live in the shared cache under `actionId + environmentIdentity`
//! with value `true`. Nothing expires them; `rollout cache clear` does.
//! The key is a plain concatenation with no separator, so `ab` on `c` and
//! `a` on `bc` share one entry. The format is kept for compatibility with
//! existing cache files.
//! Marking happens after execution, so a crash in between means the action
//! runs again next time (at-least-once).

use serde_json::Value;

use crate::cache::KvCache;
use crate::error::Result;

pub struct RunOnceStore<'a> {
    cache: &'a mut dyn KvCache,
}

impl<'a> RunOnceStore<'a> {
    pub fn new(cache: &'a mut dyn KvCache) -> Self {
        Self { cache }
    }

    pub fn key(action_id: &str, environment: &str) -> String {
        format!("{action_id}{environment}")
    }

    pub fn has_run(&self, action_id: &str, environment: &str) -> Result<bool> {
        let value = self
            .cache
            .get_or(&Self::key(action_id, environment), Value::Bool(false))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub fn mark_run(&mut self, action_id: &str, environment: &str) -> Result<()> {
        self.cache
            .set(&Self::key(action_id, environment), Value::Bool(true))
    }
}
