//! Failure-handling behavior for tasks.
//!
//! A [`BehaviorPolicy`] can be attached to a single task or supplied once as
//! the engine-wide default. Each field is resolved on its own:
//! task override, then engine default, then the built-in default.

use serde::{Deserialize, Serialize};

/// Built-in default for [`BehaviorPolicy::do_not_break_on_error`].
pub const DEFAULT_DO_NOT_BREAK_ON_ERROR: bool = false;

/// Built-in default for [`BehaviorPolicy::skip_item_on_fail`].
pub const DEFAULT_SKIP_ITEM_ON_FAIL: bool = false;

/// Built-in default for [`BehaviorPolicy::max_retries`].
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Partial failure-handling policy.
///
/// `None` means "not set here"; the value falls through to the next layer.
/// An explicit `Some(false)` or `Some(0)` is an override like any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorPolicy {
    /// Treat an error raised by the task as a recoverable failure instead of
    /// aborting the job.
    pub do_not_break_on_error: Option<bool>,

    /// Skip the task and continue with the next one once retries are exhausted.
    pub skip_item_on_fail: Option<bool>,

    /// Retry attempts allowed after the initial attempt (0 = no retries).
    pub max_retries: Option<u32>,
}

/// Concrete behavior for one task after all layers are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBehavior {
    pub do_not_break_on_error: bool,
    pub skip_item_on_fail: bool,
    pub max_retries: u32,
}

/// Resolve a single field: task override, then engine default, then built-in.
pub fn resolve<T: Copy>(task: Option<T>, engine: Option<T>, builtin: T) -> T {
    task.or(engine).unwrap_or(builtin)
}

impl BehaviorPolicy {
    /// Create a policy with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set `do_not_break_on_error`.
    pub fn with_do_not_break_on_error(mut self, value: bool) -> Self {
        self.do_not_break_on_error = Some(value);
        self
    }

    /// Builder: set `skip_item_on_fail`.
    pub fn with_skip_item_on_fail(mut self, value: bool) -> Self {
        self.skip_item_on_fail = Some(value);
        self
    }

    /// Builder: set `max_retries`.
    pub fn with_max_retries(mut self, value: u32) -> Self {
        self.max_retries = Some(value);
        self
    }

    /// Check whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Resolve this (task-level) policy against the engine-wide defaults.
    pub fn resolve(&self, engine: &BehaviorPolicy) -> ResolvedBehavior {
        ResolvedBehavior {
            do_not_break_on_error: resolve(
                self.do_not_break_on_error,
                engine.do_not_break_on_error,
                DEFAULT_DO_NOT_BREAK_ON_ERROR,
            ),
            skip_item_on_fail: resolve(
                self.skip_item_on_fail,
                engine.skip_item_on_fail,
                DEFAULT_SKIP_ITEM_ON_FAIL,
            ),
            max_retries: resolve(self.max_retries, engine.max_retries, DEFAULT_MAX_RETRIES),
        }
    }
}

impl ResolvedBehavior {
    /// Check if another attempt is allowed after `retries` retries.
    pub fn should_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }
}

impl Default for ResolvedBehavior {
    /// Built-in defaults: abort on error, never skip, no retries.
    fn default() -> Self {
        BehaviorPolicy::default().resolve(&BehaviorPolicy::default())
    }
}
