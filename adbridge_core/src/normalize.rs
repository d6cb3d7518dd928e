use std::sync::atomic::{AtomicBool, Ordering};

use crate::value::Value;

/// Init failure texts that leave the SDK usable. Matched case-insensitively
/// as substrings.
pub const RECOVERABLE_INIT_REASONS: &[&str] = &["sdkconfigurationerror", "adapters are not registered"];

pub fn is_recoverable_init_reason(reason: &str) -> bool {
    let lo = reason.to_ascii_lowercase();
    RECOVERABLE_INIT_REASONS.iter().any(|r| lo.contains(r))
}

/// Result of one init-callback invocation, ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitOutcome {
    pub success: bool,
    pub reason: Option<String>,
    /// Cache warmup to request right away, with its log reason.
    pub warmup: Option<&'static str>,
}

/// Method families seen on init callback interfaces across SDK releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitCallbackMethod {
    /// `onInitializationFinished(errors)` / `onInitialized(error)`.
    Finished,
    /// `onInitializationFailed(reason)`.
    Failed,
    Other,
}

impl InitCallbackMethod {
    pub fn classify(method: &str) -> Self {
        match method {
            "onInitializationFinished" | "onInitialized" => InitCallbackMethod::Finished,
            "onInitializationFailed" => InitCallbackMethod::Failed,
            _ => InitCallbackMethod::Other,
        }
    }
}

/// Success/reason carried by a "finished" payload.
///
/// A list payload succeeds iff empty, reason is its first element. A single
/// value succeeds iff null or empty text.
pub fn finished_payload(payload: Option<&Value>) -> (bool, Option<String>) {
    match payload {
        None => (true, None),
        Some(Value::List(errors)) => match errors.first() {
            None => (true, None),
            Some(first) => (false, Some(first.to_string())),
        },
        Some(v) if v.is_null() => (true, None),
        Some(v) => {
            let text = v.to_string();
            if text.is_empty() || text.eq_ignore_ascii_case("null") {
                (true, None)
            } else {
                (false, Some(text))
            }
        }
    }
}

/// Translate an init-callback invocation. `None` for methods that do not
/// report an outcome.
pub fn init_outcome(method: &str, args: &[Value]) -> Option<InitOutcome> {
    match InitCallbackMethod::classify(method) {
        InitCallbackMethod::Finished => {
            let (mut success, reason) = finished_payload(args.first());
            if !success && reason.as_deref().is_some_and(is_recoverable_init_reason) {
                success = true;
            }
            Some(InitOutcome {
                success,
                reason,
                warmup: success.then_some("initialize_callback"),
            })
        }
        InitCallbackMethod::Failed => {
            let reason = args
                .first()
                .and_then(Value::to_text)
                .unwrap_or_else(|| "init_failed".to_string());
            if is_recoverable_init_reason(&reason) {
                Some(InitOutcome {
                    success: true,
                    reason: Some(reason),
                    warmup: Some("initialize_failed_non_fatal"),
                })
            } else {
                Some(InitOutcome {
                    success: false,
                    reason: Some(reason),
                    warmup: None,
                })
            }
        }
        InitCallbackMethod::Other => None,
    }
}

/// What to report when a rewarded ad closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClosedVerdict {
    pub rewarded: bool,
    /// Shown but no completion callback arrived before close.
    pub completion_missing: bool,
    /// `rewarded` was forced to true by the test-mode heuristic.
    pub overridden: bool,
}

/// Flags for one rewarded display cycle.
#[derive(Debug, Default)]
pub struct RewardedSession {
    shown: AtomicBool,
    finished: AtomicBool,
}

impl RewardedSession {
    pub const fn new() -> Self {
        Self {
            shown: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    pub fn mark_shown(&self) {
        self.shown.store(true, Ordering::Release);
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn shown(&self) -> bool {
        self.shown.load(Ordering::Acquire)
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Resolve a close and reset the session, whatever the outcome.
    ///
    /// Some test creatives never fire their completion callback. When the
    /// SDK reports `finished=false` after a `shown` with no completion seen,
    /// the close counts as finished in test mode only. This is a heuristic
    /// and can hide real completion-reporting bugs.
    pub fn close(&self, finished: bool, test_mode: bool) -> ClosedVerdict {
        let shown = self.shown.swap(false, Ordering::AcqRel);
        let completed = self.finished.swap(false, Ordering::AcqRel);

        let completion_missing = !finished && shown && !completed;
        let overridden = completion_missing && test_mode;
        ClosedVerdict {
            rewarded: finished || overridden,
            completion_missing,
            overridden,
        }
    }
}
