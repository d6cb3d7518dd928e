//! Process-wide orchestration state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use adbridge_core::{ConsentState, CycleLatch, InitPhase, OneShot};

use crate::adapter::Activity;
use crate::dispatch::lock;

/// Inputs and progress of the running init cycle.
#[derive(Debug)]
pub(crate) struct InitCycle {
    pub id: u64,
    pub app_key: String,
    pub testing: bool,
    /// Trimmed, lower-cased boundary log level.
    pub log_level: String,
    pub activity: Option<Activity>,
    pub phase: InitPhase,
}

impl Default for InitCycle {
    fn default() -> Self {
        Self {
            id: 0,
            app_key: String::new(),
            testing: false,
            log_level: String::new(),
            activity: None,
            phase: InitPhase::Idle,
        }
    }
}

#[derive(Debug, Default)]
pub struct BridgeState {
    pub(crate) callbacks_configured: OneShot,
    pub(crate) init_latch: CycleLatch,
    pub(crate) test_mode: Arc<AtomicBool>,
    pub(crate) last_app_key: Mutex<Option<String>>,
    pub(crate) init: Mutex<InitCycle>,
}

impl BridgeState {
    pub fn test_mode(&self) -> bool {
        self.test_mode.load(Ordering::Acquire)
    }

    pub fn last_app_key(&self) -> Option<String> {
        lock(&self.last_app_key).clone()
    }

    pub(crate) fn snapshot(&self, consent: ConsentState, consent_ready: bool) -> BridgeStatus {
        let init = lock(&self.init);
        BridgeStatus {
            init_cycle: init.id,
            init_phase: init.phase.clone(),
            init_delivered: init.id != 0 && self.init_latch.is_delivered(init.id),
            callbacks_configured: self.callbacks_configured.is_fired(),
            test_mode: self.test_mode(),
            consent,
            consent_ready,
        }
    }
}

/// Point-in-time view of the supervisor, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BridgeStatus {
    /// 0 before the first initialize.
    pub init_cycle: u64,
    pub init_phase: InitPhase,
    pub init_delivered: bool,
    pub callbacks_configured: bool,
    pub test_mode: bool,
    pub consent: ConsentState,
    pub consent_ready: bool,
}
