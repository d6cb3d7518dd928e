//! Init and show state machines.
//!
//! Transitions are pure: `(phase, input) -> (next phase, effects)`. The
//! supervisor owns the phases, feeds inputs as collaborators answer, and
//! carries out the effects. Inputs that make no sense for the current phase
//! leave it unchanged and produce no effects.

use std::time::Duration;

use crate::cfg::BridgeCfg;
use crate::event::AdFormat;

pub const ACTIVITY_IS_NULL: &str = "activity_is_null";
pub const ACTIVITY_DESTROYED: &str = "activity_destroyed";
pub const APP_KEY_IS_EMPTY: &str = "app_key_is_empty";
pub const CONSENT_NOT_READY: &str = "consent_not_ready";
pub const INIT_CALLBACK_TIMEOUT: &str = "init_callback_timeout";
pub const INIT_DEFERRED_BY_CONSENT: &str = "init_deferred_by_consent";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InitPhase {
    Idle,
    AwaitingActivity { attempt: u32 },
    ConfiguringCallbacks,
    RequestingConsent,
    CallingInitialize,
    AwaitingInitCallback,
    Done { success: bool, reason: Option<String> },
}

impl InitPhase {
    pub fn is_done(&self) -> bool {
        matches!(self, InitPhase::Done { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitInput {
    Start,
    ActivityPolled { found: bool },
    /// Callbacks registered and the SDK preconfigured.
    Configured,
    /// Consent refresh completed, failed or timed out.
    ConsentResolved,
    InitializeReturned { awaits_callback: bool },
    /// An exception escaped one of the steps.
    Failed { reason: String },
    CallbackFired {
        success: bool,
        reason: Option<String>,
        warmup: Option<&'static str>,
    },
    CallbackTimeout { consent_ready: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitEffect {
    PollActivity { attempt: u32, delay: Duration },
    ConfigureSdk,
    RequestConsent,
    CallInitialize,
    ArmCallbackTimeout { delay: Duration },
    WarmupNow { reason: &'static str },
    Deliver { success: bool, reason: Option<String> },
}

fn finish(success: bool, reason: Option<String>, mut effects: Vec<InitEffect>) -> (InitPhase, Vec<InitEffect>) {
    effects.push(InitEffect::Deliver {
        success,
        reason: reason.clone(),
    });
    (InitPhase::Done { success, reason }, effects)
}

pub fn step_init(phase: &InitPhase, input: InitInput, cfg: &BridgeCfg) -> (InitPhase, Vec<InitEffect>) {
    use InitPhase as P;

    match (phase, input) {
        (P::Idle | P::Done { .. }, InitInput::Start) => (
            P::AwaitingActivity { attempt: 0 },
            vec![InitEffect::PollActivity {
                attempt: 0,
                delay: Duration::ZERO,
            }],
        ),

        (P::AwaitingActivity { .. }, InitInput::ActivityPolled { found: true }) => {
            (P::ConfiguringCallbacks, vec![InitEffect::ConfigureSdk])
        }
        (P::AwaitingActivity { attempt }, InitInput::ActivityPolled { found: false }) => {
            if *attempt < cfg.activity_poll_max_attempts {
                let next = attempt + 1;
                (
                    P::AwaitingActivity { attempt: next },
                    vec![InitEffect::PollActivity {
                        attempt: next,
                        delay: cfg.activity_poll_interval(),
                    }],
                )
            } else {
                finish(false, Some(ACTIVITY_IS_NULL.to_string()), Vec::new())
            }
        }

        (P::ConfiguringCallbacks, InitInput::Configured) => (P::RequestingConsent, vec![InitEffect::RequestConsent]),
        (P::RequestingConsent, InitInput::ConsentResolved) => (P::CallingInitialize, vec![InitEffect::CallInitialize]),

        (P::CallingInitialize, InitInput::InitializeReturned { awaits_callback: true }) => (
            P::AwaitingInitCallback,
            vec![
                InitEffect::WarmupNow {
                    reason: "initialize_success",
                },
                InitEffect::ArmCallbackTimeout {
                    delay: cfg.init_callback_timeout(),
                },
            ],
        ),
        (P::CallingInitialize, InitInput::InitializeReturned { awaits_callback: false }) => finish(
            true,
            None,
            vec![InitEffect::WarmupNow {
                reason: "initialize_success",
            }],
        ),
        // Answered from inside the call; the call itself still succeeded.
        (P::Done { .. }, InitInput::InitializeReturned { .. }) => (
            phase.clone(),
            vec![InitEffect::WarmupNow {
                reason: "initialize_success",
            }],
        ),

        // The SDK may answer from inside the initialize call itself.
        (
            P::CallingInitialize | P::AwaitingInitCallback,
            InitInput::CallbackFired {
                success,
                reason,
                warmup,
            },
        ) => {
            let effects = warmup.map(|reason| InitEffect::WarmupNow { reason }).into_iter().collect();
            finish(success, reason, effects)
        }
        // Late callback after a timeout already resolved the cycle.
        (P::Done { .. }, InitInput::CallbackFired { warmup: Some(reason), .. }) => {
            (phase.clone(), vec![InitEffect::WarmupNow { reason }])
        }

        (P::AwaitingInitCallback, InitInput::CallbackTimeout { consent_ready }) => {
            if consent_ready {
                finish(false, Some(INIT_CALLBACK_TIMEOUT.to_string()), Vec::new())
            } else {
                finish(true, Some(INIT_DEFERRED_BY_CONSENT.to_string()), Vec::new())
            }
        }

        (
            P::AwaitingActivity { .. }
            | P::ConfiguringCallbacks
            | P::RequestingConsent
            | P::CallingInitialize
            | P::AwaitingInitCallback,
            InitInput::Failed { reason },
        ) => finish(false, Some(reason), Vec::new()),

        _ => (phase.clone(), Vec::new()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ShowPhase {
    Requested,
    RefreshingConsent,
    CheckingAvailability,
    /// Waiting out the pre-show delay.
    Scheduled,
    Presenting,
    /// Handed to the SDK; its callbacks report the rest.
    Presented,
    Failed { reason: String },
}

impl ShowPhase {
    pub fn is_done(&self) -> bool {
        matches!(self, ShowPhase::Presented | ShowPhase::Failed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShowInput {
    Begin { consent_ready: bool },
    ConsentRefreshed { consent_ready: bool },
    Availability { can_show: bool },
    DelayElapsed { activity_alive: bool },
    ShowReturned { error: Option<String> },
    Failed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShowEffect {
    RequestConsent,
    CheckAvailability,
    ScheduleShow { delay: Duration },
    InvokeShow,
    ScheduleWarmup { reason: &'static str },
    ReportFailure { reason: String },
}

fn show_failed(reason: String, mut effects: Vec<ShowEffect>) -> (ShowPhase, Vec<ShowEffect>) {
    effects.push(ShowEffect::ReportFailure { reason: reason.clone() });
    (ShowPhase::Failed { reason }, effects)
}

/// One show request. The consent refresh happens at most once: a second
/// "not ready" answer fails the request instead of looping.
pub fn step_show(format: AdFormat, phase: &ShowPhase, input: ShowInput, cfg: &BridgeCfg) -> (ShowPhase, Vec<ShowEffect>) {
    use ShowPhase as P;

    match (phase, input) {
        (P::Requested, ShowInput::Begin { consent_ready: true }) => {
            (P::CheckingAvailability, vec![ShowEffect::CheckAvailability])
        }
        (P::Requested, ShowInput::Begin { consent_ready: false }) => {
            (P::RefreshingConsent, vec![ShowEffect::RequestConsent])
        }

        (P::RefreshingConsent, ShowInput::ConsentRefreshed { consent_ready: true }) => {
            (P::CheckingAvailability, vec![ShowEffect::CheckAvailability])
        }
        (P::RefreshingConsent, ShowInput::ConsentRefreshed { consent_ready: false }) => {
            show_failed(CONSENT_NOT_READY.to_string(), Vec::new())
        }

        (P::CheckingAvailability, ShowInput::Availability { can_show: true }) => (
            P::Scheduled,
            vec![ShowEffect::ScheduleShow {
                delay: cfg.show_delay(),
            }],
        ),
        (P::CheckingAvailability, ShowInput::Availability { can_show: false }) => {
            let reason = format.not_available_reason();
            show_failed(reason.to_string(), vec![ShowEffect::ScheduleWarmup { reason }])
        }

        (P::Scheduled, ShowInput::DelayElapsed { activity_alive: true }) => (P::Presenting, vec![ShowEffect::InvokeShow]),
        (P::Scheduled, ShowInput::DelayElapsed { activity_alive: false }) => {
            show_failed(ACTIVITY_DESTROYED.to_string(), Vec::new())
        }

        (P::Presenting, ShowInput::ShowReturned { error: None }) => (P::Presented, Vec::new()),
        (P::Presenting, ShowInput::ShowReturned { error: Some(reason) }) => show_failed(reason, Vec::new()),

        (p, ShowInput::Failed { reason }) if !p.is_done() => show_failed(reason, Vec::new()),

        _ => (phase.clone(), Vec::new()),
    }
}
