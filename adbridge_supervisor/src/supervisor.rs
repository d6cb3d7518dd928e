//! Init/Show Orchestrator.
//!
//! `AdSupervisor` owns the collaborators and drives the pure state machines
//! from `adbridge_core::flow`: it feeds inputs as the SDK, the consent gate
//! and the dispatcher answer, and carries out the effects each step asks
//! for. Every scheduled task holds a weak reference, so dropping the
//! supervisor turns pending work into no-ops.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use adbridge_core::flow::{ACTIVITY_IS_NULL, APP_KEY_IS_EMPTY};
use adbridge_core::{
    find_exact, find_unary, probe, step_init, step_show, AdFormat, BridgeCfg, CanonicalEvent, CapabilityDescriptor,
    InitEffect, InitInput, LogLevel, ParamType, SdkFault, ShowEffect, ShowInput, ShowPhase,
};

use crate::adapter::{
    Activity, ActivityProvider, Arg, CallbackProxy, EventSink, MediationSdk,
};
use crate::consent::ConsentGate;
use crate::dispatch::{lock, Dispatcher, Task};
use crate::invoker::{invoke_first, Bindings};
use crate::normalizer::EventNormalizer;
use crate::state::{BridgeState, BridgeStatus, InitCycle};
use crate::warmup::CacheWarmup;

/// Everything the supervisor talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub sdk: Arc<dyn MediationSdk>,
    pub activities: Arc<dyn ActivityProvider>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub sink: Arc<dyn EventSink>,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AdSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    cfg: BridgeCfg,
    sdk: Arc<dyn MediationSdk>,
    activities: Arc<dyn ActivityProvider>,
    dispatcher: Arc<dyn Dispatcher>,
    sink: Arc<dyn EventSink>,
    consent: ConsentGate,
    warmup: CacheWarmup,
    normalizer: Arc<EventNormalizer>,
    state: BridgeState,
}

struct ShowRequest {
    format: AdFormat,
    activity: Activity,
    phase: Mutex<ShowPhase>,
}

impl AdSupervisor {
    pub fn new(parts: Collaborators, cfg: BridgeCfg) -> Self {
        let Collaborators {
            sdk,
            activities,
            dispatcher,
            sink,
        } = parts;

        let state = BridgeState::default();
        let warmup = CacheWarmup::new(&sdk, activities.clone(), dispatcher.clone(), &cfg);
        let normalizer = Arc::new(EventNormalizer::new(sink.clone(), warmup.clone(), state.test_mode.clone()));
        let consent = ConsentGate::new(sdk.consent(), dispatcher.clone(), cfg.clone());

        Self {
            inner: Arc::new(Inner {
                cfg,
                sdk,
                activities,
                dispatcher,
                sink,
                consent,
                warmup,
                normalizer,
                state,
            }),
        }
    }

    /// Start an init cycle. Returns false only for a blank key, in which case
    /// the failure has already been delivered.
    pub fn initialize(&self, app_key: &str, testing: bool, log_level: &str) -> bool {
        let inner = &self.inner;
        tracing::info!(testing, log_level, "initialize called");

        if app_key.trim().is_empty() {
            tracing::error!("initialize failed: {APP_KEY_IS_EMPTY}");
            inner.sink.deliver(CanonicalEvent::init(false, Some(APP_KEY_IS_EMPTY.to_string())));
            return false;
        }

        *lock(&inner.state.last_app_key) = Some(app_key.to_string());
        inner.consent.reset();

        let cycle = inner.state.init_latch.begin();
        *lock(&inner.state.init) = InitCycle {
            id: cycle,
            app_key: app_key.to_string(),
            testing,
            log_level: log_level.trim().to_ascii_lowercase(),
            ..InitCycle::default()
        };
        inner.feed_init(cycle, InitInput::Start);
        true
    }

    pub fn is_available(&self, format: AdFormat) -> bool {
        self.inner.sdk.is_loaded(format).unwrap_or(false)
    }

    pub fn is_interstitial_available(&self) -> bool {
        self.is_available(AdFormat::Interstitial)
    }

    pub fn is_rewarded_available(&self) -> bool {
        self.is_available(AdFormat::Rewarded)
    }

    /// Accept a show request for asynchronous processing. False only when
    /// there is no foreground activity, reported as `show_failed` too.
    pub fn show(&self, format: AdFormat) -> bool {
        let inner = &self.inner;
        tracing::info!(format = %format, "show called");

        let Some(activity) = inner.activities.current_activity() else {
            tracing::error!(format = %format, "show failed: {ACTIVITY_IS_NULL}");
            inner.sink.deliver(CanonicalEvent::show_failed(format, ACTIVITY_IS_NULL));
            return false;
        };

        let request = Arc::new(ShowRequest {
            format,
            activity,
            phase: Mutex::new(ShowPhase::Requested),
        });
        inner.schedule(Duration::ZERO, move |inner| {
            let consent_ready = inner.consent.is_ready();
            inner.feed_show(&request, ShowInput::Begin { consent_ready });
        });
        true
    }

    pub fn show_interstitial(&self) -> bool {
        self.show(AdFormat::Interstitial)
    }

    pub fn show_rewarded(&self) -> bool {
        self.show(AdFormat::Rewarded)
    }

    pub fn consent_ready(&self) -> bool {
        self.inner.consent.is_ready()
    }

    pub fn status(&self) -> BridgeStatus {
        let inner = &self.inner;
        inner.state.snapshot(inner.consent.state(), inner.consent.is_ready())
    }
}

impl Inner {
    fn task<F>(self: &Arc<Self>, f: F) -> Task
    where
        F: FnOnce(&Arc<Inner>) + Send + 'static,
    {
        let weak: Weak<Inner> = Arc::downgrade(self);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                f(&inner);
            }
        })
    }

    fn schedule<F>(self: &Arc<Self>, delay: Duration, f: F)
    where
        F: FnOnce(&Arc<Inner>) + Send + 'static,
    {
        self.dispatcher.post_delayed(delay, self.task(f));
    }

    fn sdk_version(&self) -> String {
        self.sdk.version().unwrap_or_else(|| "unknown".to_string())
    }

    // ---- init ----

    fn feed_init(self: &Arc<Self>, cycle: u64, input: InitInput) {
        let effects = {
            let mut init = lock(&self.state.init);
            if init.id != cycle {
                tracing::debug!(cycle, current = init.id, ?input, "stale init input dropped");
                return;
            }
            let (next, effects) = step_init(&init.phase, input, &self.cfg);
            init.phase = next;
            effects
        };

        for effect in effects {
            self.run_init_effect(cycle, effect);
        }
    }

    fn run_init_effect(self: &Arc<Self>, cycle: u64, effect: InitEffect) {
        match effect {
            InitEffect::PollActivity { attempt, delay } => {
                self.schedule(delay, move |inner| inner.poll_activity(cycle, attempt));
            }
            InitEffect::ConfigureSdk => match self.configure_sdk(cycle) {
                Ok(()) => self.feed_init(cycle, InitInput::Configured),
                Err(fault) => {
                    tracing::error!(reason = %fault.reason(), "initialize failed with exception");
                    self.feed_init(cycle, InitInput::Failed { reason: fault.reason() });
                }
            },
            InitEffect::RequestConsent => {
                let (activity, key) = {
                    let init = lock(&self.state.init);
                    (init.activity.clone(), init.app_key.clone())
                };
                let done = self.task(move |inner| {
                    inner.consent.log_state("after_consent_update");
                    inner.feed_init(cycle, InitInput::ConsentResolved);
                });
                self.consent
                    .request_update(activity.as_ref(), Some(key.as_str()), &self.sdk_version(), done);
            }
            InitEffect::CallInitialize => {
                self.consent.log_state("before_initialize");
                match self.call_initialize(cycle) {
                    Ok(awaits_callback) => {
                        tracing::info!(awaits_callback, "initialize success");
                        self.feed_init(cycle, InitInput::InitializeReturned { awaits_callback });
                    }
                    Err(fault) => {
                        tracing::error!(reason = %fault.reason(), "initialize failed with exception");
                        self.feed_init(cycle, InitInput::Failed { reason: fault.reason() });
                    }
                }
            }
            InitEffect::ArmCallbackTimeout { delay } => {
                self.schedule(delay, move |inner| {
                    let consent_ready = inner.consent.is_ready();
                    inner.feed_init(cycle, InitInput::CallbackTimeout { consent_ready });
                });
            }
            InitEffect::WarmupNow { reason } => self.warmup.warmup_now(reason),
            InitEffect::Deliver { success, reason } => {
                if !self.state.init_latch.try_deliver(cycle) {
                    tracing::debug!(cycle, "init outcome already delivered");
                    return;
                }
                if success {
                    tracing::info!(reason = ?reason, "initialized");
                } else {
                    tracing::error!(reason = ?reason, "initialize failed");
                }
                self.sink.deliver(CanonicalEvent::init(success, reason));
            }
        }
    }

    fn poll_activity(self: &Arc<Self>, cycle: u64, attempt: u32) {
        let activity = self.activities.current_activity();
        let found = activity.is_some();
        {
            let mut init = lock(&self.state.init);
            if init.id != cycle {
                return;
            }
            init.activity = activity;
        }
        if !found {
            tracing::debug!(attempt, "no foreground activity yet");
        }
        self.feed_init(cycle, InitInput::ActivityPolled { found });
    }

    fn configure_sdk(&self, cycle: u64) -> Result<(), SdkFault> {
        let (activity, testing, log_level) = {
            let init = lock(&self.state.init);
            if init.id != cycle {
                return Ok(());
            }
            (init.activity.clone(), init.testing, init.log_level.clone())
        };
        let activity = activity.ok_or_else(|| SdkFault::with_message("IllegalStateException", ACTIVITY_IS_NULL))?;

        self.configure_callbacks()?;
        self.apply_log_level(&log_level);
        self.sdk.set_testing(testing).map_err(SdkFault::into_root_cause)?;
        self.state.test_mode.store(testing, Ordering::Release);
        if self.cfg.auto_cache {
            self.configure_auto_cache();
        }
        self.consent.preconfigure(self.sdk.as_ref(), &activity);
        Ok(())
    }

    fn configure_callbacks(&self) -> Result<(), SdkFault> {
        if !self.state.callbacks_configured.try_fire() {
            return Ok(());
        }
        self.sdk
            .set_interstitial_callbacks(self.normalizer.clone())
            .map_err(SdkFault::into_root_cause)?;
        self.sdk
            .set_rewarded_callbacks(self.normalizer.clone())
            .map_err(SdkFault::into_root_cause)?;
        tracing::info!("sdk callbacks registered");
        Ok(())
    }

    /// Enum overload first, then the string overload with the raw text.
    fn apply_log_level(&self, raw: &str) {
        let level = LogLevel::parse(raw);
        let methods = self.sdk.methods();

        if let Some(sig) = find_unary(&methods, "setLogLevel", |p| p.enum_name().is_some()) {
            if let Some(enum_type) = sig.params[0].enum_name() {
                let name = level.enum_constant();
                if self.sdk.enum_constants(enum_type).iter().any(|c| c == name) {
                    let arg = Arg::EnumConstant {
                        enum_type: enum_type.to_string(),
                        name: name.to_string(),
                    };
                    if self.sdk.invoke(sig, vec![arg]).is_ok() {
                        tracing::debug!(level = name, "log level applied");
                        return;
                    }
                }
            }
        }

        if let Some(sig) = find_exact(&methods, "setLogLevel", &[ParamType::Str]) {
            if let Err(fault) = self.sdk.invoke(sig, vec![Arg::Str(raw.to_string())]) {
                tracing::debug!(reason = %fault.into_root_cause().reason(), "log level not applied");
            }
        }
    }

    fn configure_auto_cache(&self) {
        let methods = self.sdk.methods();
        let Some(sig) = find_exact(&methods, "setAutoCache", &[ParamType::Int, ParamType::Bool]) else {
            return;
        };
        let all_ok = AdFormat::ALL.iter().all(|f| {
            self.sdk
                .invoke(sig, vec![Arg::Int(f.flag()), Arg::Bool(true)])
                .is_ok()
        });
        if all_ok {
            tracing::info!("auto_cache configured");
        }
    }

    fn call_initialize(self: &Arc<Self>, cycle: u64) -> Result<bool, SdkFault> {
        let (activity, key) = {
            let init = lock(&self.state.init);
            (init.activity.clone(), init.app_key.clone())
        };

        let methods = self.sdk.methods();
        let candidates = probe(&CapabilityDescriptor::INITIALIZE, &methods);

        let weak = Arc::downgrade(self);
        let mut make_callback = |interface: &str| -> Option<CallbackProxy> {
            let weak = weak.clone();
            Some(EventNormalizer::init_proxy(interface, move |outcome| {
                if let Some(inner) = weak.upgrade() {
                    // An answer through an earlier cycle's listener settles the open cycle.
                    let current = lock(&inner.state.init).id;
                    if current != cycle {
                        tracing::debug!(issued = cycle, current, "init callback from earlier cycle");
                    }
                    inner.feed_init(
                        current,
                        InitInput::CallbackFired {
                            success: outcome.success,
                            reason: outcome.reason,
                            warmup: outcome.warmup,
                        },
                    );
                }
            }))
        };

        let bindings = Bindings {
            activity: activity.as_ref(),
            identifier: Some(key.as_str()),
            formats: &AdFormat::ALL,
        };
        let call = invoke_first(self.sdk.as_ref(), "initialize", &candidates, bindings, &mut make_callback)?;
        Ok(call.awaits_callback)
    }

    // ---- show ----

    fn feed_show(self: &Arc<Self>, request: &Arc<ShowRequest>, input: ShowInput) {
        let effects = {
            let mut phase = lock(&request.phase);
            let (next, effects) = step_show(request.format, &phase, input, &self.cfg);
            *phase = next;
            effects
        };

        for effect in effects {
            self.run_show_effect(request, effect);
        }
    }

    fn run_show_effect(self: &Arc<Self>, request: &Arc<ShowRequest>, effect: ShowEffect) {
        let format = request.format;
        match effect {
            ShowEffect::RequestConsent => {
                tracing::warn!(format = %format, "refreshing consent before show");
                let key = self.state.last_app_key();
                let req = request.clone();
                let done = self.task(move |inner| {
                    let consent_ready = inner.consent.is_ready();
                    if !consent_ready {
                        tracing::warn!(format = %format, "show blocked: consent_not_ready");
                    }
                    inner.feed_show(&req, ShowInput::ConsentRefreshed { consent_ready });
                });
                self.consent
                    .request_update(Some(&request.activity), key.as_deref(), &self.sdk_version(), done);
            }
            ShowEffect::CheckAvailability => match self.sdk.can_show(format) {
                Ok(can_show) => self.feed_show(request, ShowInput::Availability { can_show }),
                Err(fault) => {
                    let reason = fault.into_root_cause().reason();
                    tracing::error!(format = %format, %reason, "show failed with exception");
                    self.feed_show(request, ShowInput::Failed { reason });
                }
            },
            ShowEffect::ScheduleShow { delay } => {
                tracing::info!(format = %format, delay_ms = delay.as_millis() as u64, "show scheduled");
                let req = request.clone();
                self.schedule(delay, move |inner| {
                    let activity_alive = req.activity.is_alive();
                    inner.feed_show(&req, ShowInput::DelayElapsed { activity_alive });
                });
            }
            ShowEffect::InvokeShow => {
                tracing::info!(format = %format, "calling sdk show");
                let error = self
                    .sdk
                    .show(&request.activity, format)
                    .err()
                    .map(|fault| fault.into_root_cause().reason());
                self.feed_show(request, ShowInput::ShowReturned { error });
            }
            ShowEffect::ScheduleWarmup { reason } => self.warmup.schedule_warmup(reason),
            ShowEffect::ReportFailure { reason } => {
                tracing::warn!(format = %format, %reason, "show_failed");
                self.sink.deliver(CanonicalEvent::show_failed(format, reason));
            }
        }
    }
}
