//! Consent Gate: refreshes consent info before init and before shows, and
//! answers whether ads may be requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use adbridge_core::{
    mentioning, outcome_setters, pick_constant, BridgeCfg, ConsentState, OneShot, ParamType, STATUS_PREFERENCE,
};

use crate::adapter::{Activity, Arg, ConsentCallback, ConsentSurface, ConsentUpdate, EnumValue, MediationSdk};
use crate::dispatch::{lock, Dispatcher, Task};
use crate::invoker::apply_setters;

/// Identifier string passed as the second string argument of the update
/// request.
pub const REQUEST_PUBLISHER: &str = "Appodeal";

/// Arguments for one request-constructor shape, `None` if a parameter type
/// is not supported.
pub fn request_args(shape: &[ParamType], activity: &Activity, app_key: &str, sdk_version: &str) -> Option<Vec<Arg>> {
    let mut strings = [app_key, REQUEST_PUBLISHER, sdk_version].into_iter();
    shape
        .iter()
        .map(|ty| match ty {
            ParamType::Activity | ParamType::Context => Some(Arg::Activity(activity.clone())),
            t if t.is_bool() => Some(Arg::Bool(false)),
            ParamType::Str => Some(Arg::Str(strings.next().unwrap_or("").to_string())),
            _ => None,
        })
        .collect()
}

pub struct ConsentGate {
    surface: Option<Arc<dyn ConsentSurface>>,
    dispatcher: Arc<dyn Dispatcher>,
    cfg: BridgeCfg,
    info_updated: Arc<AtomicBool>,
    api_logged: OneShot,
}

impl ConsentGate {
    pub fn new(surface: Option<Arc<dyn ConsentSurface>>, dispatcher: Arc<dyn Dispatcher>, cfg: BridgeCfg) -> Self {
        Self {
            surface,
            dispatcher,
            cfg,
            info_updated: Arc::new(AtomicBool::new(false)),
            api_logged: OneShot::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.surface.is_some()
    }

    /// Forget earlier refreshes. Called when a new init cycle starts.
    pub fn reset(&self) {
        self.info_updated.store(false, Ordering::Release);
    }

    pub fn state(&self) -> ConsentState {
        ConsentState {
            info_updated: self.info_updated.load(Ordering::Acquire),
            can_show_ads: self.surface.as_ref().and_then(|s| s.can_show_ads()),
            status: self.surface.as_ref().and_then(|s| s.status()),
        }
    }

    /// Without a consent surface ads are never blocked.
    pub fn is_ready(&self) -> bool {
        match self.surface {
            None => true,
            Some(_) => self.state().is_ready(),
        }
    }

    pub fn log_state(&self, stage: &str) {
        let state = self.state();
        tracing::info!(
            stage,
            status = ?state.status,
            can_show_ads = ?state.can_show_ads,
            info_updated = state.info_updated,
            "consent state"
        );
    }

    /// Refresh consent info. `on_complete` runs on the dispatcher exactly once:
    /// after the surface reports back, after the timeout, or right away when
    /// no request can be made.
    pub fn request_update(&self, activity: Option<&Activity>, app_key: Option<&str>, sdk_version: &str, on_complete: Task) {
        let (Some(activity), Some(app_key)) = (activity, app_key.filter(|k| !k.trim().is_empty())) else {
            tracing::warn!("consent update skipped: no activity or app key");
            self.dispatcher.post(on_complete);
            return;
        };
        let Some(surface) = self.surface.clone() else {
            self.dispatcher.post(on_complete);
            return;
        };

        let request = surface
            .request_shapes()
            .iter()
            .enumerate()
            .filter_map(|(i, shape)| Some((i, request_args(shape, activity, app_key, sdk_version)?)))
            .find_map(|(i, args)| surface.build_request(i, args).ok());
        let Some(request) = request else {
            tracing::warn!("consent update skipped: no compatible request constructor");
            self.dispatcher.post(on_complete);
            return;
        };

        let finish = Arc::new(Completion {
            latch: OneShot::new(),
            task: Mutex::new(Some(on_complete)),
            dispatcher: self.dispatcher.clone(),
        });

        let on_timeout = finish.clone();
        self.dispatcher.post_delayed(
            self.cfg.consent_update_timeout(),
            Box::new(move || {
                if on_timeout.fire() {
                    tracing::warn!("consent update timeout");
                }
            }),
        );

        let info_updated = self.info_updated.clone();
        let on_reply = finish.clone();
        let callback = ConsentCallback::new(move |update| {
            match update {
                ConsentUpdate::Updated => {
                    tracing::info!("consent update callback: updated");
                    info_updated.store(true, Ordering::Release);
                }
                ConsentUpdate::Failed { reason } => {
                    tracing::warn!(reason = reason.as_deref().unwrap_or("unknown"), "consent update callback: failed");
                    info_updated.store(false, Ordering::Release);
                }
            }
            on_reply.fire();
        });

        match surface.request_update(request, callback) {
            Ok(()) => tracing::info!("consent update requested"),
            Err(fault) => {
                tracing::warn!(reason = %fault.into_root_cause().reason(), "consent update skipped");
                finish.fire();
            }
        }
    }

    /// Push a granted-or-equivalent status through every consent setter on
    /// the SDK and on the consent surface. Returns whether any was applied.
    pub fn preconfigure(&self, sdk: &dyn MediationSdk, activity: &Activity) -> bool {
        self.log_api_once(sdk);

        let status = self.surface.as_ref().and_then(|s| {
            let enum_type = s.status_type()?;
            let name = pick_constant(STATUS_PREFERENCE, &s.enum_constants(&enum_type))?;
            Some(EnumValue { enum_type, name })
        });

        let sdk_methods = sdk.methods();
        let sdk_setters = outcome_setters(&sdk_methods, &["consent", "lgpd"], true);
        let mut applied = apply_setters(sdk, &sdk_setters, Some(activity), status.as_ref());

        if let Some(surface) = &self.surface {
            let methods = surface.methods();
            let setters = outcome_setters(&methods, &["consent"], false);
            applied += apply_setters(&**surface, &setters, None, status.as_ref());
        }

        if applied > 0 {
            tracing::info!(applied, "consent preconfigured");
        } else {
            tracing::warn!("consent preconfigure did not find compatible API");
        }
        applied > 0
    }

    fn log_api_once(&self, sdk: &dyn MediationSdk) {
        if !self.api_logged.try_fire() {
            return;
        }
        for m in mentioning(&sdk.methods(), &["consent", "lgpd"]) {
            tracing::info!(api = %m, "consent api on sdk");
        }
        if let Some(surface) = &self.surface {
            for m in mentioning(&surface.methods(), &["consent"]) {
                tracing::info!(api = %m, "consent api on consent manager");
            }
        }
    }
}

struct Completion {
    latch: OneShot,
    task: Mutex<Option<Task>>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Completion {
    fn fire(&self) -> bool {
        if !self.latch.try_fire() {
            return false;
        }
        if let Some(task) = lock(&self.task).take() {
            self.dispatcher.post(task);
        }
        true
    }
}
