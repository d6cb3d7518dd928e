//! Cache Warmup Scheduler.
//!
//! Best-effort: every failure is logged at debug level and dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use adbridge_core::{probe, AdFormat, BridgeCfg, CapabilityDescriptor};

use crate::adapter::{ActivityProvider, CallbackProxy, MediationSdk};
use crate::dispatch::Dispatcher;
use crate::invoker::{invoke_first, Bindings};

#[derive(Clone)]
pub struct CacheWarmup {
    // Weak: the SDK holds our callbacks, which hold this.
    sdk: Weak<dyn MediationSdk>,
    activities: Arc<dyn ActivityProvider>,
    dispatcher: Arc<dyn Dispatcher>,
    delay: Duration,
}

impl CacheWarmup {
    pub fn new(
        sdk: &Arc<dyn MediationSdk>,
        activities: Arc<dyn ActivityProvider>,
        dispatcher: Arc<dyn Dispatcher>,
        cfg: &BridgeCfg,
    ) -> Self {
        Self {
            sdk: Arc::downgrade(sdk),
            activities,
            dispatcher,
            delay: cfg.cache_retry_delay(),
        }
    }

    /// Request a cache refresh for both formats right now.
    pub fn warmup_now(&self, reason: &str) {
        let Some(sdk) = self.sdk.upgrade() else {
            return;
        };
        for format in AdFormat::ALL {
            self.cache_one(&*sdk, format);
        }
        tracing::info!(reason, "cache warmup requested");
    }

    /// Same as [`CacheWarmup::warmup_now`] after the retry delay.
    pub fn schedule_warmup(&self, reason: &'static str) {
        tracing::debug!(reason, delay_ms = self.delay.as_millis() as u64, "cache warmup scheduled");
        let this = self.clone();
        self.dispatcher
            .post_delayed(self.delay, Box::new(move || this.warmup_now(reason)));
    }

    fn cache_one(&self, sdk: &dyn MediationSdk, format: AdFormat) {
        let methods = sdk.methods();
        let formats = [format];
        let mut no_callback = |_: &str| -> Option<CallbackProxy> { None };

        let bare = probe(&CapabilityDescriptor::CACHE, &methods);
        let bindings = Bindings {
            activity: None,
            identifier: None,
            formats: &formats,
        };
        if !bare.is_empty() && invoke_first(sdk, "cache", &bare, bindings, &mut no_callback).is_ok() {
            return;
        }

        let Some(activity) = self.activities.current_activity() else {
            return;
        };
        let with_context = probe(&CapabilityDescriptor::CACHE_WITH_CONTEXT, &methods);
        let bindings = Bindings {
            activity: Some(&activity),
            ..bindings
        };
        if let Err(fault) = invoke_first(sdk, "cache", &with_context, bindings, &mut no_callback) {
            tracing::debug!(format = %format, reason = %fault.reason(), "cache request dropped");
        }
    }
}
