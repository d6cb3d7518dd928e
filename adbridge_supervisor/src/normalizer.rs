//! Event Normalizer: SDK callbacks in, canonical events out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use adbridge_core::{init_outcome, AdEvent, AdFormat, CanonicalEvent, InitOutcome, RewardedSession};

use crate::adapter::{CallbackProxy, EventSink, InterstitialCallbacks, RewardedCallbacks};
use crate::warmup::CacheWarmup;

pub struct EventNormalizer {
    sink: Arc<dyn EventSink>,
    warmup: CacheWarmup,
    session: RewardedSession,
    test_mode: Arc<AtomicBool>,
}

impl EventNormalizer {
    pub fn new(sink: Arc<dyn EventSink>, warmup: CacheWarmup, test_mode: Arc<AtomicBool>) -> Self {
        Self {
            sink,
            warmup,
            session: RewardedSession::new(),
            test_mode,
        }
    }

    /// Proxy for an init callback interface. Outcome-bearing methods are
    /// translated and handed to `report`; anything else is only answered.
    pub fn init_proxy<F>(interface: &str, report: F) -> CallbackProxy
    where
        F: Fn(InitOutcome) + Send + Sync + 'static,
    {
        CallbackProxy::new(interface, move |method, args| match init_outcome(method, args) {
            Some(outcome) => {
                tracing::info!(
                    method,
                    success = outcome.success,
                    reason = ?outcome.reason,
                    "initialize callback"
                );
                report(outcome);
            }
            None => tracing::debug!(method, "initialize callback ignored"),
        })
    }

    fn emit(&self, event: CanonicalEvent) {
        self.sink.deliver(event);
    }

    fn interstitial(&self, event: AdEvent, success: bool, reason: Option<&str>) {
        self.emit(CanonicalEvent::ad(
            AdFormat::Interstitial,
            event,
            success,
            reason.map(str::to_string),
        ));
    }

    fn rewarded(&self, event: AdEvent, success: bool, reason: Option<&str>) {
        self.emit(CanonicalEvent::ad(AdFormat::Rewarded, event, success, reason.map(str::to_string)));
    }

    fn failed_to_load(&self, format: AdFormat) {
        tracing::warn!(format = %format, "failed_to_load");
        self.warmup.schedule_warmup(format.failed_to_load_reason());
    }
}

impl InterstitialCallbacks for EventNormalizer {
    fn on_interstitial_loaded(&self, is_precache: bool) {
        tracing::info!(is_precache, "interstitial loaded");
        self.interstitial(AdEvent::Loaded, true, None);
    }

    fn on_interstitial_failed_to_load(&self) {
        self.failed_to_load(AdFormat::Interstitial);
        self.interstitial(AdEvent::FailedToLoad, false, Some("failed_to_load"));
    }

    fn on_interstitial_show_failed(&self) {
        tracing::warn!("interstitial show_failed");
        self.interstitial(AdEvent::ShowFailed, false, Some("show_failed"));
    }

    fn on_interstitial_shown(&self) {
        self.interstitial(AdEvent::Shown, true, None);
    }

    fn on_interstitial_clicked(&self) {
        self.interstitial(AdEvent::Clicked, true, None);
    }

    fn on_interstitial_closed(&self) {
        self.interstitial(AdEvent::Closed, true, None);
    }

    fn on_interstitial_expired(&self) {
        self.interstitial(AdEvent::Expired, false, Some("expired"));
    }
}

impl RewardedCallbacks for EventNormalizer {
    fn on_rewarded_video_loaded(&self, is_precache: bool) {
        tracing::info!(is_precache, "rewarded loaded");
        self.rewarded(AdEvent::Loaded, true, None);
    }

    fn on_rewarded_video_failed_to_load(&self) {
        self.failed_to_load(AdFormat::Rewarded);
        self.rewarded(AdEvent::FailedToLoad, false, Some("failed_to_load"));
    }

    fn on_rewarded_video_show_failed(&self) {
        tracing::warn!("rewarded show_failed");
        self.rewarded(AdEvent::ShowFailed, false, Some("show_failed"));
    }

    fn on_rewarded_video_shown(&self) {
        self.session.mark_shown();
        self.rewarded(AdEvent::Shown, true, None);
    }

    fn on_rewarded_video_clicked(&self) {
        self.rewarded(AdEvent::Clicked, true, None);
    }

    fn on_rewarded_video_finished(&self, amount: f64, currency: Option<String>) {
        tracing::info!(amount, currency = ?currency, "rewarded reward");
        self.session.mark_finished();
        self.emit(CanonicalEvent::Rewarded {
            event: AdEvent::Reward,
            success: true,
            reason: None,
            rewarded: true,
            amount,
            currency,
        });
    }

    fn on_rewarded_video_closed(&self, finished: bool) {
        tracing::info!(
            finished,
            shown_fired = self.session.shown(),
            finished_fired = self.session.finished(),
            "rewarded closed"
        );

        let verdict = self.session.close(finished, self.test_mode.load(Ordering::Acquire));
        if verdict.completion_missing {
            tracing::warn!("rewarded closed without a completion callback");
            self.warmup.schedule_warmup("rewarded_closed_without_completion");
        }
        if verdict.overridden {
            tracing::info!("test mode: treating rewarded close as finished");
        }

        self.emit(CanonicalEvent::Rewarded {
            event: AdEvent::Closed,
            success: true,
            reason: None,
            rewarded: verdict.rewarded,
            amount: 0.0,
            currency: None,
        });
    }

    fn on_rewarded_video_expired(&self) {
        self.rewarded(AdEvent::Expired, false, Some("expired"));
    }
}
