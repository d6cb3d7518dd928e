#![allow(clippy::missing_safety_doc)]

use std::collections::VecDeque;
use std::ptr;
use std::sync::{Arc, Mutex, PoisonError};

use adbridge_core::{AdFormat, BridgeCfg, CanonicalEvent, LogLevel};
use adbridge_supervisor::{ActivityProvider, AdSupervisor, Collaborators, EventSink, ManualDispatcher, MediationSdk};

/// FFI ABI version for adbridge_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const ADBRIDGE_FFI_VERSION: u32 = 1;

#[no_mangle]
pub extern "C" fn adbridge_ffi_version() -> u32 {
    ADBRIDGE_FFI_VERSION
}

/// FFI string view (UTF-8 bytes). A null pointer reads as the empty string.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AdbStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl AdbStr {
    pub const EMPTY: AdbStr = AdbStr {
        ptr: ptr::null(),
        len: 0,
    };

    fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return if self.len == 0 { Some("") } else { None };
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes).ok()
    }
}

/// Owned UTF-8 buffer handed to the host. Null/zero-length when absent.
#[repr(C)]
pub struct AdbBuf {
    pub ptr: *mut u8,
    pub len: usize,
}

impl AdbBuf {
    fn empty() -> Self {
        AdbBuf {
            ptr: ptr::null_mut(),
            len: 0,
        }
    }

    fn owned(s: &str) -> Self {
        let mut boxed = s.as_bytes().to_vec().into_boxed_slice();
        let buf = AdbBuf {
            ptr: boxed.as_mut_ptr(),
            len: boxed.len(),
        };
        // freed by adbridge_event_free
        std::mem::forget(boxed);
        buf
    }

    fn from_opt(s: Option<&str>) -> Self {
        s.map(Self::owned).unwrap_or_else(Self::empty)
    }

    unsafe fn release(self) {
        if !self.ptr.is_null() {
            let slice_ptr = ptr::slice_from_raw_parts_mut(self.ptr, self.len);
            drop(Box::from_raw(slice_ptr));
        }
    }
}

/// Event source as a C-friendly enum.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdbFormat {
    Init = 0,
    Interstitial = 1,
    Rewarded = 2,
}

/// One canonical event. Buffers are owned; release with `adbridge_event_free`.
#[repr(C)]
pub struct AdbEvent {
    pub format: AdbFormat,
    /// `initialized`/`init_failed` for init, otherwise the lifecycle name.
    pub name: AdbBuf,
    pub reason: AdbBuf,
    pub currency: AdbBuf,
    pub success: u8,
    pub rewarded: u8,
    pub amount: f64,
    /// Set for `show_failed`, `closed`, `expired` and every init event.
    pub is_terminal: u8,
}

impl AdbEvent {
    fn from_event(ev: &CanonicalEvent) -> Self {
        let format = match ev.format() {
            None => AdbFormat::Init,
            Some(AdFormat::Interstitial) => AdbFormat::Interstitial,
            Some(AdFormat::Rewarded) => AdbFormat::Rewarded,
        };
        let (rewarded, amount, currency) = match ev {
            CanonicalEvent::Rewarded {
                rewarded,
                amount,
                currency,
                ..
            } => (*rewarded, *amount, currency.as_deref()),
            _ => (false, 0.0, None),
        };
        AdbEvent {
            format,
            name: AdbBuf::owned(ev.name()),
            reason: AdbBuf::from_opt(ev.reason()),
            currency: AdbBuf::from_opt(currency),
            success: ev.success() as u8,
            rewarded: rewarded as u8,
            amount,
            is_terminal: ev.is_terminal() as u8,
        }
    }
}

/// Bridge cfg for FFI. Mirrors `BridgeCfg` field for field.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AdbCfg {
    pub activity_poll_interval_ms: u64,
    pub activity_poll_max_attempts: u32,
    pub init_callback_timeout_ms: u64,
    pub consent_update_timeout_ms: u64,
    pub cache_retry_delay_ms: u64,
    pub show_delay_ms: u64,
    pub auto_cache: u8,
}

#[no_mangle]
pub extern "C" fn adbridge_cfg_default() -> AdbCfg {
    let d = BridgeCfg::default();
    AdbCfg {
        activity_poll_interval_ms: d.activity_poll_interval_ms,
        activity_poll_max_attempts: d.activity_poll_max_attempts,
        init_callback_timeout_ms: d.init_callback_timeout_ms,
        consent_update_timeout_ms: d.consent_update_timeout_ms,
        cache_retry_delay_ms: d.cache_retry_delay_ms,
        show_delay_ms: d.show_delay_ms,
        auto_cache: if d.auto_cache { 1 } else { 0 },
    }
}

pub fn cfg_from_ffi(c: AdbCfg) -> BridgeCfg {
    BridgeCfg {
        activity_poll_interval_ms: c.activity_poll_interval_ms,
        activity_poll_max_attempts: c.activity_poll_max_attempts,
        init_callback_timeout_ms: c.init_callback_timeout_ms,
        consent_update_timeout_ms: c.consent_update_timeout_ms,
        cache_retry_delay_ms: c.cache_retry_delay_ms,
        show_delay_ms: c.show_delay_ms,
        auto_cache: c.auto_cache != 0,
    }
}

/// Canonical events waiting for the host to drain them.
#[derive(Default)]
struct QueuedSink {
    queue: Mutex<VecDeque<CanonicalEvent>>,
}

impl QueuedSink {
    fn pop(&self) -> Option<CanonicalEvent> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl EventSink for QueuedSink {
    fn deliver(&self, event: CanonicalEvent) {
        tracing::debug!(event = event.name(), format = ?event.format(), "queued for host");
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).push_back(event);
    }
}

/// Opaque handle exposed over FFI.
///
/// The platform binding builds it on the Rust side, where its SDK and
/// activity adapters live, and passes it out with [`adbridge_handle_into_raw`].
/// Deferred work runs on a virtual clock the host advances with
/// `adbridge_pump`.
pub struct AdbridgeHandle {
    supervisor: AdSupervisor,
    dispatcher: Arc<ManualDispatcher>,
    events: Arc<QueuedSink>,
}

impl AdbridgeHandle {
    pub fn new(sdk: Arc<dyn MediationSdk>, activities: Arc<dyn ActivityProvider>, cfg: BridgeCfg) -> Self {
        let dispatcher = Arc::new(ManualDispatcher::new());
        let events = Arc::new(QueuedSink::default());
        let supervisor = AdSupervisor::new(
            Collaborators {
                sdk,
                activities,
                dispatcher: dispatcher.clone(),
                sink: events.clone(),
            },
            cfg,
        );
        Self {
            supervisor,
            dispatcher,
            events,
        }
    }

    pub fn supervisor(&self) -> &AdSupervisor {
        &self.supervisor
    }

    pub fn dispatcher(&self) -> &ManualDispatcher {
        &self.dispatcher
    }

    /// Events queued and not yet polled.
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }
}

/// Move a handle across the boundary. Release with `adbridge_free`.
pub fn adbridge_handle_into_raw(handle: AdbridgeHandle) -> *mut AdbridgeHandle {
    Box::into_raw(Box::new(handle))
}

#[no_mangle]
pub unsafe extern "C" fn adbridge_free(h: *mut AdbridgeHandle) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

unsafe fn handle<'a>(h: *const AdbridgeHandle) -> Option<&'a AdbridgeHandle> {
    h.as_ref()
}

/// Start (or restart) initialization. Returns 1 when a cycle was started;
/// the outcome arrives later as an init event.
#[no_mangle]
pub unsafe extern "C" fn adbridge_initialize(
    h: *const AdbridgeHandle,
    app_key: AdbStr,
    testing: u8,
    log_level: AdbStr,
) -> u8 {
    let Some(handle) = handle(h) else { return 0 };
    let (Some(key), Some(level)) = (app_key.as_str(), log_level.as_str()) else {
        tracing::warn!("initialize: invalid UTF-8 input");
        return 0;
    };
    handle.supervisor.initialize(key, testing != 0, level) as u8
}

#[no_mangle]
pub unsafe extern "C" fn adbridge_is_interstitial_available(h: *const AdbridgeHandle) -> u8 {
    handle(h).is_some_and(|h| h.supervisor.is_interstitial_available()) as u8
}

#[no_mangle]
pub unsafe extern "C" fn adbridge_is_rewarded_available(h: *const AdbridgeHandle) -> u8 {
    handle(h).is_some_and(|h| h.supervisor.is_rewarded_available()) as u8
}

#[no_mangle]
pub unsafe extern "C" fn adbridge_show_interstitial(h: *const AdbridgeHandle) -> u8 {
    handle(h).is_some_and(|h| h.supervisor.show_interstitial()) as u8
}

#[no_mangle]
pub unsafe extern "C" fn adbridge_show_rewarded(h: *const AdbridgeHandle) -> u8 {
    handle(h).is_some_and(|h| h.supervisor.show_rewarded()) as u8
}

/// Advance the handle's clock by `elapsed_ms`, running whatever falls due.
/// Returns the number of tasks run.
#[no_mangle]
pub unsafe extern "C" fn adbridge_pump(h: *const AdbridgeHandle, elapsed_ms: u64) -> u32 {
    match handle(h) {
        Some(handle) => handle.dispatcher.advance_ms(elapsed_ms) as u32,
        None => 0,
    }
}

/// Pop the oldest queued event into `out`. Returns 0 when the queue is empty.
/// A returned event must be released with `adbridge_event_free`.
#[no_mangle]
pub unsafe extern "C" fn adbridge_poll_event(h: *const AdbridgeHandle, out: *mut AdbEvent) -> u8 {
    let Some(handle) = handle(h) else { return 0 };
    if out.is_null() {
        return 0;
    }
    match handle.events.pop() {
        Some(ev) => {
            ptr::write(out, AdbEvent::from_event(&ev));
            1
        }
        None => 0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn adbridge_event_free(ev: AdbEvent) {
    ev.name.release();
    ev.reason.release();
    ev.currency.release();
}

/// Install a global fmt subscriber filtered from the boundary log level.
/// Returns 1 on install; 0 when a subscriber is already set or the input is
/// not UTF-8.
#[no_mangle]
pub unsafe extern "C" fn adbridge_install_logging(level: AdbStr) -> u8 {
    let Some(raw) = level.as_str() else { return 0 };
    let directive = match LogLevel::parse(raw) {
        LogLevel::Debug => "debug",
        LogLevel::Verbose => "trace",
        LogLevel::None => "warn",
    };
    let filter = tracing_subscriber::EnvFilter::new(directive);
    tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() as u8
}
