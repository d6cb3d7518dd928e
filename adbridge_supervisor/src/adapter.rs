//! Collaborator boundary: the traits a platform binding implements to plug a
//! concrete SDK release, activity host and consumer into the supervisor.
//!
//! One `MediationSdk` implementation exists per SDK release shape. Overloads
//! that changed between releases are advertised as [`Signature`] data and
//! negotiated through `adbridge_core::capability`; operations that never
//! changed are plain trait methods.

use std::fmt;
use std::sync::Arc;

use adbridge_core::{AdFormat, CanonicalEvent, ParamType, ReturnKind, SdkFault, Signature, Value};

/// A host activity (window owner).
pub trait ActivityHandle: Send + Sync + fmt::Debug {
    fn is_finishing(&self) -> bool;
    fn is_destroyed(&self) -> bool;

    fn is_alive(&self) -> bool {
        !self.is_finishing() && !self.is_destroyed()
    }
}

pub type Activity = Arc<dyn ActivityHandle>;

/// Foreground-activity accessor.
pub trait ActivityProvider: Send + Sync {
    fn current_activity(&self) -> Option<Activity>;
}

/// Consumer of canonical events.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: CanonicalEvent);
}

impl<F> EventSink for F
where
    F: Fn(CanonicalEvent) + Send + Sync,
{
    fn deliver(&self, event: CanonicalEvent) {
        self(event)
    }
}

type ProxyHandler = dyn Fn(&str, &[Value]) + Send + Sync;

/// A callback object handed to the SDK for an interface the bridge only
/// knows by name.
///
/// The adapter calls [`CallbackProxy::invoke`] for every interface method
/// the SDK invokes and returns the neutral value to the SDK.
#[derive(Clone)]
pub struct CallbackProxy {
    interface: String,
    handler: Arc<ProxyHandler>,
}

impl CallbackProxy {
    pub fn new<F>(interface: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &[Value]) + Send + Sync + 'static,
    {
        Self {
            interface: interface.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn invoke(&self, method: &str, args: &[Value], returns: ReturnKind) -> Value {
        (self.handler)(method, args);
        Value::neutral(returns)
    }
}

impl fmt::Debug for CallbackProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackProxy").field("interface", &self.interface).finish()
    }
}

/// Concrete argument for one parameter slot.
#[derive(Clone, Debug)]
pub enum Arg {
    Activity(Activity),
    Str(String),
    Int(i32),
    IntArray(Vec<i32>),
    Bool(bool),
    Long(i64),
    EnumConstant { enum_type: String, name: String },
    Callback(CallbackProxy),
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&CallbackProxy> {
        match self {
            Arg::Callback(cb) => Some(cb),
            _ => None,
        }
    }
}

/// Overload table plus generic invocation, shared by every probed surface.
pub trait ProbeSurface: Send + Sync {
    /// Operations the installed release exposes.
    fn methods(&self) -> Vec<Signature>;

    fn invoke(&self, signature: &Signature, args: Vec<Arg>) -> Result<Value, SdkFault>;

    /// Constants of the named enum, in declaration order. Empty if the enum
    /// does not exist.
    fn enum_constants(&self, enum_type: &str) -> Vec<String>;
}

/// Interstitial lifecycle callbacks.
pub trait InterstitialCallbacks: Send + Sync {
    fn on_interstitial_loaded(&self, is_precache: bool);
    fn on_interstitial_failed_to_load(&self);
    fn on_interstitial_show_failed(&self);
    fn on_interstitial_shown(&self);
    fn on_interstitial_clicked(&self);
    fn on_interstitial_closed(&self);
    fn on_interstitial_expired(&self);
}

/// Rewarded-video lifecycle callbacks.
pub trait RewardedCallbacks: Send + Sync {
    fn on_rewarded_video_loaded(&self, is_precache: bool);
    fn on_rewarded_video_failed_to_load(&self);
    fn on_rewarded_video_show_failed(&self);
    fn on_rewarded_video_shown(&self);
    fn on_rewarded_video_clicked(&self);
    fn on_rewarded_video_finished(&self, amount: f64, currency: Option<String>);
    fn on_rewarded_video_closed(&self, finished: bool);
    fn on_rewarded_video_expired(&self);
}

/// The external ad-mediation SDK.
pub trait MediationSdk: ProbeSurface {
    fn version(&self) -> Option<String>;

    fn set_testing(&self, testing: bool) -> Result<(), SdkFault>;

    fn set_interstitial_callbacks(&self, callbacks: Arc<dyn InterstitialCallbacks>) -> Result<(), SdkFault>;

    fn set_rewarded_callbacks(&self, callbacks: Arc<dyn RewardedCallbacks>) -> Result<(), SdkFault>;

    fn is_loaded(&self, format: AdFormat) -> Result<bool, SdkFault>;

    fn can_show(&self, format: AdFormat) -> Result<bool, SdkFault>;

    fn show(&self, activity: &Activity, format: AdFormat) -> Result<(), SdkFault>;

    /// Consent-management surface, when the installed release ships one.
    fn consent(&self) -> Option<Arc<dyn ConsentSurface>> {
        None
    }
}

/// Outcome reported by the consent surface's update callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsentUpdate {
    Updated,
    Failed { reason: Option<String> },
}

/// Callback passed along with a consent-info update request.
#[derive(Clone)]
pub struct ConsentCallback {
    handler: Arc<dyn Fn(ConsentUpdate) + Send + Sync>,
}

impl ConsentCallback {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ConsentUpdate) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn on_updated(&self) {
        (self.handler)(ConsentUpdate::Updated);
    }

    pub fn on_failed(&self, reason: Option<String>) {
        (self.handler)(ConsentUpdate::Failed { reason });
    }
}

impl fmt::Debug for ConsentCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConsentCallback")
    }
}

/// Arguments for one of the update-request constructor shapes.
#[derive(Clone, Debug)]
pub struct ConsentRequest {
    pub shape: usize,
    pub args: Vec<Arg>,
}

/// Enum type plus the constant picked from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub enum_type: String,
    pub name: String,
}

/// The optional consent-management surface.
pub trait ConsentSurface: ProbeSurface {
    /// Parameter lists of the update-request constructors.
    fn request_shapes(&self) -> Vec<Vec<ParamType>>;

    /// Validate and construct a request for `shape`.
    fn build_request(&self, shape: usize, args: Vec<Arg>) -> Result<ConsentRequest, SdkFault>;

    fn request_update(&self, request: ConsentRequest, callback: ConsentCallback) -> Result<(), SdkFault>;

    /// `None` when the surface has no "can show ads" query.
    fn can_show_ads(&self) -> Option<bool>;

    /// Current status as text, `None` when not exposed.
    fn status(&self) -> Option<String>;

    /// Type name of the status enum, `None` when absent.
    fn status_type(&self) -> Option<String>;
}
