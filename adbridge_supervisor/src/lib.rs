//! adbridge_supervisor
//!
//! Outside-world facing orchestration layer for `adbridge_core`.
//!
//! Responsibilities:
//! - define the collaborator traits (SDK surface, consent surface, activity
//!   host, event sink, dispatcher)
//! - negotiate and invoke version-dependent SDK overloads
//! - gate ad requests on consent readiness
//! - normalize SDK callbacks into canonical events
//! - drive the init and show state machines
//!
//! Non-goals:
//! - no IO
//! - no threads (all deferred work goes through a `Dispatcher`)
//! - no policy constants (live in `BridgeCfg`)

pub mod adapter;
pub mod consent;
pub mod dispatch;
pub mod invoker;
pub mod normalizer;
pub mod state;
pub mod supervisor;
pub mod warmup;

pub use adapter::{
    Activity, ActivityHandle, ActivityProvider, Arg, CallbackProxy, ConsentCallback, ConsentRequest, ConsentSurface,
    ConsentUpdate, EnumValue, EventSink, InterstitialCallbacks, MediationSdk, ProbeSurface, RewardedCallbacks,
};
pub use consent::ConsentGate;
pub use dispatch::{Dispatcher, ManualDispatcher, Task};
pub use invoker::{build_args, invoke_first, setter_args, Bindings};
pub use normalizer::EventNormalizer;
pub use state::{BridgeState, BridgeStatus};
pub use supervisor::{AdSupervisor, Collaborators};
pub use warmup::CacheWarmup;
