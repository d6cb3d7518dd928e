pub mod capability;
pub mod consent;
pub mod value;

pub mod cfg;
pub mod event;
pub mod fault;
pub mod flow;
pub mod latch;
pub mod normalize;

pub use capability::{
    find_exact, find_unary, mentioning, outcome_setters, probe, CapabilityDescriptor, ParamRole, ParamType,
    ResolvedCall, Signature,
};
pub use consent::{pick_constant, status_blocks_ads, ConsentState, SETTER_ENUM_PREFERENCE, STATUS_PREFERENCE};
pub use value::{ReturnKind, Value};

pub use cfg::{BridgeCfg, LogLevel};
pub use event::{AdEvent, AdFormat, CanonicalEvent};
pub use fault::SdkFault;
pub use flow::{step_init, step_show, InitEffect, InitInput, InitPhase, ShowEffect, ShowInput, ShowPhase};
pub use latch::{CycleLatch, OneShot};
pub use normalize::{
    finished_payload, init_outcome, is_recoverable_init_reason, ClosedVerdict, InitCallbackMethod, InitOutcome,
    RewardedSession,
};
