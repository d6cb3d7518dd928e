#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use adbridge_core::{AdFormat, BridgeCfg, CanonicalEvent, ParamType, ReturnKind, SdkFault, Signature, Value};
use adbridge_supervisor::{
    Activity, ActivityHandle, ActivityProvider, AdSupervisor, Arg, CallbackProxy, Collaborators, ConsentCallback,
    ConsentRequest, ConsentSurface, EventSink, InterstitialCallbacks, ManualDispatcher, MediationSdk, ProbeSurface,
    RewardedCallbacks,
};

pub const INIT_CALLBACK: &str = "ApdInitializationCallback";

// ---- activity ----

#[derive(Debug, Default)]
pub struct FakeActivity {
    pub finishing: AtomicBool,
    pub destroyed: AtomicBool,
}

impl ActivityHandle for FakeActivity {
    fn is_finishing(&self) -> bool {
        self.finishing.load(Ordering::SeqCst)
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeActivities {
    current: Mutex<Option<Arc<FakeActivity>>>,
    pub polls: AtomicUsize,
}

impl FakeActivities {
    pub fn with_activity() -> Self {
        let this = Self::default();
        this.set(Some(Arc::new(FakeActivity::default())));
        this
    }

    pub fn set(&self, activity: Option<Arc<FakeActivity>>) {
        *self.current.lock().unwrap() = activity;
    }

    pub fn get(&self) -> Option<Arc<FakeActivity>> {
        self.current.lock().unwrap().clone()
    }
}

impl ActivityProvider for FakeActivities {
    fn current_activity(&self) -> Option<Activity> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.get().map(|a| a as Activity)
    }
}

// ---- sink ----

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CanonicalEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<CanonicalEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.name()).collect()
    }

    pub fn init_events(&self) -> Vec<CanonicalEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, CanonicalEvent::Init { .. }))
            .collect()
    }

    pub fn last(&self) -> Option<CanonicalEvent> {
        self.events().last().cloned()
    }
}

impl EventSink for RecordingSink {
    fn deliver(&self, event: CanonicalEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ---- sdk ----

#[derive(Clone, Debug)]
pub struct Call {
    pub name: String,
    pub params: Vec<ParamType>,
    pub args: Vec<Arg>,
}

#[derive(Default)]
pub struct FakeSdk {
    methods: Vec<Signature>,
    enums: HashMap<String, Vec<String>>,
    failures: Mutex<Vec<(Signature, SdkFault)>>,
    calls: Mutex<Vec<Call>>,
    init_proxy: Mutex<Option<CallbackProxy>>,
    interstitial: Mutex<Option<Arc<dyn InterstitialCallbacks>>>,
    rewarded: Mutex<Option<Arc<dyn RewardedCallbacks>>>,
    pub registrations: AtomicUsize,
    pub testing: Mutex<Option<bool>>,
    pub loaded: AtomicBool,
    pub can_show: AtomicBool,
    pub show_fault: Mutex<Option<SdkFault>>,
    pub shows: Mutex<Vec<AdFormat>>,
    consent: Option<Arc<FakeConsent>>,
}

pub fn init_with_callback() -> Signature {
    Signature::new(
        "initialize",
        vec![
            ParamType::Context,
            ParamType::Str,
            ParamType::Int,
            ParamType::Interface(INIT_CALLBACK.into()),
        ],
    )
}

pub fn init_without_callback() -> Signature {
    Signature::new("initialize", vec![ParamType::Context, ParamType::Str, ParamType::Int])
}

impl FakeSdk {
    /// A release with both initialize overloads, `cache(int)`, enum log
    /// levels and auto-cache.
    pub fn modern() -> Self {
        let mut enums = HashMap::new();
        enums.insert(
            "LogLevel".to_string(),
            vec!["NONE".to_string(), "DEBUG".to_string(), "VERBOSE".to_string()],
        );
        Self {
            methods: vec![
                init_with_callback(),
                init_without_callback(),
                Signature::new("cache", vec![ParamType::Int]),
                Signature::new("setLogLevel", vec![ParamType::Enum("LogLevel".into())]),
                Signature::new("setAutoCache", vec![ParamType::Int, ParamType::Bool]),
                Signature::new("setUserConsent", vec![ParamType::Bool]),
            ],
            enums,
            can_show: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// An old release: three-argument initialize, context-taking cache and a
    /// string log level.
    pub fn legacy() -> Self {
        Self {
            methods: vec![
                Signature::new("initialize", vec![ParamType::Activity, ParamType::Str, ParamType::Int]),
                Signature::new("cache", vec![ParamType::Context, ParamType::Int]),
                Signature::new("setLogLevel", vec![ParamType::Str]),
            ],
            can_show: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn with_methods(mut self, methods: Vec<Signature>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_consent(mut self, consent: Arc<FakeConsent>) -> Self {
        self.consent = Some(consent);
        self
    }

    pub fn fail_on(&self, sig: Signature, fault: SdkFault) {
        self.failures.lock().unwrap().push((sig, fault));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_named(&self, name: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.name == name).collect()
    }

    /// Invoke the init callback proxy most recently handed to `initialize`.
    pub fn fire_init(&self, method: &str, args: Vec<Value>) -> Value {
        let proxy = self.init_proxy.lock().unwrap().clone().expect("no init callback registered");
        proxy.invoke(method, &args, ReturnKind::Void)
    }

    pub fn init_proxy(&self) -> Option<CallbackProxy> {
        self.init_proxy.lock().unwrap().clone()
    }

    pub fn interstitial_callbacks(&self) -> Arc<dyn InterstitialCallbacks> {
        self.interstitial.lock().unwrap().clone().expect("interstitial callbacks not registered")
    }

    pub fn rewarded_callbacks(&self) -> Arc<dyn RewardedCallbacks> {
        self.rewarded.lock().unwrap().clone().expect("rewarded callbacks not registered")
    }
}

impl ProbeSurface for FakeSdk {
    fn methods(&self) -> Vec<Signature> {
        self.methods.clone()
    }

    fn invoke(&self, signature: &Signature, args: Vec<Arg>) -> Result<Value, SdkFault> {
        self.calls.lock().unwrap().push(Call {
            name: signature.name.clone(),
            params: signature.params.clone(),
            args: args.clone(),
        });

        if let Some(cb) = args.iter().find_map(Arg::as_callback) {
            *self.init_proxy.lock().unwrap() = Some(cb.clone());
        }

        let failures = self.failures.lock().unwrap();
        match failures.iter().find(|(sig, _)| sig == signature) {
            Some((_, fault)) => Err(fault.clone()),
            None => Ok(Value::Void),
        }
    }

    fn enum_constants(&self, enum_type: &str) -> Vec<String> {
        self.enums.get(enum_type).cloned().unwrap_or_default()
    }
}

impl MediationSdk for FakeSdk {
    fn version(&self) -> Option<String> {
        Some("3.4.1".to_string())
    }

    fn set_testing(&self, testing: bool) -> Result<(), SdkFault> {
        *self.testing.lock().unwrap() = Some(testing);
        Ok(())
    }

    fn set_interstitial_callbacks(&self, callbacks: Arc<dyn InterstitialCallbacks>) -> Result<(), SdkFault> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.interstitial.lock().unwrap() = Some(callbacks);
        Ok(())
    }

    fn set_rewarded_callbacks(&self, callbacks: Arc<dyn RewardedCallbacks>) -> Result<(), SdkFault> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.rewarded.lock().unwrap() = Some(callbacks);
        Ok(())
    }

    fn is_loaded(&self, _format: AdFormat) -> Result<bool, SdkFault> {
        Ok(self.loaded.load(Ordering::SeqCst))
    }

    fn can_show(&self, _format: AdFormat) -> Result<bool, SdkFault> {
        Ok(self.can_show.load(Ordering::SeqCst))
    }

    fn show(&self, _activity: &Activity, format: AdFormat) -> Result<(), SdkFault> {
        self.shows.lock().unwrap().push(format);
        match self.show_fault.lock().unwrap().clone() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn consent(&self) -> Option<Arc<dyn ConsentSurface>> {
        self.consent.clone().map(|c| c as Arc<dyn ConsentSurface>)
    }
}

// ---- consent ----

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Keep the callback; the test answers through `FakeConsent::reply`.
    Never,
    Updated,
    Failed,
}

pub struct FakeConsent {
    pub shapes: Vec<Vec<ParamType>>,
    pub methods: Vec<Signature>,
    pub reply: Mutex<Reply>,
    pub can_show_ads: Mutex<Option<bool>>,
    pub status: Mutex<Option<String>>,
    requests: Mutex<Vec<ConsentRequest>>,
    callback: Mutex<Option<ConsentCallback>>,
    calls: Mutex<Vec<Call>>,
}

pub const STATUS_ENUM: &str = "ConsentStatus";

impl FakeConsent {
    pub fn new(reply: Reply) -> Self {
        Self {
            shapes: vec![vec![
                ParamType::Context,
                ParamType::Str,
                ParamType::Str,
                ParamType::Str,
                ParamType::Bool,
            ]],
            methods: vec![
                Signature::instance("setConsentStatus", vec![ParamType::Enum(STATUS_ENUM.into())]),
                Signature::new("requestConsentInfoUpdate", vec![ParamType::Class("Params".into())]),
            ],
            reply: Mutex::new(reply),
            can_show_ads: Mutex::new(None),
            status: Mutex::new(Some("Obtained".to_string())),
            requests: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_shapes(mut self, shapes: Vec<Vec<ParamType>>) -> Self {
        self.shapes = shapes;
        self
    }

    pub fn set_status(&self, status: Option<&str>) {
        *self.status.lock().unwrap() = status.map(str::to_string);
    }

    pub fn requests(&self) -> Vec<ConsentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Answer the pending request the way the surface would.
    pub fn reply(&self, updated: bool) {
        let cb = self.callback.lock().unwrap().clone().expect("no pending consent request");
        if updated {
            cb.on_updated();
        } else {
            cb.on_failed(Some("network".to_string()));
        }
    }
}

impl ProbeSurface for FakeConsent {
    fn methods(&self) -> Vec<Signature> {
        self.methods.clone()
    }

    fn invoke(&self, signature: &Signature, args: Vec<Arg>) -> Result<Value, SdkFault> {
        self.calls.lock().unwrap().push(Call {
            name: signature.name.clone(),
            params: signature.params.clone(),
            args,
        });
        Ok(Value::Void)
    }

    fn enum_constants(&self, enum_type: &str) -> Vec<String> {
        if enum_type == STATUS_ENUM {
            ["Unknown", "Required", "NotRequired", "Obtained"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            Vec::new()
        }
    }
}

impl ConsentSurface for FakeConsent {
    fn request_shapes(&self) -> Vec<Vec<ParamType>> {
        self.shapes.clone()
    }

    fn build_request(&self, shape: usize, args: Vec<Arg>) -> Result<ConsentRequest, SdkFault> {
        if shape >= self.shapes.len() {
            return Err(SdkFault::new("IllegalArgumentException"));
        }
        Ok(ConsentRequest { shape, args })
    }

    fn request_update(&self, request: ConsentRequest, callback: ConsentCallback) -> Result<(), SdkFault> {
        self.requests.lock().unwrap().push(request);
        *self.callback.lock().unwrap() = Some(callback.clone());
        match *self.reply.lock().unwrap() {
            Reply::Never => {}
            Reply::Updated => callback.on_updated(),
            Reply::Failed => callback.on_failed(None),
        }
        Ok(())
    }

    fn can_show_ads(&self) -> Option<bool> {
        *self.can_show_ads.lock().unwrap()
    }

    fn status(&self) -> Option<String> {
        self.status.lock().unwrap().clone()
    }

    fn status_type(&self) -> Option<String> {
        Some(STATUS_ENUM.to_string())
    }
}

// ---- harness ----

pub struct Harness {
    pub sdk: Arc<FakeSdk>,
    pub activities: Arc<FakeActivities>,
    pub dispatcher: Arc<ManualDispatcher>,
    pub sink: Arc<RecordingSink>,
    pub supervisor: AdSupervisor,
}

impl Harness {
    pub fn new(sdk: FakeSdk) -> Self {
        Self::with_activities(sdk, FakeActivities::with_activity())
    }

    pub fn with_activities(sdk: FakeSdk, activities: FakeActivities) -> Self {
        let sdk = Arc::new(sdk);
        let activities = Arc::new(activities);
        let dispatcher = Arc::new(ManualDispatcher::new());
        let sink = Arc::new(RecordingSink::default());
        let supervisor = AdSupervisor::new(
            Collaborators {
                sdk: sdk.clone(),
                activities: activities.clone(),
                dispatcher: dispatcher.clone(),
                sink: sink.clone(),
            },
            BridgeCfg::default(),
        );
        Self {
            sdk,
            activities,
            dispatcher,
            sink,
            supervisor,
        }
    }

    /// Initialize and run everything that is due right away.
    pub fn initialize(&self, testing: bool) {
        assert!(self.supervisor.initialize("app-key", testing, "debug"));
        self.dispatcher.run_ready();
    }

    pub fn advance(&self, ms: u64) {
        self.dispatcher.advance_ms(ms);
    }
}
