mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use adbridge_core::{BridgeCfg, ParamType};
use adbridge_supervisor::{Activity, Arg, ConsentGate, ConsentSurface, Dispatcher, ManualDispatcher};
use common::{FakeActivity, FakeConsent, Reply};

struct Fixture {
    dispatcher: Arc<ManualDispatcher>,
    gate: ConsentGate,
    activity: Activity,
    completions: Arc<AtomicUsize>,
}

impl Fixture {
    fn new(surface: Option<Arc<FakeConsent>>) -> Self {
        let dispatcher = Arc::new(ManualDispatcher::new());
        let surface = surface.map(|s| s as Arc<dyn ConsentSurface>);
        let gate = ConsentGate::new(surface, dispatcher.clone() as Arc<dyn Dispatcher>, BridgeCfg::default());
        Self {
            dispatcher,
            gate,
            activity: Arc::new(FakeActivity::default()),
            completions: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn request(&self) {
        let counter = self.completions.clone();
        self.gate.request_update(
            Some(&self.activity),
            Some("app-key"),
            "3.4.1",
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
    }

    fn completed(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[test]
fn absent_surface_is_ready_and_completes_immediately() {
    let f = Fixture::new(None);
    assert!(f.gate.is_ready());
    assert!(!f.gate.is_available());

    f.request();
    assert_eq!(f.completed(), 0, "completion is posted, not run inline");
    f.dispatcher.run_ready();
    assert_eq!(f.completed(), 1);
}

#[test]
fn never_updated_is_not_ready() {
    let f = Fixture::new(Some(Arc::new(FakeConsent::new(Reply::Never))));
    assert!(!f.gate.is_ready());
}

#[test]
fn timeout_completes_exactly_once() {
    let consent = Arc::new(FakeConsent::new(Reply::Never));
    let f = Fixture::new(Some(consent.clone()));

    f.request();
    f.advance_and_check(4_999, 0);
    f.advance_and_check(1, 1);

    // a late reply updates state but does not complete again
    consent.reply(true);
    f.dispatcher.run_ready();
    assert_eq!(f.completed(), 1);
    assert!(f.gate.is_ready());
}

#[test]
fn reply_beats_timeout() {
    let consent = Arc::new(FakeConsent::new(Reply::Never));
    let f = Fixture::new(Some(consent.clone()));

    f.request();
    consent.reply(true);
    f.dispatcher.run_ready();
    assert_eq!(f.completed(), 1);

    f.advance_and_check(5_000, 1);
}

#[test]
fn failed_reply_clears_update_flag() {
    let consent = Arc::new(FakeConsent::new(Reply::Updated));
    let f = Fixture::new(Some(consent.clone()));
    f.request();
    assert!(f.gate.state().info_updated);

    *consent.reply.lock().unwrap() = Reply::Failed;
    f.request();
    f.dispatcher.run_ready();
    assert!(!f.gate.state().info_updated);
    assert!(!f.gate.is_ready());
    assert_eq!(f.completed(), 2);
}

#[test]
fn readiness_follows_surface_answers() {
    let consent = Arc::new(FakeConsent::new(Reply::Updated));
    let f = Fixture::new(Some(consent.clone()));
    f.request();
    assert!(f.gate.is_ready());

    *consent.can_show_ads.lock().unwrap() = Some(false);
    assert!(!f.gate.is_ready());

    *consent.can_show_ads.lock().unwrap() = Some(true);
    consent.set_status(Some("UNKNOWN"));
    assert!(!f.gate.is_ready());

    consent.set_status(None);
    assert!(f.gate.is_ready());

    f.gate.reset();
    assert!(!f.gate.is_ready());
}

#[test]
fn request_arguments_follow_constructor_shape() {
    let consent = Arc::new(FakeConsent::new(Reply::Never).with_shapes(vec![vec![
        ParamType::Activity,
        ParamType::Str,
        ParamType::Str,
        ParamType::Str,
        ParamType::Str,
        ParamType::BoxedBool,
    ]]));
    let f = Fixture::new(Some(consent.clone()));
    f.request();

    let req = &consent.requests()[0];
    let strings: Vec<&str> = req.args.iter().filter_map(Arg::as_str).collect();
    assert_eq!(strings, vec!["app-key", "Appodeal", "3.4.1", ""]);
    assert!(matches!(req.args[0], Arg::Activity(_)));
    assert!(matches!(req.args[5], Arg::Bool(false)));
}

#[test]
fn first_buildable_shape_wins() {
    let consent = Arc::new(FakeConsent::new(Reply::Never).with_shapes(vec![
        vec![ParamType::Class("Builder".into())],
        vec![ParamType::Context, ParamType::Str],
    ]));
    let f = Fixture::new(Some(consent.clone()));
    f.request();

    let reqs = consent.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].shape, 1);
}

#[test]
fn unbuildable_request_completes_without_state_change() {
    let consent = Arc::new(
        FakeConsent::new(Reply::Updated).with_shapes(vec![vec![ParamType::Class("Builder".into())]]),
    );
    let f = Fixture::new(Some(consent.clone()));

    f.request();
    f.dispatcher.run_ready();
    assert_eq!(f.completed(), 1);
    assert!(consent.requests().is_empty());
    assert!(!f.gate.state().info_updated);
    // no timeout left behind
    assert_eq!(f.dispatcher.pending(), 0);
}

#[test]
fn blank_key_skips_request() {
    let consent = Arc::new(FakeConsent::new(Reply::Updated));
    let f = Fixture::new(Some(consent.clone()));

    f.gate
        .request_update(Some(&f.activity), Some("  "), "3.4.1", Box::new(|| {}));
    assert!(consent.requests().is_empty());
    assert_eq!(f.dispatcher.pending(), 1);
}

impl Fixture {
    fn advance_and_check(&self, ms: u64, expected: usize) {
        self.dispatcher.advance_ms(ms);
        assert_eq!(self.completed(), expected);
    }
}
