//! Client - the queryable detection result
//!
//! Owns the detector, the memoized result table, the class annotator and
//! the frame scheduler. Built-in checks are registered unresolved at
//! construction and computed on first read.
//!
//! Lifecycle: `Probed` after construction, `Annotated` after the first
//! [`Client::set_classes`]. Querying without annotating is fine, and
//! annotating again is a no-op.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::annotate::{ClassAnnotator, RESERVED_NAMES};
use crate::cache::{ResultCache, ResultEntry};
use crate::checks::CheckTable;
use crate::config::DetectionConfig;
use crate::detector::Detector;
use crate::error::{DetectionError, Result};
use crate::frame::{FrameCallback, FrameId, FrameMode, FrameScheduler};
use crate::host::{ClassTarget, HostBindings};
use crate::value::{Candidates, CheckValue, Probe};

/// Where a client is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// All checks registered; classes not yet applied.
    Probed,
    /// Classes applied to the document root at least once.
    Annotated,
}

/// Feature and user agent detection results for one host.
pub struct Client {
    detector: Detector,
    cache: ResultCache,
    annotator: ClassAnnotator,
    root: Box<dyn ClassTarget>,
    frames: FrameScheduler,
    lifecycle: Lifecycle,
}

impl Client {
    /// Builds a client with the built-in checks and default options.
    pub fn new(host: HostBindings) -> Result<Self> {
        Self::with_config(host, &DetectionConfig::default())
    }

    /// Builds a client with built-in checks plus the configured extras.
    ///
    /// Name collisions and invalid patterns fail here, before any probe runs.
    pub fn with_config(host: HostBindings, config: &DetectionConfig) -> Result<Self> {
        let mut table = CheckTable::builtin()?;
        for (name, definition) in config.extra_checks()? {
            table.push(&name, definition)?;
        }

        let mut cache = ResultCache::new();
        for check in table {
            cache.memoize(&check.name, Probe::Check(check.definition))?;
        }
        for (name, value) in config.literal_tests()? {
            if cache.contains(&name) {
                return Err(DetectionError::DuplicateCheck { name });
            }
            cache.memoize(&name, Probe::Literal(value))?;
        }

        let mut client = Self {
            detector: Detector::new(host.environment),
            cache,
            annotator: ClassAnnotator::new(config.replace_no_js),
            root: host.root,
            frames: FrameScheduler::new(host.frames),
            lifecycle: Lifecycle::Probed,
        };
        debug!(
            checks = client.cache.len(),
            frames = ?client.frames.mode(),
            "detection client ready"
        );

        if config.auto_annotate {
            client.set_classes(true);
        }
        Ok(client)
    }

    #[must_use]
    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[must_use]
    pub fn frame_mode(&self) -> FrameMode {
        self.frames.mode()
    }

    /// Value of a named check, computing it on first access.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CheckValue> {
        self.cache.get(name, &self.detector)
    }

    /// Whether a named check resolved truthy; unknown names are `false`.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.get(name).is_some_and(CheckValue::is_truthy)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    /// Whether a named check has been computed yet.
    #[must_use]
    pub fn is_resolved(&self, name: &str) -> bool {
        self.cache.entry(name).is_some_and(ResultEntry::is_resolved)
    }

    /// Check names in result order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cache.entries().map(ResultEntry::name)
    }

    /// Every check resolved, in result order.
    pub fn results(&self) -> impl Iterator<Item = (&str, &CheckValue)> {
        self.cache
            .entries()
            .map(|entry| (entry.name(), entry.resolve(&self.detector)))
    }

    /// Resolved results as an ordered JSON object.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let map: Map<String, Value> = self
            .results()
            .map(|(name, value)| {
                let json = match value {
                    CheckValue::Flag(flag) => Value::Bool(*flag),
                    CheckValue::Variant(variant) => Value::String(variant.clone()),
                };
                (name.to_string(), json)
            })
            .collect();
        Value::Object(map)
    }

    /// Tests a case-insensitive pattern against the user agent.
    pub fn ua_check(&self, pattern: &str) -> Result<bool> {
        self.detector.matches_user_agent(pattern)
    }

    /// First supported CSS property among `candidates`.
    pub fn prop_check(&self, candidates: impl Into<Candidates>) -> CheckValue {
        let candidates = candidates.into();
        self.detector.first_supported_property(&candidates).into()
    }

    /// Alias of [`Client::prop_check`].
    pub fn css_check(&self, candidates: impl Into<Candidates>) -> CheckValue {
        self.prop_check(candidates)
    }

    /// Whether `value` is accepted for `property` (default `width`).
    #[must_use]
    pub fn val_check(&self, value: &str, property: Option<&str>) -> bool {
        self.detector.accepts_declaration(value, property)
    }

    /// Registers a custom check unless the name is taken; returns whether it was added.
    pub fn add_test(&mut self, name: &str, test: impl Into<Probe>) -> Result<bool> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(DetectionError::TypeArgument {
                context: "addTest".to_string(),
                expected: "a non-empty name without whitespace",
                found: format!("{name:?}"),
            });
        }
        if self.cache.contains(name) || RESERVED_NAMES.contains(&name) {
            return Ok(false);
        }
        self.cache.memoize(name, test.into())?;
        debug!(name, "registered custom check");
        Ok(true)
    }

    /// Adds a class for every truthy check to the document root.
    ///
    /// With `compute_uncached` false only checks already read contribute.
    /// Returns the tokens added by this call.
    pub fn set_classes(&mut self, compute_uncached: bool) -> Vec<String> {
        let detector = &self.detector;
        let results = self.cache.entries().filter_map(|entry| {
            let value = if compute_uncached {
                Some(entry.resolve(detector))
            } else {
                entry.cached()
            };
            value.map(|v| (entry.name(), v))
        });

        let current = self.root.class_name();
        let tokens = self
            .annotator
            .compute_class_tokens(results, RESERVED_NAMES, &current);
        self.annotator.apply_classes(self.root.as_mut(), &tokens);
        self.lifecycle = Lifecycle::Annotated;
        tokens
    }

    /// Current class attribute of the document root.
    #[must_use]
    pub fn root_class_name(&self) -> String {
        self.root.class_name()
    }

    /// Schedules `callback` for the next animation frame.
    pub fn request_anim_frame(&self, callback: impl FnOnce(f64) + 'static) -> FrameId {
        let callback: FrameCallback = Box::new(callback);
        self.frames.request(callback)
    }

    pub fn cancel_anim_frame(&self, id: FrameId) {
        self.frames.cancel(id);
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("detector", &self.detector)
            .field("checks", &self.cache.len())
            .field("lifecycle", &self.lifecycle)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

// ===== Conformance checks =====
// Shared by native tests and the browser harness.

/// Verify a desktop Chrome host resolves as Chrome, desktop and not Safari
pub fn verify_desktop_chrome(client: &Client) {
    assert!(client.is("chrome"), "Chrome should be detected");
    assert!(client.is("desktop"), "Chrome desktop should be desktop");
    assert!(!client.is("mobile"), "desktop and mobile are exclusive");
    assert!(!client.is("android"));
    assert!(!client.is("safari"), "Chrome excludes Safari");
}

/// Verify a named check is computed at most once
pub fn verify_memoization(client: &Client, name: &str) {
    let first = client.get(name).cloned();
    assert!(first.is_some(), "check {name} should exist");
    assert!(client.is_resolved(name));
    assert_eq!(client.get(name).cloned(), first, "cached value should not change");
}

/// Verify applying classes twice leaves the root unchanged the second time
pub fn verify_idempotent_classes(client: &mut Client) {
    let before = client.root_class_name();
    client.set_classes(true);
    let once = client.root_class_name();
    let added = client.set_classes(true);
    assert!(added.is_empty(), "second annotation should add nothing");
    assert_eq!(client.root_class_name(), once);
    for token in before.split_whitespace().filter(|t| *t != "no-js") {
        assert!(
            once.split_whitespace().any(|t| t == token),
            "existing class {token} should survive"
        );
    }
    assert_eq!(client.lifecycle(), Lifecycle::Annotated);
}

/// Run every conformance check against a desktop Chrome client
pub fn run_conformance_suite(client: &mut Client) {
    verify_desktop_chrome(client);
    verify_memoization(client, "chrome");
    verify_memoization(client, "calc");
    verify_idempotent_classes(client);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MockDocument;
    use crate::mock::{agents, MockBrowser, MockEnvironment};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn chrome() -> (MockBrowser, Client) {
        let browser = MockBrowser::chrome_desktop();
        let client = Client::new(browser.bindings()).unwrap();
        (browser, client)
    }

    // ===== Constructor tests =====

    #[test]
    fn test_client_new_is_lazy() {
        let (_browser, client) = chrome();
        assert_eq!(client.lifecycle(), Lifecycle::Probed);
        assert!(client.contains("chrome"));
        assert!(!client.is_resolved("chrome"));
        assert!(!client.is_resolved("calc"));
    }

    #[test]
    fn test_client_does_not_annotate_by_default() {
        let (browser, _client) = chrome();
        assert!(browser.document.class_writes().is_empty());
    }

    #[test]
    fn test_client_auto_annotate() {
        let browser = MockBrowser::chrome_desktop();
        let config = DetectionConfig {
            auto_annotate: true,
            ..DetectionConfig::default()
        };
        let client = Client::with_config(browser.bindings(), &config).unwrap();
        assert_eq!(client.lifecycle(), Lifecycle::Annotated);
        assert!(browser.document.root_has_class("chrome"));
    }

    #[test]
    fn test_client_config_collision() {
        let browser = MockBrowser::chrome_desktop();
        let config = DetectionConfig::from_json_str(r#"{"user_agents": {"chrome": "chrome"}}"#)
            .unwrap();
        let err = Client::with_config(browser.bindings(), &config).unwrap_err();
        assert!(matches!(err, DetectionError::DuplicateCheck { name } if name == "chrome"));
    }

    #[test]
    fn test_client_config_test_collision() {
        let browser = MockBrowser::chrome_desktop();
        let config = DetectionConfig::from_json_str(r#"{"tests": {"canvas": true}}"#).unwrap();
        assert!(Client::with_config(browser.bindings(), &config).is_err());
    }

    #[test]
    fn test_client_config_extras_appended() {
        let browser = MockBrowser::chrome_desktop();
        let config = DetectionConfig::from_json_str(
            r#"{"user_agents": {"windows": "windows nt"}, "tests": {"touch": false}}"#,
        )
        .unwrap();
        let client = Client::with_config(browser.bindings(), &config).unwrap();

        let names: Vec<&str> = client.names().collect();
        assert_eq!(&names[names.len() - 2..], &["windows", "touch"]);
        assert!(client.is("windows"));
        assert!(!client.is("touch"));
    }

    // ===== Query tests =====

    #[test]
    fn test_desktop_chrome_results() {
        let (_browser, client) = chrome();
        verify_desktop_chrome(&client);
        assert_eq!(client.get("calc"), Some(&CheckValue::Variant("calc".into())));
        assert_eq!(
            client.get("transform"),
            Some(&CheckValue::Variant("transform".into()))
        );
        assert!(client.is("vw"));
        assert!(!client.is("retina"));
        assert!(client.get("nope").is_none());
        assert!(!client.is("nope"));
    }

    #[test]
    fn test_get_resolves_only_requested() {
        let (_browser, client) = chrome();
        client.get("chrome");
        assert!(client.is_resolved("chrome"));
        assert!(!client.is_resolved("firefox"));
    }

    #[test]
    fn test_snapshot_order_and_shape() {
        let (_browser, client) = chrome();
        let snapshot = client.snapshot();
        let object = snapshot.as_object().unwrap();
        let keys: Vec<&String> = object.keys().collect();
        assert_eq!(keys[0], "safari");
        assert_eq!(object["calc"], Value::String("calc".into()));
        assert_eq!(object["chrome"], Value::Bool(true));
        assert_eq!(object.len(), client.names().count());
    }

    #[test]
    fn test_probe_functions() {
        let (_browser, client) = chrome();
        assert!(client.ua_check("windows nt|macintosh").unwrap());
        assert!(client.ua_check("(").is_err());
        assert_eq!(
            client.prop_check("fooBar objectFit"),
            CheckValue::Variant("objectFit".into())
        );
        assert_eq!(client.css_check(["nope"]), CheckValue::Flag(false));
        assert!(client.val_check("10px", None));
        assert!(!client.val_check("not-a-real-value-xyz", None));
    }

    // ===== addTest tests =====

    #[test]
    fn test_add_test_literal_and_computed() {
        let (_browser, mut client) = chrome();
        assert!(client.add_test("touch", false).unwrap());
        assert!(client
            .add_test("webkitCalc", Probe::computed(|d: &Detector| {
                d.accepts_declaration("-webkit-calc(1px)", None)
            }))
            .unwrap());

        assert!(!client.is("touch"));
        assert!(!client.is("webkitCalc"));
    }

    #[test]
    fn test_add_test_existing_name_ignored() {
        let (_browser, mut client) = chrome();
        assert!(!client.add_test("chrome", false).unwrap());
        assert!(client.is("chrome"));
        assert!(!client.add_test("setClasses", true).unwrap());
        assert!(!client.contains("setClasses"));
    }

    #[test]
    fn test_add_test_rejects_bad_name() {
        let (_browser, mut client) = chrome();
        assert!(matches!(
            client.add_test("two words", true),
            Err(DetectionError::TypeArgument { .. })
        ));
        assert!(client.add_test("", true).is_err());
    }

    #[test]
    fn test_add_test_memoized() {
        let (_browser, mut client) = chrome();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        client
            .add_test(
                "counted",
                Probe::computed(move |_| {
                    counter.set(counter.get() + 1);
                    true
                }),
            )
            .unwrap();

        client.set_classes(true);
        client.set_classes(true);
        assert!(client.is("counted"));
        assert_eq!(calls.get(), 1);
    }

    // ===== setClasses tests =====

    #[test]
    fn test_set_classes_desktop_chrome() {
        let browser = MockBrowser::chrome_desktop()
            .with_document(MockDocument::with_root_classes("no-js page"));
        let mut client = Client::new(browser.bindings()).unwrap();

        let added = client.set_classes(true);
        assert!(added.contains(&"chrome".to_string()));
        assert!(added.contains(&"desktop".to_string()));
        assert!(added.contains(&"calc".to_string()));
        for absent in ["safari", "mobile", "android", "mac", "retina", "ie"] {
            assert!(!added.contains(&absent.to_string()), "{absent} should be absent");
        }

        let classes = browser.document.root_class_name();
        assert!(classes.starts_with("js page "));
        assert!(!browser.document.root_has_class("no-js"));
    }

    #[test]
    fn test_set_classes_cached_only() {
        let (browser, mut client) = chrome();
        client.get("chrome");
        client.get("mobile");

        let added = client.set_classes(false);
        assert_eq!(added, vec!["chrome"]);
        assert_eq!(browser.document.root_class_name(), "chrome");
        assert!(!client.is_resolved("desktop"));
    }

    #[test]
    fn test_set_classes_leaves_spacing_alone_when_nothing_added() {
        let browser = MockBrowser::chrome_desktop()
            .with_document(MockDocument::with_root_classes("  a   b  "));
        let mut client = Client::new(browser.bindings()).unwrap();

        assert!(client.set_classes(false).is_empty());
        assert!(browser.document.class_writes().is_empty());
        assert_eq!(browser.document.root_class_name(), "  a   b  ");
    }

    #[test]
    fn test_set_classes_idempotent() {
        let browser = MockBrowser::iphone_safari()
            .with_document(MockDocument::with_root_classes("existing"));
        let mut client = Client::new(browser.bindings()).unwrap();
        verify_idempotent_classes(&mut client);
        assert_eq!(browser.document.class_writes().len(), 1);
        assert!(browser.document.root_has_class("retina"));
        assert!(browser.document.root_has_class("ios"));
    }

    #[test]
    fn test_conformance_suite() {
        let (_browser, mut client) = chrome();
        run_conformance_suite(&mut client);
    }

    // ===== Frame tests =====

    #[test]
    fn test_request_anim_frame_polyfill() {
        let browser = MockBrowser::ie8();
        let client = Client::new(browser.bindings()).unwrap();
        assert_eq!(client.frame_mode(), FrameMode::Polyfill);

        let stamps = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&stamps);
        browser.clock.set_now(1000.0);
        client.request_anim_frame(move |t| sink.borrow_mut().push(t));
        let sink = Rc::clone(&stamps);
        let id = client.request_anim_frame(move |t| sink.borrow_mut().push(t));
        client.cancel_anim_frame(id);

        browser.clock.advance(50.0);
        assert_eq!(*stamps.borrow(), vec![1000.0]);
    }

    #[test]
    fn test_request_anim_frame_native() {
        let (browser, client) = chrome();
        assert_eq!(client.frame_mode(), FrameMode::Native);
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        client.request_anim_frame(move |_| flag.set(true));
        browser.clock.advance(16.0);
        assert!(fired.get());
    }

    #[test]
    fn test_legacy_browser_has_no_css_classes() {
        let browser = MockBrowser::new(MockEnvironment::legacy(agents::IE8));
        let mut client = Client::new(browser.bindings()).unwrap();
        let added = client.set_classes(true);
        assert_eq!(added, vec!["ie", "ie8", "oldie", "desktop"]);
    }
}
