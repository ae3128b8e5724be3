//! Simulated browsers.
//!
//! [`MockEnvironment`] answers every [`Environment`] query from plain data,
//! [`MockClock`] is a virtual-time [`FrameHost`], and [`MockBrowser`] bundles
//! both with a [`MockDocument`] into ready-made [`HostBindings`].

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::dom::{MockDocument, MockStyleDeclaration, StyleSupport};
use crate::frame::{FrameCallback, FrameHost, FrameId, TimerCallback, FRAME_INTERVAL_MS};
use crate::host::{Environment, HostBindings, StyleProbe};

/// Real-world user agent strings.
pub mod agents {
    pub const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    pub const FIREFOX_DESKTOP: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";
    pub const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    pub const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    pub const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 12_2 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/12.1 Mobile/15E148 Safari/604.1";
    pub const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    pub const OPERA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 OPR/106.0.0.0";
    pub const IE8: &str = "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1; Trident/4.0)";
    pub const IE11: &str = "Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko";
    pub const WINDOWS_PHONE: &str = "Mozilla/5.0 (compatible; MSIE 10.0; Windows Phone 8.0; \
        Trident/6.0; IEMobile/10.0; ARM; Touch; NOKIA; Lumia 920)";
}

fn set_of(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

const MODERN_PROPERTIES: &[&str] = &[
    "width",
    "height",
    "perspective",
    "transform",
    "transition",
    "willChange",
    "animation",
    "objectFit",
    "objectPosition",
];
const MODERN_UNITS: &[&str] = &["px", "em", "rem", "vw", "vh", "vmin", "vmax"];
const LEGACY_PROPERTIES: &[&str] = &["width", "height"];
const LEGACY_UNITS: &[&str] = &["px", "em"];

/// Data-driven [`Environment`].
#[derive(Debug, Clone)]
pub struct MockEnvironment {
    pub user_agent: String,
    pub device_pixel_ratio: f64,
    pub picture_element: bool,
    pub image_properties: BTreeSet<String>,
    pub canvas_2d: bool,
    pub style: StyleSupport,
}

impl MockEnvironment {
    /// A browser with no optional capabilities.
    #[must_use]
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            device_pixel_ratio: 1.0,
            picture_element: false,
            image_properties: BTreeSet::new(),
            canvas_2d: false,
            style: StyleSupport::default(),
        }
    }

    /// Current evergreen capabilities: unprefixed properties, viewport units, `calc()`.
    #[must_use]
    pub fn modern(user_agent: &str) -> Self {
        let mut env = Self::new(user_agent);
        env.picture_element = true;
        env.image_properties = set_of(&["srcset", "sizes"]);
        env.canvas_2d = true;
        env.style = StyleSupport {
            properties: set_of(MODERN_PROPERTIES),
            units: set_of(MODERN_UNITS),
            functions: set_of(&["calc"]),
        };
        env
    }

    /// An old desktop browser: pixel and em lengths, nothing else.
    #[must_use]
    pub fn legacy(user_agent: &str) -> Self {
        let mut env = Self::new(user_agent);
        env.style = StyleSupport {
            properties: set_of(LEGACY_PROPERTIES),
            units: set_of(LEGACY_UNITS),
            functions: BTreeSet::new(),
        };
        env
    }

    #[must_use]
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: &str) -> Self {
        self.style.properties.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.style.units.insert(unit.to_string());
        self
    }

    #[must_use]
    pub fn with_function(mut self, name: &str) -> Self {
        self.style.functions.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_image_property(mut self, name: &str) -> Self {
        self.image_properties.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_picture_element(mut self, present: bool) -> Self {
        self.picture_element = present;
        self
    }

    #[must_use]
    pub fn with_canvas(mut self, present: bool) -> Self {
        self.canvas_2d = present;
        self
    }
}

impl Environment for MockEnvironment {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn create_style_probe(&self) -> Box<dyn StyleProbe> {
        Box::new(MockStyleDeclaration::new(Rc::new(self.style.clone())))
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn has_picture_element(&self) -> bool {
        self.picture_element
    }

    fn image_has_property(&self, name: &str) -> bool {
        self.image_properties.contains(name)
    }

    fn canvas_2d_context(&self) -> bool {
        self.canvas_2d
    }
}

struct PendingTimer {
    id: FrameId,
    due: f64,
    callback: TimerCallback,
}

#[derive(Default)]
struct ClockState {
    now: f64,
    next_id: u32,
    pending: Vec<PendingTimer>,
}

/// Virtual-time timers and frames; clones share one clock.
#[derive(Clone, Default)]
pub struct MockClock {
    state: Rc<RefCell<ClockState>>,
    native_frames: bool,
}

impl MockClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to report native `requestAnimationFrame` support.
    #[must_use]
    pub fn with_native_frames(mut self, native: bool) -> Self {
        self.native_frames = native;
        self
    }

    pub fn set_now(&self, now: f64) {
        self.state.borrow_mut().now = now;
    }

    #[must_use]
    pub fn now(&self) -> f64 {
        self.state.borrow().now
    }

    /// Number of timers not yet fired or cleared.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Moves time forward, firing each due timer with the clock set to its due time.
    pub fn advance(&self, ms: f64) {
        let target = self.now() + ms;
        while let Some(timer) = self.pop_due(target) {
            (timer.callback)();
        }
        self.set_now(target);
    }

    fn pop_due(&self, until: f64) -> Option<PendingTimer> {
        let mut state = self.state.borrow_mut();
        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(i, _)| i)?;
        let timer = state.pending.remove(index);
        state.now = state.now.max(timer.due);
        Some(timer)
    }

    fn schedule(&self, delay_ms: f64, callback: TimerCallback) -> FrameId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = FrameId(state.next_id);
        let due = state.now + delay_ms;
        state.pending.push(PendingTimer { id, due, callback });
        id
    }

    fn unschedule(&self, id: FrameId) {
        self.state.borrow_mut().pending.retain(|t| t.id != id);
    }
}

impl std::fmt::Debug for MockClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClock")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .field("native_frames", &self.native_frames)
            .finish()
    }
}

impl FrameHost for MockClock {
    fn has_native_frames(&self) -> bool {
        self.native_frames
    }

    fn request_native_frame(&self, callback: FrameCallback) -> FrameId {
        let stamp = self.now() + FRAME_INTERVAL_MS;
        self.schedule(FRAME_INTERVAL_MS, Box::new(move || callback(stamp)))
    }

    fn cancel_native_frame(&self, id: FrameId) {
        self.unschedule(id);
    }

    fn now_ms(&self) -> f64 {
        self.now()
    }

    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> FrameId {
        self.schedule(delay_ms, callback)
    }

    fn clear_timeout(&self, id: FrameId) {
        self.unschedule(id);
    }
}

/// A simulated browser: environment, document and clock.
#[derive(Debug, Clone)]
pub struct MockBrowser {
    pub environment: MockEnvironment,
    pub document: MockDocument,
    pub clock: MockClock,
}

impl MockBrowser {
    #[must_use]
    pub fn new(environment: MockEnvironment) -> Self {
        Self {
            environment,
            document: MockDocument::new(),
            clock: MockClock::new(),
        }
    }

    /// Desktop Chrome on a standard-density display.
    #[must_use]
    pub fn chrome_desktop() -> Self {
        Self::new(MockEnvironment::modern(agents::CHROME_DESKTOP)).with_native_frames(true)
    }

    /// iPhone Safari on a retina display.
    #[must_use]
    pub fn iphone_safari() -> Self {
        Self::new(MockEnvironment::modern(agents::SAFARI_IPHONE).with_pixel_ratio(3.0))
            .with_native_frames(true)
    }

    /// Internet Explorer 8: no prefixes, no units beyond px/em, no frames.
    #[must_use]
    pub fn ie8() -> Self {
        Self::new(MockEnvironment::legacy(agents::IE8))
    }

    #[must_use]
    pub fn with_document(mut self, document: MockDocument) -> Self {
        self.document = document;
        self
    }

    #[must_use]
    pub fn with_native_frames(mut self, native: bool) -> Self {
        self.clock = self.clock.with_native_frames(native);
        self
    }

    /// Host bindings sharing this browser's document and clock.
    #[must_use]
    pub fn bindings(&self) -> HostBindings {
        HostBindings {
            environment: Box::new(self.environment.clone()),
            root: Box::new(self.document.clone()),
            frames: Box::new(self.clock.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    // ===== MockEnvironment tests =====

    #[test]
    fn test_modern_environment() {
        let env = MockEnvironment::modern(agents::CHROME_DESKTOP);
        assert!(env.has_picture_element());
        assert!(env.image_has_property("sizes"));
        assert!(env.style.functions.contains("calc"));
    }

    #[test]
    fn test_legacy_environment() {
        let env = MockEnvironment::legacy(agents::IE8);
        assert!(!env.canvas_2d_context());
        assert!(env.style.properties.contains("width"));
        assert!(!env.style.units.contains("vw"));
    }

    #[test]
    fn test_environment_builders() {
        let env = MockEnvironment::new(agents::IE11)
            .with_unit("rem")
            .with_canvas(true)
            .with_picture_element(true)
            .with_pixel_ratio(2.0);
        assert!(env.style.units.contains("rem"));
        assert!(env.canvas_2d_context());
        assert!(env.has_picture_element());
        assert_eq!(env.device_pixel_ratio(), 2.0);
    }

    #[test]
    fn test_style_probes_are_independent() {
        let env = MockEnvironment::modern(agents::CHROME_DESKTOP);
        let mut first = env.create_style_probe();
        let second = env.create_style_probe();
        first.set_css_text("width:1px;");
        assert_eq!(first.declaration_count(), 1);
        assert_eq!(second.declaration_count(), 0);
    }

    // ===== MockClock tests =====

    #[test]
    fn test_clock_fires_in_due_order() {
        let clock = MockClock::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (label, delay) in [("b", 20.0), ("a", 10.0), ("c", 30.0)] {
            let order = Rc::clone(&order);
            clock.set_timeout(delay, Box::new(move || order.borrow_mut().push(label)));
        }

        clock.advance(25.0);
        assert_eq!(*order.borrow(), vec!["a", "b"]);
        assert_eq!(clock.pending(), 1);

        clock.advance(5.0);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clock_callback_can_reschedule() {
        let clock = MockClock::new();
        let fired = Rc::new(Cell::new(0));

        let inner_clock = clock.clone();
        let inner_fired = Rc::clone(&fired);
        clock.set_timeout(
            5.0,
            Box::new(move || {
                inner_fired.set(inner_fired.get() + 1);
                let again = Rc::clone(&inner_fired);
                inner_clock.set_timeout(1.0, Box::new(move || again.set(again.get() + 1)));
            }),
        );

        clock.advance(10.0);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_clock_clear_timeout() {
        let clock = MockClock::new();
        let id = clock.set_timeout(1.0, Box::new(|| panic!("cleared timer fired")));
        clock.clear_timeout(id);
        clock.advance(5.0);
        assert_eq!(clock.pending(), 0);
    }

    // ===== MockBrowser tests =====

    #[test]
    fn test_browser_bindings_share_document() {
        let browser = MockBrowser::chrome_desktop();
        let mut bindings = browser.bindings();
        bindings.root.set_class_name("chrome");
        assert_eq!(browser.document.root_class_name(), "chrome");
        assert!(bindings.frames.has_native_frames());
    }

    #[test]
    fn test_browser_presets() {
        assert!(MockBrowser::iphone_safari().environment.device_pixel_ratio >= 1.5);
        assert!(!MockBrowser::ie8().clock.has_native_frames());
    }
}
