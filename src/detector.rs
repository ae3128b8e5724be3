//! Probe primitives.
//!
//! Three primitives cover every table-driven check:
//! - [`Detector::matches_user_agent`]: regex against the captured user agent
//! - [`Detector::first_supported_property`]: property existence on the scratch style
//! - [`Detector::accepts_declaration`]: value acceptance via inline style text
//!
//! `calc()` support and the misc probes are compositions of these plus
//! direct environment queries.

use std::cell::RefCell;

use tracing::trace;

use crate::checks::{CheckDefinition, MiscProbe, UaPattern, CALC_VARIANTS};
use crate::error::Result;
use crate::host::{Environment, StyleProbe};
use crate::value::{Candidates, CheckValue};

/// Property used by [`Detector::accepts_declaration`] when none is given.
pub const DEFAULT_VALUE_PROPERTY: &str = "width";

/// Pixel ratio from which a display counts as retina.
pub const RETINA_PIXEL_RATIO: f64 = 1.5;

/// Owns the captured user agent and the scratch style element.
pub struct Detector {
    user_agent: String,
    environment: Box<dyn Environment>,
    scratch: RefCell<Box<dyn StyleProbe>>,
}

impl Detector {
    /// Captures the user agent (lowercased) and creates the scratch element.
    pub fn new(environment: Box<dyn Environment>) -> Self {
        let user_agent = environment.user_agent().to_lowercase();
        let scratch = RefCell::new(environment.create_style_probe());
        Self {
            user_agent,
            environment,
            scratch,
        }
    }

    /// The lowercased user agent captured at construction.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Tests a caller-supplied, case-insensitive pattern against the user agent.
    pub fn matches_user_agent(&self, pattern: &str) -> Result<bool> {
        Ok(UaPattern::new(pattern, false)?.matches(&self.user_agent))
    }

    /// Returns the first candidate the scratch style knows, if any.
    pub fn first_supported_property<'a>(&self, candidates: &'a Candidates) -> Option<&'a str> {
        let style = self.scratch.borrow();
        candidates.iter().find(|name| style.has_property(name))
    }

    /// Assigns `<property>:<value>;` to the scratch style and reports whether
    /// any declaration was accepted.
    pub fn accepts_declaration(&self, value: &str, property: Option<&str>) -> bool {
        let property = property.unwrap_or(DEFAULT_VALUE_PROPERTY);
        let mut style = self.scratch.borrow_mut();
        style.set_css_text(&format!("{property}:{value};"));
        style.declaration_count() > 0
    }

    /// First accepted `calc()` variant.
    #[must_use]
    pub fn probe_calc(&self) -> Option<&'static str> {
        CALC_VARIANTS
            .iter()
            .copied()
            .find(|variant| self.accepts_declaration(&format!("{variant}(1px)"), None))
    }

    /// Chrome also reports "safari", so it is excluded first.
    #[must_use]
    pub fn is_safari(&self) -> bool {
        !self.user_agent.contains("chrome") && self.user_agent.contains("safari")
    }

    #[must_use]
    pub fn is_retina(&self) -> bool {
        self.environment.device_pixel_ratio() >= RETINA_PIXEL_RATIO
    }

    #[must_use]
    pub fn has_picture_element(&self) -> bool {
        self.environment.has_picture_element()
    }

    #[must_use]
    pub fn srcset_basic(&self) -> bool {
        self.environment.image_has_property("srcset")
    }

    #[must_use]
    pub fn srcset_full(&self) -> bool {
        self.srcset_basic() && self.environment.image_has_property("sizes")
    }

    #[must_use]
    pub fn has_canvas(&self) -> bool {
        self.environment.canvas_2d_context()
    }

    /// Evaluates a table definition.
    pub fn evaluate(&self, definition: &CheckDefinition) -> CheckValue {
        let value = match definition {
            CheckDefinition::UserAgent(pattern) => pattern.matches(&self.user_agent).into(),
            CheckDefinition::CssProperty(candidates) => {
                self.first_supported_property(candidates).into()
            }
            CheckDefinition::CssValue { value, property } => {
                self.accepts_declaration(value, property.as_deref()).into()
            }
            CheckDefinition::Misc(probe) => self.evaluate_misc(*probe),
        };
        trace!(?definition, %value, "evaluated check");
        value
    }

    fn evaluate_misc(&self, probe: MiscProbe) -> CheckValue {
        match probe {
            MiscProbe::Safari => self.is_safari().into(),
            MiscProbe::Retina => self.is_retina().into(),
            MiscProbe::PictureElement => self.has_picture_element().into(),
            MiscProbe::SrcsetBasic => self.srcset_basic().into(),
            MiscProbe::SrcsetFull => self.srcset_full().into(),
            MiscProbe::Canvas => self.has_canvas().into(),
            MiscProbe::Calc => self.probe_calc().into(),
        }
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}
