//! Check definitions and the built-in check tables.
//!
//! A [`CheckTable`] is an ordered list of uniquely named definitions. Table
//! order is the order results are reported in and the order class tokens
//! are appended to the document root.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::{DetectionError, Result};
use crate::value::Candidates;

/// Tokens that identify a mobile user agent.
pub const MOBILE_PATTERN: &str =
    "android|webos|iphone|ipad|ipod|blackberry|windows phone|iemobile";

/// `(name, pattern, negate)` for every built-in user agent check.
pub const USER_AGENT_CHECKS: &[(&str, &str, bool)] = &[
    ("IE", "msie|rv:11", false),
    ("IE7", "msie 7.0", false),
    ("IE8", "msie 8.0", false),
    ("IE9", "msie 9.0", false),
    ("IE10", "msie 10.0", false),
    ("IE11", "rv:11.0", false),
    ("oldIE", "msie 7.0|msie 8.0", false),
    ("iPad", "ipad", false),
    ("iPhone", "iphone", false),
    ("iPod", "ipod", false),
    ("iOS", "iphone|ipad|ipod", false),
    ("chrome", "chrome", false),
    ("firefox", "firefox", false),
    ("opera", "opera|opr", false),
    ("android", "android", false),
    ("mobile", MOBILE_PATTERN, false),
    ("desktop", MOBILE_PATTERN, true),
    ("windowsPhone", "windows phone", false),
    ("mac", "mac", false),
];

/// CSS property alias lists, standard name first.
pub const PROPERTY_CHECKS: &[(&str, &[&str])] = &[
    (
        "perspective",
        &[
            "perspective",
            "WebkitPerspective",
            "MozPerspective",
            "OPerspective",
            "msPerspective",
        ],
    ),
    (
        "transform",
        &[
            "transform",
            "WebkitTransform",
            "MozTransform",
            "OTransform",
            "msTransform",
        ],
    ),
    (
        "transition",
        &[
            "transition",
            "WebkitTransition",
            "MozTransition",
            "OTransition",
            "msTransition",
        ],
    ),
    ("willChange", &["willChange"]),
    (
        "animation",
        &["animation", "WebkitAnimation", "MozAnimation", "OAnimation"],
    ),
    ("objectFit", &["objectFit"]),
    ("objectPosition", &["objectPosition"]),
];

/// CSS unit literals tested against `width`.
pub const UNIT_CHECKS: &[(&str, &str)] = &[
    ("vw", "1vw"),
    ("vh", "1vh"),
    ("rem", "1rem"),
    ("vmin", "1vmin"),
    ("vmax", "1vmax"),
];

/// Vendor variants of `calc()`, most standard first.
pub const CALC_VARIANTS: &[&str] = &["calc", "-webkit-calc", "-moz-calc", "-o-calc"];

/// A compiled, case-insensitive user agent pattern.
#[derive(Debug, Clone)]
pub struct UaPattern {
    source: String,
    regex: Regex,
    negate: bool,
}

impl UaPattern {
    /// Compiles `source`; a negated pattern matches when `source` does not.
    pub fn new(source: &str, negate: bool) -> Result<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| DetectionError::InvalidPattern {
                pattern: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
            negate,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negate
    }

    #[must_use]
    pub fn matches(&self, user_agent: &str) -> bool {
        self.regex.is_match(user_agent) != self.negate
    }
}

/// Checks that don't fit the table-driven categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscProbe {
    /// "safari" in the user agent, and not "chrome".
    Safari,
    /// Device pixel ratio of at least 1.5.
    Retina,
    /// `HTMLPictureElement` exists.
    PictureElement,
    /// Images expose `srcset`.
    SrcsetBasic,
    /// Images expose `srcset` and `sizes`.
    SrcsetFull,
    /// A canvas 2D context is obtainable.
    Canvas,
    /// First accepted `calc()` variant.
    Calc,
}

impl MiscProbe {
    /// Built-in misc checks in reporting order.
    pub const ALL: [(&'static str, MiscProbe); 7] = [
        ("safari", MiscProbe::Safari),
        ("retina", MiscProbe::Retina),
        ("pictureElem", MiscProbe::PictureElement),
        ("srcsetBasic", MiscProbe::SrcsetBasic),
        ("srcsetFull", MiscProbe::SrcsetFull),
        ("canvas", MiscProbe::Canvas),
        ("calc", MiscProbe::Calc),
    ];
}

/// What a named check tests.
#[derive(Debug, Clone)]
pub enum CheckDefinition {
    UserAgent(UaPattern),
    CssProperty(Candidates),
    /// A value literal, tested against `property` (default `width`).
    CssValue {
        value: String,
        property: Option<String>,
    },
    Misc(MiscProbe),
}

/// A named entry of a [`CheckTable`].
#[derive(Debug, Clone)]
pub struct NamedCheck {
    pub name: String,
    pub definition: CheckDefinition,
}

/// Ordered table of uniquely named checks.
#[derive(Debug, Clone, Default)]
pub struct CheckTable {
    entries: Vec<NamedCheck>,
    names: HashSet<String>,
}

impl CheckTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table: misc probes, then properties, units and user agents.
    pub fn builtin() -> Result<Self> {
        let mut table = Self::new();

        for (name, probe) in MiscProbe::ALL {
            table.push(name, CheckDefinition::Misc(probe))?;
        }
        for (name, candidates) in PROPERTY_CHECKS {
            table.push(name, CheckDefinition::CssProperty(Candidates::from(*candidates)))?;
        }
        for (name, value) in UNIT_CHECKS {
            table.push(
                name,
                CheckDefinition::CssValue {
                    value: (*value).to_string(),
                    property: None,
                },
            )?;
        }
        for (name, pattern, negate) in USER_AGENT_CHECKS {
            table.push(name, CheckDefinition::UserAgent(UaPattern::new(pattern, *negate)?))?;
        }

        Ok(table)
    }

    /// Appends a check; a name already in the table is an error.
    pub fn push(&mut self, name: &str, definition: CheckDefinition) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(DetectionError::DuplicateCheck {
                name: name.to_string(),
            });
        }
        self.entries.push(NamedCheck {
            name: name.to_string(),
            definition,
        });
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedCheck> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for CheckTable {
    type Item = NamedCheck;
    type IntoIter = std::vec::IntoIter<NamedCheck>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
