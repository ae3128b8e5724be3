//! Client and feature detection
//!
//! Probes the host browser's user agent, CSS property and unit support and a
//! handful of DOM capabilities, exposes the results as a queryable object and
//! optionally annotates the document root with matching class names.
//!
//! Architecture:
//! - All detection logic in pure Rust behind host traits (testable via cargo test)
//! - Mock DOM and mock browsers for browser-independent testing
//! - Thin `web-sys` binding layer behind the `wasm` feature

mod annotate;
mod cache;
mod checks;
mod client;
mod config;
mod detector;
mod dom;
mod error;
mod frame;
mod host;
pub mod mock;
mod value;

#[cfg(feature = "wasm")]
mod browser;

pub use annotate::{ClassAnnotator, RESERVED_NAMES};
pub use cache::{ResultCache, ResultEntry};
pub use checks::{
    CheckDefinition, CheckTable, MiscProbe, NamedCheck, UaPattern, CALC_VARIANTS, MOBILE_PATTERN,
    PROPERTY_CHECKS, UNIT_CHECKS, USER_AGENT_CHECKS,
};
pub use client::{
    run_conformance_suite, verify_desktop_chrome, verify_idempotent_classes, verify_memoization,
    Client, Lifecycle,
};
pub use config::{load_config, resolve_config_path, ConfigSource, DetectionConfig, ENV_CONFIG_PATH};
pub use detector::{Detector, DEFAULT_VALUE_PROPERTY, RETINA_PIXEL_RATIO};
pub use dom::{DomElement, MockDocument, MockStyleDeclaration, StyleSupport};
pub use error::{DetectionError, Result};
pub use frame::{
    FrameCallback, FrameHost, FrameId, FrameMode, FrameScheduler, TimerCallback, FRAME_INTERVAL_MS,
};
pub use host::{ClassTarget, Environment, HostBindings, NullStyle, StyleProbe};
pub use value::{Candidates, CheckValue, Probe, ProbeFn};

#[cfg(feature = "wasm")]
pub use browser::BrowserClient;
