//! Host environment seams.
//!
//! The detector never talks to a browser directly. Everything it needs is
//! behind these traits so the same logic runs against `web-sys` in the
//! browser and against [`crate::mock`] in tests and on the command line.

use crate::frame::FrameHost;

/// Read-only capabilities of the host browser.
pub trait Environment {
    /// The raw user agent string.
    fn user_agent(&self) -> String;

    /// Creates the detached scratch element used for style probes.
    fn create_style_probe(&self) -> Box<dyn StyleProbe>;

    fn device_pixel_ratio(&self) -> f64;

    /// Whether the `<picture>` element constructor exists.
    fn has_picture_element(&self) -> bool;

    /// Whether an image element exposes the named property (`srcset`, `sizes`).
    fn image_has_property(&self, name: &str) -> bool;

    /// Whether a canvas element hands out a 2D context.
    fn canvas_2d_context(&self) -> bool;
}

/// Inline style of the scratch element.
pub trait StyleProbe {
    /// Whether the style object knows the camel-case property at all.
    fn has_property(&self, name: &str) -> bool;

    /// Replaces the inline style text.
    fn set_css_text(&mut self, css_text: &str);

    /// Number of declarations accepted from the last assignment.
    fn declaration_count(&self) -> usize;
}

/// The element whose class attribute gets annotated, normally `<html>`.
pub trait ClassTarget {
    fn class_name(&self) -> String;

    fn set_class_name(&mut self, value: &str);
}

/// Style probe used when no scratch element can be created.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStyle;

impl StyleProbe for NullStyle {
    fn has_property(&self, _name: &str) -> bool {
        false
    }

    fn set_css_text(&mut self, _css_text: &str) {}

    fn declaration_count(&self) -> usize {
        0
    }
}

/// Everything a [`crate::Client`] needs from its host.
pub struct HostBindings {
    pub environment: Box<dyn Environment>,
    pub root: Box<dyn ClassTarget>,
    pub frames: Box<dyn FrameHost>,
}

impl std::fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBindings").finish_non_exhaustive()
    }
}
