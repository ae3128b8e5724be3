//! Mock DOM for browser-independent detection
//!
//! In-memory stand-ins for the pieces of the DOM the detector touches: the
//! document root whose class attribute is annotated, and the inline style
//! declaration of a detached scratch element.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::host::{ClassTarget, StyleProbe};

/// Represents a DOM element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DomElement {
    /// Element tag name
    pub tag: String,
    /// Element attributes
    pub attributes: BTreeMap<String, String>,
}

impl DomElement {
    /// Creates a new DOM element with the given tag
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    /// Sets the raw class attribute
    #[must_use]
    pub fn with_class_name(mut self, class_name: &str) -> Self {
        self.set_class_name(class_name);
        self
    }

    /// Gets an attribute value
    #[must_use]
    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Raw class attribute, empty when unset
    #[must_use]
    pub fn class_name(&self) -> &str {
        self.get_attr("class").unwrap_or_default()
    }

    pub fn set_class_name(&mut self, class_name: &str) {
        self.attributes
            .insert("class".to_string(), class_name.to_string());
    }

    /// Whitespace-delimited class tokens
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class_name().split_whitespace()
    }

    /// Checks if element has a class
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Debug)]
struct DocumentState {
    document_element: DomElement,
    class_writes: Vec<String>,
}

/// Shared handle to a mock document; clones observe the same state.
#[derive(Debug, Clone)]
pub struct MockDocument {
    state: Rc<RefCell<DocumentState>>,
}

impl Default for MockDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDocument {
    /// Creates a document with a bare `<html>` root
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(DomElement::new("html"))
    }

    #[must_use]
    fn with_root(document_element: DomElement) -> Self {
        Self {
            state: Rc::new(RefCell::new(DocumentState {
                document_element,
                class_writes: Vec::new(),
            })),
        }
    }

    /// Creates a document whose root starts with the given classes
    #[must_use]
    pub fn with_root_classes(class_name: &str) -> Self {
        Self::with_root(DomElement::new("html").with_class_name(class_name))
    }

    #[must_use]
    pub fn root_class_name(&self) -> String {
        self.state.borrow().document_element.class_name().to_string()
    }

    #[must_use]
    pub fn root_has_class(&self, class: &str) -> bool {
        self.state.borrow().document_element.has_class(class)
    }

    /// Every value written to the root's class attribute, oldest first
    #[must_use]
    pub fn class_writes(&self) -> Vec<String> {
        self.state.borrow().class_writes.clone()
    }
}

impl ClassTarget for MockDocument {
    fn class_name(&self) -> String {
        self.root_class_name()
    }

    fn set_class_name(&mut self, value: &str) {
        let mut state = self.state.borrow_mut();
        state.document_element.set_class_name(value);
        state.class_writes.push(value.to_string());
    }
}

/// CSS grammar a mock browser understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSupport {
    /// Camel-case property names present on the style object
    pub properties: BTreeSet<String>,
    /// Length units accepted after a number
    pub units: BTreeSet<String>,
    /// Functional notations accepted, e.g. `calc`
    pub functions: BTreeSet<String>,
}

const KEYWORDS: &[&str] = &["auto", "inherit", "initial", "unset", "none"];

impl StyleSupport {
    /// Whether `property: value` would be kept by this browser
    #[must_use]
    pub fn accepts(&self, property: &str, value: &str) -> bool {
        self.properties.contains(&camel_case(property)) && self.accepts_value(value.trim())
    }

    fn accepts_value(&self, value: &str) -> bool {
        if KEYWORDS.contains(&value) {
            return true;
        }

        if let Some(open) = value.find('(') {
            if !value.ends_with(')') {
                return false;
            }
            let name = &value[..open];
            let args = &value[open + 1..value.len() - 1];
            return self.functions.contains(name) && !args.trim().is_empty();
        }

        let split = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(value.len());
        let (number, unit) = value.split_at(split);
        match number.parse::<f64>() {
            Ok(n) if unit.is_empty() => n == 0.0,
            Ok(_) => self.units.contains(unit) || unit == "%",
            Err(_) => false,
        }
    }
}

/// `-webkit-transform` → `WebkitTransform`, `-ms-transform` → `msTransform`
fn camel_case(property: &str) -> String {
    let prefixed = property.starts_with('-');
    let mut out = String::with_capacity(property.len());
    for (i, segment) in property.trim_start_matches('-').split('-').enumerate() {
        let capitalize = i > 0 || (prefixed && segment != "ms");
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            if capitalize {
                out.extend(first.to_uppercase());
            } else {
                out.push(first);
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Inline style of a detached mock element
#[derive(Debug, Clone)]
pub struct MockStyleDeclaration {
    support: Rc<StyleSupport>,
    declarations: Vec<(String, String)>,
}

impl MockStyleDeclaration {
    #[must_use]
    pub fn new(support: Rc<StyleSupport>) -> Self {
        Self {
            support,
            declarations: Vec::new(),
        }
    }

    /// Accepted declarations from the last assignment
    #[must_use]
    pub fn declarations(&self) -> &[(String, String)] {
        &self.declarations
    }
}

impl StyleProbe for MockStyleDeclaration {
    fn has_property(&self, name: &str) -> bool {
        self.support.properties.contains(name)
    }

    fn set_css_text(&mut self, css_text: &str) {
        self.declarations = css_text
            .split(';')
            .filter_map(|declaration| declaration.split_once(':'))
            .map(|(property, value)| (property.trim().to_string(), value.trim().to_string()))
            .filter(|(property, value)| self.support.accepts(property, value))
            .collect();
    }

    fn declaration_count(&self) -> usize {
        self.declarations.len()
    }
}
