//! Browser WASM bindings for detection
//!
//! `web-sys` implementations of the host traits and the JS-facing result
//! object. All detection logic lives in [`crate::Client`]; this is just the
//! binding layer.

use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, CssStyleDeclaration, Document, HtmlCanvasElement, HtmlElement, Window};

use crate::client::Client;
use crate::config::DetectionConfig;
use crate::detector::Detector;
use crate::error::DetectionError;
use crate::frame::{FrameCallback, FrameHost, FrameId, TimerCallback};
use crate::host::{ClassTarget, Environment, HostBindings, NullStyle, StyleProbe};
use crate::value::{Candidates, CheckValue, Probe};

const REQUEST_FRAME_NAMES: &[&str] = &[
    "requestAnimationFrame",
    "webkitRequestAnimationFrame",
    "mozRequestAnimationFrame",
];
const CANCEL_FRAME_NAMES: &[&str] = &[
    "cancelAnimationFrame",
    "webkitCancelRequestAnimationFrame",
    "mozCancelRequestAnimationFrame",
];

fn to_js(err: DetectionError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn is_defined(target: &JsValue, key: &str) -> bool {
    Reflect::get(target, &JsValue::from_str(key))
        .map(|v| !v.is_undefined())
        .unwrap_or(false)
}

fn js_kind(value: &JsValue) -> String {
    value.js_typeof().as_string().unwrap_or_default()
}

fn type_error(context: &str, expected: &'static str, found: &JsValue) -> JsValue {
    to_js(DetectionError::TypeArgument {
        context: context.to_string(),
        expected,
        found: js_kind(found),
    })
}

fn check_value_to_js(value: &CheckValue) -> JsValue {
    match value {
        CheckValue::Flag(flag) => JsValue::from_bool(*flag),
        CheckValue::Variant(name) => JsValue::from_str(name),
    }
}

fn candidates_from_js(context: &str, value: &JsValue) -> Result<Candidates, JsValue> {
    if let Some(list) = value.as_string() {
        return Ok(Candidates::from(list.as_str()));
    }
    if Array::is_array(value) {
        let array: &Array = value.unchecked_ref();
        return array
            .iter()
            .map(|item| {
                item.as_string()
                    .ok_or_else(|| type_error(context, "an array of strings", &item))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Candidates::from);
    }
    Err(type_error(context, "a string or an array of strings", value))
}

#[derive(Debug, Clone)]
struct WebEnvironment {
    window: Window,
    document: Document,
}

impl Environment for WebEnvironment {
    fn user_agent(&self) -> String {
        self.window.navigator().user_agent().unwrap_or_default()
    }

    fn create_style_probe(&self) -> Box<dyn StyleProbe> {
        match self
            .document
            .create_element("div")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            Some(div) => Box::new(WebStyle { style: div.style() }),
            None => {
                tracing::warn!("could not create scratch element; style probes disabled");
                Box::new(NullStyle)
            }
        }
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn has_picture_element(&self) -> bool {
        is_defined(&self.window, "HTMLPictureElement")
    }

    fn image_has_property(&self, name: &str) -> bool {
        web_sys::HtmlImageElement::new()
            .map(|img| is_defined(&img, name))
            .unwrap_or(false)
    }

    fn canvas_2d_context(&self) -> bool {
        self.document
            .create_element("canvas")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
            .and_then(|canvas| canvas.get_context("2d").ok().flatten())
            .is_some()
    }
}

struct WebStyle {
    style: CssStyleDeclaration,
}

impl StyleProbe for WebStyle {
    fn has_property(&self, name: &str) -> bool {
        is_defined(&self.style, name)
    }

    fn set_css_text(&mut self, css_text: &str) {
        self.style.set_css_text(css_text);
    }

    fn declaration_count(&self) -> usize {
        self.style.length() as usize
    }
}

struct WebRoot {
    document: Document,
}

impl ClassTarget for WebRoot {
    fn class_name(&self) -> String {
        self.document
            .document_element()
            .map(|el| el.class_name())
            .unwrap_or_default()
    }

    fn set_class_name(&mut self, value: &str) {
        if let Some(el) = self.document.document_element() {
            el.set_class_name(value);
        }
    }
}

struct WebFrames {
    window: Window,
    request: Option<Function>,
    cancel: Option<Function>,
}

impl WebFrames {
    fn new(window: Window) -> Self {
        let lookup = |names: &[&str]| {
            names.iter().find_map(|name| {
                Reflect::get(&window, &JsValue::from_str(name))
                    .ok()
                    .and_then(|v| v.dyn_into::<Function>().ok())
            })
        };
        let request = lookup(REQUEST_FRAME_NAMES);
        let cancel = lookup(CANCEL_FRAME_NAMES);
        Self {
            window,
            request,
            cancel,
        }
    }
}

fn frame_id(value: Result<JsValue, JsValue>) -> FrameId {
    match value {
        Ok(id) => FrameId(id.as_f64().unwrap_or_default() as u32),
        Err(err) => {
            tracing::warn!(?err, "frame request failed");
            FrameId(0)
        }
    }
}

impl FrameHost for WebFrames {
    fn has_native_frames(&self) -> bool {
        self.request.is_some() && self.cancel.is_some()
    }

    fn request_native_frame(&self, callback: FrameCallback) -> FrameId {
        let Some(request) = &self.request else {
            return FrameId(0);
        };
        let closure = Closure::once_into_js(move |stamp: f64| callback(stamp));
        frame_id(request.call1(&self.window, &closure))
    }

    fn cancel_native_frame(&self, id: FrameId) {
        if let Some(cancel) = &self.cancel {
            let _ = cancel.call1(&self.window, &JsValue::from(id.0));
        }
    }

    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> FrameId {
        let closure = Closure::once_into_js(move || callback());
        let id = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.unchecked_ref(),
                delay_ms.round() as i32,
            )
            .map(JsValue::from);
        frame_id(id)
    }

    fn clear_timeout(&self, id: FrameId) {
        self.window.clear_timeout_with_handle(id.0 as i32);
    }
}

fn optional_string(context: &str, value: &JsValue) -> Result<Option<String>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    value
        .as_string()
        .map(Some)
        .ok_or_else(|| type_error(context, "a string", value))
}

fn set_method(target: &Object, name: &str, method: JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(name), &method).map(|_| ())
}

/// The `this` JS custom tests run with: the probe functions over their own
/// scratch element. It does not expose other results.
fn test_context(environment: WebEnvironment) -> Result<Object, JsValue> {
    let detector = Rc::new(Detector::new(Box::new(environment)));
    let context = Object::new();

    let d = Rc::clone(&detector);
    let ua_check = Closure::wrap(Box::new(move |pattern: JsValue| {
        let pattern = pattern
            .as_string()
            .ok_or_else(|| type_error("uaCheck", "a string", &pattern))?;
        d.matches_user_agent(&pattern)
            .map(JsValue::from_bool)
            .map_err(to_js)
    }) as Box<dyn Fn(JsValue) -> Result<JsValue, JsValue>>);
    set_method(&context, "uaCheck", ua_check.into_js_value())?;

    for name in ["propCheck", "cssCheck"] {
        let d = Rc::clone(&detector);
        let prop_check = Closure::wrap(Box::new(move |candidates: JsValue| {
            let candidates = candidates_from_js(name, &candidates)?;
            let value = CheckValue::from(d.first_supported_property(&candidates));
            Ok(check_value_to_js(&value))
        }) as Box<dyn Fn(JsValue) -> Result<JsValue, JsValue>>);
        set_method(&context, name, prop_check.into_js_value())?;
    }

    let d = Rc::clone(&detector);
    let val_check = Closure::wrap(Box::new(move |value: JsValue, property: JsValue| {
        let value = value
            .as_string()
            .ok_or_else(|| type_error("valCheck", "a string", &value))?;
        let property = optional_string("valCheck", &property)?;
        Ok(JsValue::from_bool(
            d.accepts_declaration(&value, property.as_deref()),
        ))
    }) as Box<dyn Fn(JsValue, JsValue) -> Result<JsValue, JsValue>>);
    set_method(&context, "valCheck", val_check.into_js_value())?;

    Ok(context)
}

/// Browser detection client - the `window.client` object
#[derive(Debug)]
#[wasm_bindgen]
pub struct BrowserClient {
    client: Client,
    environment: WebEnvironment,
    test_context: Option<Object>,
}

#[wasm_bindgen]
impl BrowserClient {
    /// Probe the current page; annotates `<html>` unless `auto_annotate` is false
    #[wasm_bindgen(constructor)]
    pub fn new(auto_annotate: Option<bool>) -> Result<BrowserClient, JsValue> {
        console_error_panic_hook::set_once();

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document"))?;

        let environment = WebEnvironment {
            window: window.clone(),
            document: document.clone(),
        };
        let host = HostBindings {
            environment: Box::new(environment.clone()),
            root: Box::new(WebRoot { document }),
            frames: Box::new(WebFrames::new(window)),
        };
        let config = DetectionConfig {
            auto_annotate: auto_annotate.unwrap_or(true),
            ..DetectionConfig::default()
        };
        let client = Client::with_config(host, &config).map_err(to_js)?;
        Ok(Self {
            client,
            environment,
            test_context: None,
        })
    }

    fn test_context(&mut self) -> Result<Object, JsValue> {
        if let Some(context) = &self.test_context {
            return Ok(context.clone());
        }
        let context = test_context(self.environment.clone())?;
        self.test_context = Some(context.clone());
        Ok(context)
    }

    /// Value of a named check: boolean, variant string, or undefined
    pub fn get(&self, name: &str) -> JsValue {
        self.client
            .get(name)
            .map(check_value_to_js)
            .unwrap_or(JsValue::UNDEFINED)
    }

    #[wasm_bindgen(js_name = uaCheck)]
    pub fn ua_check(&self, pattern: JsValue) -> Result<bool, JsValue> {
        let pattern = pattern
            .as_string()
            .ok_or_else(|| type_error("uaCheck", "a string", &pattern))?;
        self.client.ua_check(&pattern).map_err(to_js)
    }

    #[wasm_bindgen(js_name = propCheck)]
    pub fn prop_check(&self, candidates: JsValue) -> Result<JsValue, JsValue> {
        let candidates = candidates_from_js("propCheck", &candidates)?;
        Ok(check_value_to_js(&self.client.prop_check(candidates)))
    }

    #[wasm_bindgen(js_name = cssCheck)]
    pub fn css_check(&self, candidates: JsValue) -> Result<JsValue, JsValue> {
        let candidates = candidates_from_js("cssCheck", &candidates)?;
        Ok(check_value_to_js(&self.client.css_check(candidates)))
    }

    #[wasm_bindgen(js_name = valCheck)]
    pub fn val_check(&self, value: &str, property: Option<String>) -> bool {
        self.client.val_check(value, property.as_deref())
    }

    /// Register a boolean or zero-argument function as a named check
    ///
    /// A function runs with `this` carrying `uaCheck`, `propCheck`,
    /// `cssCheck` and `valCheck`. One that throws is reported as `false`.
    #[wasm_bindgen(js_name = addTest)]
    pub fn add_test(&mut self, name: &str, test: JsValue) -> Result<bool, JsValue> {
        let probe = if let Some(flag) = test.as_bool() {
            Probe::from(flag)
        } else if let Some(f) = test.dyn_ref::<Function>() {
            let f = f.clone();
            let context = self.test_context()?;
            let check = name.to_string();
            Probe::computed(move |_| match f.call0(&context) {
                Ok(value) => value.is_truthy(),
                Err(err) => {
                    tracing::warn!(name = %check, ?err, "custom test threw");
                    false
                }
            })
        } else {
            return Err(type_error("addTest", "a boolean or a function", &test));
        };
        self.client.add_test(name, probe).map_err(to_js)
    }

    /// Annotate `<html>`; returns the space-separated classes added
    #[wasm_bindgen(js_name = setClasses)]
    pub fn set_classes(&mut self, compute_uncached: Option<bool>) -> String {
        self.client
            .set_classes(compute_uncached.unwrap_or(true))
            .join(" ")
    }

    #[wasm_bindgen(js_name = requestAnimFrame)]
    pub fn request_anim_frame(&self, callback: Function) -> u32 {
        self.client
            .request_anim_frame(move |stamp| {
                let _ = callback.call1(&JsValue::NULL, &JsValue::from_f64(stamp));
            })
            .0
    }

    #[wasm_bindgen(js_name = cancelAnimFrame)]
    pub fn cancel_anim_frame(&self, id: u32) {
        self.client.cancel_anim_frame(FrameId(id));
    }

    /// All results as a plain object, so `JSON.stringify(client)` works
    #[wasm_bindgen(js_name = toJSON)]
    pub fn to_json(&self) -> Result<JsValue, JsValue> {
        let json = serde_json::to_string(&self.client.snapshot())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        js_sys::JSON::parse(&json)
    }
}

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    console::log_1(&"detection WASM initialized".into());
}
