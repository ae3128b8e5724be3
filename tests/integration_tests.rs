//! Integration tests for detection
//!
//! End-to-end runs of the client on simulated browsers, plus the `detect`
//! binary in CI mode.

use std::cell::RefCell;
use std::io::Write;
use std::process::Command;
use std::rc::Rc;

use detection::mock::{agents, MockBrowser, MockEnvironment};
use detection::{
    run_conformance_suite, CheckValue, Client, DetectionConfig, DetectionError, FrameMode,
    Lifecycle, MockDocument, Probe, USER_AGENT_CHECKS,
};

fn run_detect(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_detect"))
        .args(args)
        .env_remove("DETECTION_CONFIG")
        .env_remove("DETECTION_USER_AGENT")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute detect");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.success(), stdout, stderr)
}

fn classes_line(stdout: &str) -> &str {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("classes: "))
        .expect("CI output should include classes")
}

// --- Client tests ---

#[test]
fn test_chrome_desktop_end_to_end() {
    let browser = MockBrowser::chrome_desktop()
        .with_document(MockDocument::with_root_classes("no-js"));
    let mut client = Client::new(browser.bindings()).unwrap();
    run_conformance_suite(&mut client);

    let classes = browser.document.root_class_name();
    assert!(classes.starts_with("js "));
    assert!(browser.document.root_has_class("chrome"));
    assert!(browser.document.root_has_class("desktop"));
    assert!(browser.document.root_has_class("transform"));
    assert!(!browser.document.root_has_class("mobile"));
}

#[test]
fn test_iphone_end_to_end() {
    let browser = MockBrowser::iphone_safari();
    let mut client = Client::new(browser.bindings()).unwrap();

    for name in ["iPhone", "iOS", "mobile", "safari", "retina", "mac"] {
        assert!(client.is(name), "{name} should be detected on iPhone");
    }
    for name in ["desktop", "chrome", "android", "iPad"] {
        assert!(!client.is(name), "{name} should not be detected on iPhone");
    }

    client.set_classes(true);
    assert!(browser.document.root_has_class("iphone"));
    assert!(browser.document.root_has_class("ios"));
    assert!(!browser.document.root_has_class("iPhone"));
}

#[test]
fn test_user_agent_matrix() {
    let cases: &[(&str, &[&str], &[&str])] = &[
        (agents::FIREFOX_DESKTOP, &["firefox", "desktop"], &["chrome", "safari", "mobile"]),
        (agents::SAFARI_MAC, &["safari", "mac", "desktop"], &["chrome", "iOS"]),
        (agents::SAFARI_IPAD, &["iPad", "iOS", "mobile"], &["iPhone", "desktop"]),
        (agents::ANDROID_CHROME, &["android", "chrome", "mobile"], &["desktop", "safari"]),
        (agents::OPERA, &["opera", "chrome", "desktop"], &["firefox"]),
        (agents::IE11, &["IE", "IE11", "desktop"], &["IE8", "oldIE"]),
        (agents::WINDOWS_PHONE, &["windowsPhone", "IE", "IE10", "mobile"], &["desktop"]),
    ];

    for (user_agent, present, absent) in cases {
        let browser = MockBrowser::new(MockEnvironment::modern(user_agent));
        let client = Client::new(browser.bindings()).unwrap();
        for name in *present {
            assert!(client.is(name), "{name} expected for {user_agent}");
        }
        for name in *absent {
            assert!(!client.is(name), "{name} unexpected for {user_agent}");
        }
        assert_ne!(client.is("desktop"), client.is("mobile"));
    }
}

#[test]
fn test_user_agent_table_tokens_end_to_end() {
    for (name, pattern, negate) in USER_AGENT_CHECKS {
        if *negate {
            continue;
        }
        let token = pattern.split('|').next().unwrap().to_uppercase();
        let browser = MockBrowser::new(MockEnvironment::new(&format!("Mozilla/5.0 ({token}) X")));
        let client = Client::new(browser.bindings()).unwrap();
        assert!(client.is(name), "{name} should be detected from {token:?}");
    }

    let browser = MockBrowser::new(MockEnvironment::new("Mozilla/5.0 (X11; Linux x86_64) X"));
    let client = Client::new(browser.bindings()).unwrap();
    assert!(client.is("desktop"));
    assert!(!client.is("mobile"));
}

#[test]
fn test_prefixed_properties_report_variant() {
    let env = MockEnvironment::legacy(agents::SAFARI_MAC)
        .with_property("WebkitTransform")
        .with_function("-webkit-calc");
    let browser = MockBrowser::new(env);
    let mut client = Client::new(browser.bindings()).unwrap();

    assert_eq!(
        client.get("transform"),
        Some(&CheckValue::Variant("WebkitTransform".into()))
    );
    assert_eq!(
        client.get("calc"),
        Some(&CheckValue::Variant("-webkit-calc".into()))
    );
    assert!(!client.is("perspective"));

    // Class tokens come from the check name, not the variant.
    client.set_classes(true);
    assert!(browser.document.root_has_class("transform"));
    assert!(browser.document.root_has_class("calc"));
    assert!(!browser.document.root_has_class("webkittransform"));
}

#[test]
fn test_custom_checks_then_cached_annotation() {
    let browser = MockBrowser::chrome_desktop();
    let mut client = Client::new(browser.bindings()).unwrap();

    assert!(client.add_test("touch", true).unwrap());
    assert!(client
        .add_test(
            "grid",
            Probe::computed(|d| d.first_supported_property(&"grid msGrid".into()).is_some())
        )
        .unwrap());
    client.get("touch");

    let added = client.set_classes(false);
    assert_eq!(added, vec!["touch"]);
    assert_eq!(client.lifecycle(), Lifecycle::Annotated);

    let added = client.set_classes(true);
    assert!(added.contains(&"chrome".to_string()));
    assert!(!added.contains(&"touch".to_string()));
    assert!(!added.contains(&"grid".to_string()));
}

#[test]
fn test_config_file_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "auto_annotate": true,
            "replace_no_js": false,
            "user_agents": {{"windows": "windows nt"}},
            "units": {{"ch": "1ch"}},
            "tests": {{"touch": true}}
        }}"#
    )
    .unwrap();

    let config = DetectionConfig::from_file(file.path()).unwrap();
    let browser = MockBrowser::chrome_desktop()
        .with_document(MockDocument::with_root_classes("no-js"));
    let client = Client::with_config(browser.bindings(), &config).unwrap();

    assert_eq!(client.lifecycle(), Lifecycle::Annotated);
    assert!(browser.document.root_has_class("no-js"));
    assert!(browser.document.root_has_class("windows"));
    assert!(browser.document.root_has_class("touch"));
    assert!(!browser.document.root_has_class("ch"));

    let names: Vec<&str> = client.names().collect();
    assert_eq!(&names[names.len() - 3..], &["windows", "ch", "touch"]);
}

#[test]
fn test_config_rejects_invalid_pattern() {
    let config = DetectionConfig::from_json_str(r#"{"user_agents": {"broken": "[a-"}}"#).unwrap();
    let browser = MockBrowser::chrome_desktop();
    let err = Client::with_config(browser.bindings(), &config).unwrap_err();
    assert!(matches!(err, DetectionError::InvalidPattern { .. }));
}

#[test]
fn test_polyfilled_frames_are_paced() {
    let browser = MockBrowser::ie8();
    let client = Client::new(browser.bindings()).unwrap();
    assert_eq!(client.frame_mode(), FrameMode::Polyfill);

    let stamps = Rc::new(RefCell::new(Vec::new()));
    browser.clock.set_now(500.0);
    for _ in 0..3 {
        let sink = Rc::clone(&stamps);
        client.request_anim_frame(move |t| sink.borrow_mut().push(t));
    }

    browser.clock.advance(100.0);
    assert_eq!(*stamps.borrow(), vec![500.0, 516.0, 532.0]);
}

// --- CLI tests ---

#[test]
fn test_detect_ci_mode() {
    let (ok, output, _) = run_detect(&["--stdout"]);
    assert!(ok, "detect should succeed in CI mode");
    assert!(output.contains("[PASS] detect"));
    assert!(output.contains("  chrome: true"));
    assert!(output.contains("  desktop: true"));
    assert!(output.contains("  calc: calc"));
    assert!(!output.contains("  mobile:"));

    let classes = classes_line(&output);
    assert!(classes.starts_with("js "));
    assert!(classes.split_whitespace().any(|t| t == "chrome"));
}

#[test]
fn test_detect_legacy_profile() {
    let (ok, output, _) = run_detect(&[
        "--stdout",
        "--profile",
        "legacy",
        "--user-agent",
        agents::IE8,
        "--class",
        "",
    ]);
    assert!(ok);
    assert_eq!(classes_line(&output), "ie ie8 oldie desktop");
}

#[test]
fn test_detect_retina_and_check() {
    let (ok, output, _) = run_detect(&[
        "--stdout",
        "--user-agent",
        agents::SAFARI_IPHONE,
        "--dpr",
        "2",
        "--check",
        "iphone os 17",
    ]);
    assert!(ok);
    assert!(output.contains("  retina: true"));
    assert!(output.contains("  check: true"));
}

#[test]
fn test_detect_invalid_check_fails() {
    let (ok, output, stderr) = run_detect(&["--stdout", "--check", "("]);
    assert!(!ok, "an invalid pattern should exit non-zero");
    assert!(!output.contains("[PASS]"));
    assert!(stderr.contains("error:"));
}

#[test]
fn test_detect_json_output() {
    let (ok, output, _) = run_detect(&["--json"]);
    assert!(ok);
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["results"]["chrome"], true);
    assert_eq!(json["results"]["calc"], "calc");
    assert_eq!(json["profile"], "modern");
    assert!(json["classes"].as_str().unwrap().contains("desktop"));
}

#[test]
fn test_detect_config_argument() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"user_agents": {{"windows": "windows nt"}}}}"#).unwrap();
    let path = file.path().to_str().unwrap();

    let (ok, output, _) = run_detect(&["--stdout", "--config", path]);
    assert!(ok);
    assert!(output.contains("  config: CLI argument"));
    assert!(output.contains("  windows: true"));
}

#[test]
fn test_detect_missing_config_fails() {
    let (ok, _, stderr) = run_detect(&["--stdout", "--config", "/nonexistent/detection.json"]);
    assert!(!ok);
    assert!(stderr.contains("error:"));
}
