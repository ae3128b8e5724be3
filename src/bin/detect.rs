//! CLI: run feature detection against a simulated browser
//!
//! Builds a mock browser from a user agent string and a capability profile,
//! resolves every check, annotates the mock document root and prints the
//! results.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use detection::mock::{agents, MockBrowser, MockEnvironment};
use detection::{load_config, CheckValue, Client, MockDocument};

/// CSS and DOM capability profile of the simulated browser
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
enum Profile {
    /// Unprefixed properties, viewport units, calc(), picture, srcset, canvas
    Modern,
    /// Pixel and em lengths only
    Legacy,
}

impl Profile {
    fn name(&self) -> &'static str {
        match self {
            Profile::Modern => "modern",
            Profile::Legacy => "legacy",
        }
    }

    fn environment(&self, user_agent: &str) -> MockEnvironment {
        match self {
            Profile::Modern => MockEnvironment::modern(user_agent),
            Profile::Legacy => MockEnvironment::legacy(user_agent),
        }
    }
}

/// Client and feature detection
#[derive(Parser)]
#[command(name = "detect")]
#[command(about = "Run client and feature detection against a simulated browser")]
#[command(version)]
struct Args {
    /// Output to stdout (CI mode)
    #[arg(long)]
    stdout: bool,

    /// Print results as JSON
    #[arg(long, conflicts_with = "stdout")]
    json: bool,

    /// User agent string to detect
    #[arg(long, env = "DETECTION_USER_AGENT", default_value = agents::CHROME_DESKTOP)]
    user_agent: String,

    /// Capability profile (simulated)
    #[arg(long, value_enum, default_value = "modern")]
    profile: Profile,

    /// Device pixel ratio
    #[arg(long, default_value = "1")]
    dpr: f64,

    /// Initial class attribute of the document root
    #[arg(long = "class", default_value = "no-js")]
    class_name: String,

    /// Path to a JSON detection config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra user agent pattern to test
    #[arg(long)]
    check: Option<String>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "detection=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(client: &Client, args: &Args, check: Option<bool>, added: &[String]) {
    println!("\n=== Client Detection ===\n");
    println!("User agent: {}", args.user_agent);
    println!("Profile:    {}", args.profile.name());
    println!("Frames:     {:?}", client.frame_mode());
    println!();

    println!("Results:");
    let width = client.names().map(str::len).max().unwrap_or(0);
    for (name, value) in client.results() {
        let marker = if value.is_truthy() { "+" } else { " " };
        println!("  {marker} {name:<width$}  {value}");
    }
    println!();

    if let (Some(pattern), Some(matched)) = (&args.check, check) {
        println!("Check {pattern:?}: {matched}");
        println!();
    }

    println!("Classes added: {}", added.join(" "));
    println!("<html class=\"{}\">", client.root_class_name());
}

fn run(args: &Args) -> detection::Result<()> {
    let (config, source) = load_config(args.config.as_deref())?;
    info!(%source, "using detection config");

    let environment = args
        .profile
        .environment(&args.user_agent)
        .with_pixel_ratio(args.dpr);
    let browser = MockBrowser::new(environment)
        .with_document(MockDocument::with_root_classes(&args.class_name))
        .with_native_frames(args.profile == Profile::Modern);

    let mut client = Client::with_config(browser.bindings(), &config)?;
    let check = args
        .check
        .as_deref()
        .map(|pattern| client.ua_check(pattern))
        .transpose()?;
    let added = client.set_classes(true);

    if args.json {
        let output = json!({
            "user_agent": args.user_agent,
            "profile": args.profile.name(),
            "results": client.snapshot(),
            "check": check,
            "classes": client.root_class_name(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if args.stdout {
        // CI mode: minimal output
        println!("[PASS] detect");
        println!("  profile: {}", args.profile.name());
        println!("  config: {source}");
        for (name, value) in client.results() {
            if value != &CheckValue::Flag(false) {
                println!("  {name}: {value}");
            }
        }
        if let Some(matched) = check {
            println!("  check: {matched}");
        }
        println!("  classes: {}", client.root_class_name());
    } else {
        print_report(&client, args, check, &added);
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
