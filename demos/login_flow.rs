//! Login and social-link walkthrough against the in-memory browser.
//!
//! Demonstrates:
//! - Fallback locators for fields whose ids vary between deployments
//! - Typing with an input mask and reading back the echo
//! - Detecting the logged-in state from weak signals
//! - Classifying a link as same-context or new-context and restoring
//! - Verifying a sort through before/after snapshots
//!
//! Usage:
//!   cargo run --example login_flow
//!   cargo run --example login_flow -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use resilient_driver::ordering::{self, Snapshot};
use resilient_driver::sim::{ClickEffect, InputMask, SimBrowser, SimNode};
use resilient_driver::{By, LocatorSpec, Result, Session, SessionOptions, StateHeuristic};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_URL: &str = "https://shop.test/";
const INVENTORY_URL: &str = "https://shop.test/inventory.html";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "resilient_driver=debug"
    } else {
        "resilient_driver=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Builds the application under test.
fn shop() -> SimBrowser {
    let browser = SimBrowser::new();

    browser.titled_page(
        LOGIN_URL,
        "Shop",
        vec![
            SimNode::new("form")
                .child(SimNode::new("input").name("user-name"))
                .child(SimNode::new("input").attr("type", "password"))
                .child(SimNode::new("input").attr("type", "tel").mask(InputMask::DigitsOnly))
                .child(
                    SimNode::new("input")
                        .attr("type", "submit")
                        .on_click(ClickEffect::navigate(INVENTORY_URL).delayed(Duration::from_millis(400))),
                ),
        ],
    );

    let mut inventory = vec![
        SimNode::new("a").id("logout_sidebar_link").text("Logout"),
        SimNode::new("select")
            .class("product_sort_container")
            .child(SimNode::new("option").attr("value", "az").text("Name (A to Z)"))
            .child(
                SimNode::new("option")
                    .attr("value", "lohi")
                    .text("Price (low to high)")
                    .on_click(ClickEffect::render("inventory:lohi").delayed(Duration::from_millis(200))),
            ),
        SimNode::new("footer").child(
            SimNode::new("a")
                .class("social_twitter")
                .text("Twitter")
                .attr("href", "https://twitter.com/shop")
                .attr("target", "_blank"),
        ),
    ];
    inventory.extend(prices(&["$29.99", "$9.99", "$15.99"]));
    browser.titled_page(INVENTORY_URL, "Products", inventory);
    browser.page("inventory:lohi", prices(&["$9.99", "$15.99", "$29.99"]));
    browser.page("https://twitter.com/shop", vec![SimNode::new("h1").text("@shop")]);

    browser.open(LOGIN_URL);
    browser
}

fn prices(values: &[&str]) -> Vec<SimNode> {
    values
        .iter()
        .map(|v| SimNode::new("div").class("inventory_item_price").text(*v))
        .collect()
}

async fn run() -> Result<()> {
    println!("=== Login Flow ===\n");

    let options = SessionOptions::new()
        .with_default_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_millis(100));
    let session = Session::with_options(shop(), options)?;

    // ========================================================================
    // Log in
    // ========================================================================

    println!("[1] Fill the login form");

    let user = session
        .require(
            &LocatorSpec::new(By::id("user-name"))
                .or(By::name("user-name"))
                .or(By::css("input[type='text']")),
        )
        .await?;
    println!("    user field via candidate {} ({})", user.candidate_index, user.by);
    session.type_text(&user, "standard_user").await?;

    let password = session
        .require(&LocatorSpec::new(By::id("password")).or(By::attr("type", "password")))
        .await?;
    session.type_text(&password, "secret_sauce").await?;

    let phone = session.require(&LocatorSpec::new(By::attr("type", "tel"))).await?;
    let echo = session.type_and_confirm(&phone, "555-0100").await?;
    println!("    phone echo: {echo}");

    let submit = session
        .require(&LocatorSpec::new(By::id("login-button")).or(By::attr("type", "submit")))
        .await?;
    session.click(&submit).await?;

    let judgment = StateHeuristic::logged_in().await_holds(&session).await?;
    println!("    ✓ logged in: {judgment}\n");

    // ========================================================================
    // Social link
    // ========================================================================

    println!("[2] Follow the Twitter link");

    let twitter = session
        .require(&LocatorSpec::new(By::class("social_twitter")).or(By::partial_link_text("Twitter")))
        .await?;
    let event = session.click_and_classify(&twitter).await?.into_event()?;
    println!("    {} -> {}", event.classification, event.url());
    session.restore(&event).await?;
    println!("    ✓ restored to {}\n", session.current_url().await?);

    // ========================================================================
    // Sort order
    // ========================================================================

    println!("[3] Sort by price");

    let spec = LocatorSpec::new(By::class("inventory_item_price"));
    let before = Snapshot::capture(&session, &spec).await?;

    let sort = session
        .require(&LocatorSpec::new(By::class("product_sort_container")))
        .await?;
    session.select_option(&sort, "Price (low to high)").await?;

    let (sess, prices, baseline) = (&session, &spec, &before);
    let after = session
        .wait("prices re-rendered")
        .until_some(|| async move {
            let after = Snapshot::capture(sess, prices).await?;
            Ok((after != *baseline && !after.is_empty()).then_some(after))
        })
        .await?;

    let verdict = ordering::diff(&before, &after);
    println!("    before: {:?}", before.values());
    println!("    after:  {:?}", after.values());
    println!("    order:  {:?}", verdict.monotonic());

    println!("\n=== Done ===");
    Ok(())
}
