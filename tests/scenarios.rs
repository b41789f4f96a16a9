//! End-to-end scenarios against the in-memory browser.
//!
//! Each scenario drives a complete test step: resolve, act, classify,
//! assert, restore.

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use resilient_driver::ordering::{self, Snapshot};
use resilient_driver::sim::{ClickEffect, SimBrowser, SimNode};
use resilient_driver::{
    By, Classification, DomainMatch, LocatorSpec, Session, SessionOptions, SortOrder,
    StateHeuristic,
};

const HOME: &str = "https://example.test/";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Fallback Resolution
// ============================================================================

#[tokio::test(start_paused = true)]
async fn email_field_resolves_through_type_attribute_fallback() -> Result<()> {
    init_tracing();
    let browser = SimBrowser::new();
    browser.page(HOME, vec![SimNode::new("input").attr("type", "email")]);
    browser.open(HOME);
    let session = Session::new(browser);

    let email = LocatorSpec::new(By::id("email"))
        .or(By::attr("name", "email"))
        .or(By::attr("type", "email"));

    let field = session.require(&email).await?;
    ensure!(field.candidate_index == 2, "resolved via {}", field.by);

    let echo = session.type_and_confirm(&field, "user@example.test").await?;
    ensure!(echo.accepted(), "input rejected: {echo}");
    Ok(())
}

// ============================================================================
// New Context
// ============================================================================

#[tokio::test(start_paused = true)]
async fn social_link_opens_new_context_that_restore_closes() -> Result<()> {
    init_tracing();
    let browser = SimBrowser::new();
    browser.page(
        HOME,
        vec![
            SimNode::new("footer").child(
                SimNode::new("a")
                    .class("social_twitter")
                    .attr("href", "https://twitter.com/example")
                    .attr("target", "_blank"),
            ),
        ],
    );
    browser.open(HOME);
    let session = Session::new(browser.clone());

    let before = session.window_handles().await?.len();
    let origin = session.focused_handle().await?;
    let twitter = session
        .require(&LocatorSpec::new(By::class("social_twitter")).or(By::partial_link_text("Twitter")))
        .await?;

    let event = session
        .perform_and_classify(|| session.click(&twitter), Duration::from_secs(5))
        .await?
        .into_event()?;
    ensure!(event.classification == Classification::NewContext);
    ensure!(event.matches_domain("twitter.com", DomainMatch::Substring));

    session.restore(&event).await?;
    ensure!(session.window_handles().await?.len() == before);
    ensure!(session.focused_handle().await? == origin);
    ensure!(browser.window_count() == before);
    Ok(())
}

// ============================================================================
// Same Context
// ============================================================================

#[tokio::test(start_paused = true)]
async fn about_link_navigates_in_place_and_back_returns_home() -> Result<()> {
    init_tracing();
    let browser = SimBrowser::new();
    browser.page(
        HOME,
        vec![
            SimNode::new("a")
                .id("about_sidebar_link")
                .text("About")
                .on_click(
                    ClickEffect::navigate("https://example.test/about")
                        .delayed(Duration::from_millis(300)),
                ),
        ],
    );
    browser.page("https://example.test/about", vec![SimNode::new("h1").text("About us")]);
    browser.open(HOME);
    let session = Session::new(browser);

    let about = session
        .require(&LocatorSpec::new(By::link_text("About")).or(By::id("about_sidebar_link")))
        .await?;

    let event = session.click_and_classify(&about).await?.into_event()?;
    ensure!(event.classification == Classification::SameContext);
    ensure!(event.url() == "https://example.test/about");

    session.restore(&event).await?;
    ensure!(session.current_url().await? == HOME);
    ensure!(session.window_handles().await?.len() == 1);
    Ok(())
}

// ============================================================================
// Sort Order
// ============================================================================

fn price_list(prices: &[&str]) -> Vec<SimNode> {
    prices
        .iter()
        .map(|price| {
            SimNode::new("div")
                .class("inventory_item")
                .child(SimNode::new("div").class("inventory_item_price").text(*price))
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn price_sort_yields_ascending_order() -> Result<()> {
    init_tracing();
    let browser = SimBrowser::new();

    let mut unsorted = vec![
        SimNode::new("select")
            .class("product_sort_container")
            .child(SimNode::new("option").attr("value", "az").text("Name (A to Z)"))
            .child(
                SimNode::new("option")
                    .attr("value", "lohi")
                    .text("Price (low to high)")
                    .on_click(ClickEffect::render("sorted:lohi").delayed(Duration::from_millis(250))),
            ),
    ];
    unsorted.extend(price_list(&["30", "10", "20"]));
    browser.page(HOME, unsorted);
    browser.page("sorted:lohi", price_list(&["10", "20", "30"]));
    browser.open(HOME);

    let options = SessionOptions::new().with_poll_interval(Duration::from_millis(50));
    let session = Session::with_options(browser, options)?;
    let prices = LocatorSpec::new(By::css(".inventory_item .inventory_item_price"))
        .or(By::class("inventory_item_price"));

    let before = Snapshot::capture(&session, &prices).await?;
    let sort = session
        .require(&LocatorSpec::new(By::class("product_sort_container")))
        .await?;
    session.select_option(&sort, "Price (low to high)").await?;

    let (sess, spec, baseline) = (&session, &prices, &before);
    let after = session
        .wait("list re-rendered")
        .until_some(|| async move {
            let after = Snapshot::capture(sess, spec).await?;
            Ok((after != *baseline && !after.is_empty()).then_some(after))
        })
        .await?;

    let verdict = ordering::diff(&before, &after);
    let diff = verdict.diff().context("snapshots should not be empty")?;
    ensure!(diff.changed);
    ensure!(diff.monotonic == Some(SortOrder::Ascending), "got {:?}", diff.monotonic);
    Ok(())
}

// ============================================================================
// Logged-in Heuristic
// ============================================================================

#[tokio::test(start_paused = true)]
async fn login_is_detected_by_any_marker() -> Result<()> {
    init_tracing();
    let browser = SimBrowser::new();
    browser.page(
        HOME,
        vec![
            SimNode::new("input").id("user-name"),
            SimNode::new("input").id("password"),
            SimNode::new("input")
                .id("login-button")
                .on_click(ClickEffect::navigate("https://example.test/inventory.html")),
        ],
    );
    browser.page(
        "https://example.test/inventory.html",
        vec![SimNode::new("a").id("logout_sidebar_link").text("Logout")],
    );
    browser.open(HOME);
    let session = Session::new(browser);
    let logged_in = StateHeuristic::logged_in();

    ensure!(!logged_in.evaluate_when_ready(&session).await?.holds);

    let user = session.require(&LocatorSpec::new(By::id("user-name"))).await?;
    session.type_text(&user, "standard_user").await?;
    let login = session.require(&LocatorSpec::new(By::id("login-button"))).await?;
    session.click(&login).await?;

    let judgment = logged_in.await_holds(&session).await?;
    ensure!(judgment.fired.len() == 2, "fired: {judgment}");
    Ok(())
}
