//! Ordered fallback click chain.
//!
//! Overlapping elements, custom widgets and off-screen targets each defeat
//! a different click mechanism, so a logical click tries four strategies of
//! increasing forcefulness and stops at the first that lands:
//!
//! 1. native click
//! 2. pointer move + click through a simulated input device
//! 3. scroll into view, then a script-level click
//! 4. scroll into view, then synthesized mouse events on the element
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::time::sleep;
use tracing::debug;

use super::driver::{BrowserDriver, ElementRef, ScriptArg};

pub(crate) const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView({block:'center'});";

const SCRIPT_CLICK: &str = "arguments[0].click();";

const SYNTHETIC_CLICK: &str = r#"
const el = arguments[0], opts = {bubbles: true, cancelable: true, composed: true};
el.dispatchEvent(new MouseEvent('mousedown', opts));
el.dispatchEvent(new MouseEvent('mouseup', opts));
el.dispatchEvent(new MouseEvent('click', opts));
"#;

const SCROLL_SETTLE: Duration = Duration::from_millis(100);

/// Deliver a logical click to `element`, falling through the strategy
/// chain. Returns the 1-based number of the strategy that succeeded, or an
/// error if all four raised. `label` only feeds diagnostics.
pub async fn resilient_click(
    driver: &mut dyn BrowserDriver,
    element: &ElementRef,
    label: &str,
) -> Result<usize> {
    if driver.click(element).await.is_ok() {
        return Ok(1);
    }
    debug!(target: "driver.click", control = label, "native click failed, trying pointer actions");

    if driver.pointer_click(element).await.is_ok() {
        return Ok(2);
    }
    debug!(target: "driver.click", control = label, "pointer click failed, trying script click");

    if script_click(driver, element).await.is_ok() {
        return Ok(3);
    }
    debug!(target: "driver.click", control = label, "script click failed, dispatching raw events");

    if synthetic_click(driver, element).await.is_ok() {
        return Ok(4);
    }

    Err(anyhow!("all click strategies exhausted for {label}"))
}

async fn script_click(driver: &mut dyn BrowserDriver, element: &ElementRef) -> Result<()> {
    driver
        .execute(SCROLL_INTO_VIEW, vec![ScriptArg::Element(*element)])
        .await?;
    sleep(SCROLL_SETTLE).await;
    driver
        .execute(SCRIPT_CLICK, vec![ScriptArg::Element(*element)])
        .await?;
    Ok(())
}

async fn synthetic_click(driver: &mut dyn BrowserDriver, element: &ElementRef) -> Result<()> {
    driver
        .execute(SCROLL_INTO_VIEW, vec![ScriptArg::Element(*element)])
        .await?;
    sleep(SCROLL_SETTLE).await;
    driver
        .execute(SYNTHETIC_CLICK, vec![ScriptArg::Element(*element)])
        .await?;
    Ok(())
}
