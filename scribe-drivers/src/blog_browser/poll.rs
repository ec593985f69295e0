//! Bounded-time search-and-click across frame contexts.
//!
//! The confirmation control of the editor renders inside any of several
//! containers depending on the layout variant the page served, and it can
//! spend a while disabled before the draft finishes saving. The poller
//! re-scans the frame topology each cycle, tests candidate selectors in
//! priority order, waits briefly for the control to enable, and clicks
//! through the fallback chain. Every invocation terminates: the loop is
//! bounded by a wall-clock deadline.
use std::time::Duration;

use anyhow::Result;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use super::contexts::{enter_context, list_contexts};
use super::driver::{BrowserDriver, ElementRef, ScriptArg, Selector};
use super::interact::{resilient_click, SCROLL_INTO_VIEW};

const IS_DISABLED: &str =
    "return arguments[0].disabled || arguments[0].getAttribute('aria-disabled') === 'true';";

/// Where a successful click landed.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Label of the frame context the control was found in.
    pub context: String,
    /// The candidate selector that matched.
    pub selector: String,
    /// Which click strategy landed (1-based).
    pub strategy: usize,
}

/// Deadline-bound retry loop over contexts × selectors.
#[derive(Debug, Clone)]
pub struct DeadlinePoller {
    /// Sleep between full poll cycles.
    pub poll_interval: Duration,
    /// How many times to re-check a disabled control before clicking anyway.
    pub enable_checks: u32,
    /// Spacing between those re-checks.
    pub enable_check_interval: Duration,
}

impl Default for DeadlinePoller {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(400),
            enable_checks: 6,
            enable_check_interval: Duration::from_millis(250),
        }
    }
}

impl DeadlinePoller {
    /// Search every context for the first selector that matches, wait for
    /// the element to enable, and click it. Returns `None` once `deadline`
    /// elapses with no successful click; the call always returns within
    /// roughly `deadline` plus one poll cycle.
    pub async fn find_and_click(
        &self,
        driver: &mut dyn BrowserDriver,
        candidates: &[Selector],
        deadline: Duration,
        what: &str,
    ) -> Result<Option<PollOutcome>> {
        let give_up_at = Instant::now() + deadline;

        loop {
            // Topology may have changed since the previous cycle.
            let contexts = match list_contexts(driver).await {
                Ok(contexts) => contexts,
                Err(err) => {
                    debug!(target: "driver.poll", error = %err, "context scan failed, will retry");
                    Vec::new()
                }
            };

            for context in &contexts {
                if enter_context(driver, context).await.is_err() {
                    continue;
                }
                for selector in candidates {
                    let found = match driver.find_elements(selector).await {
                        Ok(found) => found,
                        Err(_) => continue,
                    };
                    let Some(element) = found.into_iter().next() else {
                        continue;
                    };

                    self.wait_until_enabled(driver, &element).await;
                    let _ = driver
                        .execute(SCROLL_INTO_VIEW, vec![ScriptArg::Element(element)])
                        .await;
                    sleep(Duration::from_millis(150)).await;

                    if let Ok(strategy) = resilient_click(driver, &element, what).await {
                        info!(
                            target: "driver.poll",
                            context = %context.label,
                            selector = %selector,
                            strategy,
                            "clicked {what}"
                        );
                        return Ok(Some(PollOutcome {
                            context: context.label.clone(),
                            selector: selector.to_string(),
                            strategy,
                        }));
                    }
                }
            }

            if Instant::now() >= give_up_at {
                debug!(target: "driver.poll", what, "deadline elapsed without a successful click");
                return Ok(None);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Re-check the disabled/aria-disabled state a bounded number of times.
    /// Best effort: script failures and a still-disabled control both fall
    /// through to the click attempt.
    async fn wait_until_enabled(&self, driver: &mut dyn BrowserDriver, element: &ElementRef) {
        for _ in 0..self.enable_checks {
            match driver
                .execute(IS_DISABLED, vec![ScriptArg::Element(*element)])
                .await
            {
                Ok(value) if value.as_bool() == Some(true) => {
                    sleep(self.enable_check_interval).await;
                }
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Instant as StdInstant;

    use crate::blog_browser::driver::KeyInput;

    /// A page where the target either never exists, or appears after a
    /// given number of scans and stays disabled for a few checks.
    struct AppearingControl {
        appear_after_scans: Option<u32>,
        disabled_checks: u32,
        scans: u32,
        clicked: bool,
    }

    impl AppearingControl {
        fn never() -> Self {
            Self {
                appear_after_scans: None,
                disabled_checks: 0,
                scans: 0,
                clicked: false,
            }
        }

        fn after(scans: u32, disabled_checks: u32) -> Self {
            Self {
                appear_after_scans: Some(scans),
                disabled_checks,
                scans: 0,
                clicked: false,
            }
        }
    }

    const TARGET: ElementRef = ElementRef(9);

    #[async_trait]
    impl BrowserDriver for AppearingControl {
        async fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn current_url(&mut self) -> Result<String> {
            Ok(String::new())
        }
        async fn switch_to_root(&mut self) -> Result<()> {
            Ok(())
        }
        async fn switch_to_frame(&mut self, _frame: &ElementRef) -> Result<()> {
            Ok(())
        }
        async fn find_elements(&mut self, selector: &Selector) -> Result<Vec<ElementRef>> {
            match selector {
                Selector::Css(s) if s == "iframe" || s == "#mainFrame" => Ok(vec![]),
                _ => {
                    self.scans += 1;
                    match self.appear_after_scans {
                        Some(after) if self.scans > after => Ok(vec![TARGET]),
                        _ => Ok(vec![]),
                    }
                }
            }
        }
        async fn click(&mut self, _element: &ElementRef) -> Result<()> {
            self.clicked = true;
            Ok(())
        }
        async fn pointer_click(&mut self, _element: &ElementRef) -> Result<()> {
            Ok(())
        }
        async fn send_key(&mut self, _key: KeyInput) -> Result<()> {
            Ok(())
        }
        async fn execute(&mut self, script: &str, _args: Vec<ScriptArg>) -> Result<Value> {
            if script == IS_DISABLED {
                if self.disabled_checks > 0 {
                    self.disabled_checks -= 1;
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(false));
            }
            Ok(Value::Null)
        }
        async fn release(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn fast_poller() -> DeadlinePoller {
        DeadlinePoller {
            poll_interval: Duration::from_millis(50),
            enable_checks: 6,
            enable_check_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn returns_none_within_deadline_when_target_never_appears() {
        let mut page = AppearingControl::never();
        let poller = fast_poller();
        let deadline = Duration::from_millis(400);

        let started = StdInstant::now();
        let outcome = poller
            .find_and_click(
                &mut page,
                &[Selector::css("button.confirm")],
                deadline,
                "confirm button",
            )
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(outcome.is_none());
        assert!(!page.clicked);
        // Bounded: deadline plus at most one extra cycle, with slack for CI.
        assert!(elapsed < deadline + Duration::from_millis(300));
    }

    #[tokio::test]
    async fn clicks_once_the_control_appears_and_enables() {
        let mut page = AppearingControl::after(2, 3);
        let poller = fast_poller();

        let outcome = poller
            .find_and_click(
                &mut page,
                &[Selector::css("button.confirm")],
                Duration::from_secs(2),
                "confirm button",
            )
            .await
            .unwrap()
            .expect("control should be clicked");

        assert_eq!(outcome.context, "root");
        assert_eq!(outcome.strategy, 1);
        assert!(page.clicked);
        // Disabled checks were consumed before the click.
        assert_eq!(page.disabled_checks, 0);
    }

    #[tokio::test]
    async fn selector_priority_is_respected() {
        // Both selectors match; the first candidate should be reported.
        struct EverythingMatches {
            reported: Vec<String>,
        }

        #[async_trait]
        impl BrowserDriver for EverythingMatches {
            async fn navigate(&mut self, _url: &str) -> Result<()> {
                Ok(())
            }
            async fn current_url(&mut self) -> Result<String> {
                Ok(String::new())
            }
            async fn switch_to_root(&mut self) -> Result<()> {
                Ok(())
            }
            async fn switch_to_frame(&mut self, _frame: &ElementRef) -> Result<()> {
                Ok(())
            }
            async fn find_elements(&mut self, selector: &Selector) -> Result<Vec<ElementRef>> {
                match selector {
                    Selector::Css(s) if s == "iframe" || s == "#mainFrame" => Ok(vec![]),
                    other => {
                        self.reported.push(other.to_string());
                        Ok(vec![ElementRef(1)])
                    }
                }
            }
            async fn click(&mut self, _element: &ElementRef) -> Result<()> {
                Ok(())
            }
            async fn pointer_click(&mut self, _element: &ElementRef) -> Result<()> {
                Ok(())
            }
            async fn send_key(&mut self, _key: KeyInput) -> Result<()> {
                Ok(())
            }
            async fn execute(&mut self, _script: &str, _args: Vec<ScriptArg>) -> Result<Value> {
                Ok(Value::Bool(false))
            }
            async fn release(&mut self) -> Result<()> {
                Ok(())
            }
        }

        let mut page = EverythingMatches {
            reported: Vec::new(),
        };
        let outcome = DeadlinePoller::default()
            .find_and_click(
                &mut page,
                &[
                    Selector::xpath("//button[@data-testid='primary']"),
                    Selector::css("button.fallback"),
                ],
                Duration::from_secs(1),
                "publish",
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.selector, "xpath://button[@data-testid='primary']");
        assert_eq!(page.reported.len(), 1);
    }
}
