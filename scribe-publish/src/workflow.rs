//! The publish state machine.
//!
//! One invocation owns one browser session and walks a fixed, linear
//! sequence of states; there are no backward transitions and every blocking
//! wait has a ceiling, so a run either produces the published URL or fails
//! with the step that gave out. The session is released on every exit path.
//!
//! Optional dialogs (resume-draft popup, help panel) are dismissed best
//! effort: their absence is normal and never surfaces.
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use scribe_common::{Result, ScribeError};
use scribe_config::{PacingSection, WorkflowSection};
use scribe_drivers::blog_browser::driver::{
    BrowserDriver, ElementRef, ScribeDriver, ScriptArg, Selector, SessionOptions,
};
use scribe_drivers::blog_browser::interact::resilient_click;
use scribe_drivers::blog_browser::pacing::{PacedTyper, PacingProfile};
use scribe_drivers::blog_browser::poll::DeadlinePoller;

use crate::credentials::CredentialStore;
use crate::crypto::SecretCipher;
use crate::selectors;

const STEP_POLL: Duration = Duration::from_millis(250);
const SETTLE: Duration = Duration::from_millis(300);

/// States of one publish invocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Init,
    LoggingIn,
    NavigatingEditor,
    EnteringTitle,
    EnteringBody,
    DismissingPopups,
    PublishingDraft,
    PublishingFinal,
    Verifying,
    Done,
    Failed,
}

impl PublishState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::Init => "init",
            PublishState::LoggingIn => "logging-in",
            PublishState::NavigatingEditor => "navigating-editor",
            PublishState::EnteringTitle => "entering-title",
            PublishState::EnteringBody => "entering-body",
            PublishState::DismissingPopups => "dismissing-popups",
            PublishState::PublishingDraft => "publishing-draft",
            PublishState::PublishingFinal => "publishing-final",
            PublishState::Verifying => "verifying",
            PublishState::Done => "done",
            PublishState::Failed => "failed",
        }
    }
}

/// Produces exclusive browser sessions. One acquisition per invocation.
#[async_trait]
pub trait DriverProvider: Send + Sync {
    async fn acquire(&self) -> anyhow::Result<Box<dyn BrowserDriver>>;
}

/// Production provider creating WebDriver-backed sessions.
pub struct WebDriverProvider {
    options: SessionOptions,
}

impl WebDriverProvider {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl DriverProvider for WebDriverProvider {
    async fn acquire(&self) -> anyhow::Result<Box<dyn BrowserDriver>> {
        Ok(Box::new(ScribeDriver::connect(&self.options).await?))
    }
}

/// Exclusive ownership of one browser session for one invocation.
struct Session {
    driver: Box<dyn BrowserDriver>,
}

impl Session {
    fn new(driver: Box<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    fn driver(&mut self) -> &mut dyn BrowserDriver {
        self.driver.as_mut()
    }

    /// Consume and release. A teardown failure is logged, never propagated;
    /// it must not mask the run's real outcome.
    async fn release(mut self) {
        if let Err(err) = self.driver.release().await {
            warn!(target: "publish.session", error = %err, "session release failed");
        }
    }
}

/// Sequences the end-to-end publish workflow.
///
/// The caller boundary is [`PublishWorkflow::publish`]: it either returns
/// the final URL or exactly one [`ScribeError`]; no partial results.
pub struct PublishWorkflow {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<dyn SecretCipher>,
    provider: Arc<dyn DriverProvider>,
    timeouts: WorkflowSection,
    pacing: PacingSection,
    poller: DeadlinePoller,
}

impl PublishWorkflow {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cipher: Arc<dyn SecretCipher>,
        provider: Arc<dyn DriverProvider>,
        timeouts: WorkflowSection,
        pacing: PacingSection,
    ) -> Self {
        Self {
            store,
            cipher,
            provider,
            timeouts,
            pacing,
            poller: DeadlinePoller::default(),
        }
    }

    /// Override the deadline poller's cadence (tests).
    pub fn with_poller(mut self, poller: DeadlinePoller) -> Self {
        self.poller = poller;
        self
    }

    /// Run one publish invocation for the account linked to `store_id`.
    ///
    /// Credential lookup and secret recovery happen before any browser
    /// session exists; a misconfigured account never opens a browser.
    pub async fn publish(&self, store_id: i64, title: &str, content: &str) -> Result<String> {
        let credential = self
            .store
            .find_by_store(store_id)
            .await?
            .ok_or(ScribeError::AccountNotConfigured(store_id))?;
        let secret = self.cipher.decrypt(&credential.secret_enc)?;

        info!(
            target: "publish.run",
            store_id,
            login_id = %credential.login_id,
            "starting publish invocation"
        );

        self.transition(PublishState::Init);
        let driver = self.provider.acquire().await?;
        let mut session = Session::new(driver);

        let outcome = self
            .run(&mut session, &credential.login_id, &secret, title, content)
            .await;

        // Unconditional, exactly once, on success and failure alike.
        session.release().await;

        match &outcome {
            Ok(url) => info!(target: "publish.run", url = %url, "publish complete"),
            Err(err) => {
                self.transition(PublishState::Failed);
                warn!(target: "publish.run", error = %err, "publish failed");
            }
        }
        outcome
    }

    async fn run(
        &self,
        session: &mut Session,
        login_id: &str,
        secret: &str,
        title: &str,
        content: &str,
    ) -> Result<String> {
        let driver = session.driver();

        self.transition(PublishState::LoggingIn);
        self.log_in(driver, login_id, secret).await?;

        self.transition(PublishState::NavigatingEditor);
        self.open_editor(driver, login_id).await?;

        self.transition(PublishState::DismissingPopups);
        self.dismiss_draft_popup(driver).await;

        self.transition(PublishState::EnteringTitle);
        self.enter_title(driver, title).await?;

        self.transition(PublishState::EnteringBody);
        self.enter_body(driver, content).await?;

        self.transition(PublishState::DismissingPopups);
        self.dismiss_help_panel(driver).await;

        // Pre-publish URL, recorded before any publish click can change it.
        let before = driver
            .current_url()
            .await
            .map_err(ScribeError::Driver)?;

        self.transition(PublishState::PublishingDraft);
        self.click_first_publish(driver).await?;

        self.transition(PublishState::PublishingFinal);
        self.click_final_publish(driver).await?;

        self.transition(PublishState::Verifying);
        let url = self.verify(driver, &before).await?;

        self.transition(PublishState::Done);
        Ok(url)
    }

    fn transition(&self, state: PublishState) {
        debug!(target: "publish.state", state = state.as_str(), "entering state");
    }

    // ---- individual states ----

    async fn log_in(
        &self,
        driver: &mut dyn BrowserDriver,
        login_id: &str,
        secret: &str,
    ) -> Result<()> {
        driver
            .navigate(selectors::LOGIN_URL)
            .await
            .map_err(|e| navigation("login-page", e))?;

        let wait = self.timeouts.login_wait();
        let id_field = self
            .wait_for_element(driver, &selectors::login_id_field(), wait, "login-id-field")
            .await?;
        driver
            .execute(
                selectors::SET_FIELD_VALUE,
                vec![ScriptArg::Element(id_field), ScriptArg::Json(json!(login_id))],
            )
            .await
            .map_err(|e| navigation("login-id-field", e))?;

        let pw_field = self
            .wait_for_element(driver, &selectors::login_pw_field(), wait, "login-pw-field")
            .await?;
        driver
            .execute(
                selectors::SET_FIELD_VALUE,
                vec![ScriptArg::Element(pw_field), ScriptArg::Json(json!(secret))],
            )
            .await
            .map_err(|e| navigation("login-pw-field", e))?;

        let submit = self
            .wait_for_element(driver, &selectors::login_submit(), wait, "login-submit")
            .await?;
        resilient_click(driver, &submit, "login submit")
            .await
            .map_err(|_| ScribeError::Interaction("login submit".into()))?;

        // The URL leaves the login path only once credentials are accepted.
        self.wait_for_url(driver, wait, |url| {
            !url.contains(selectors::LOGIN_PATH_MARKER)
        })
        .await
        .map_err(|_| ScribeError::Navigation {
            step: "logging-in",
            reason: "still on the login page (bad credentials or UI change)".into(),
        })?;

        info!(target: "publish.login", "login accepted");
        Ok(())
    }

    async fn open_editor(&self, driver: &mut dyn BrowserDriver, blog_id: &str) -> Result<()> {
        let url = selectors::write_url(blog_id);
        driver
            .navigate(&url)
            .await
            .map_err(|e| navigation("editor-page", e))?;
        sleep(SETTLE).await;

        driver
            .switch_to_root()
            .await
            .map_err(ScribeError::Driver)?;
        let frame = self
            .wait_for_element(
                driver,
                &selectors::editor_frame(),
                self.timeouts.editor_frame_wait(),
                "editor-frame",
            )
            .await?;
        driver
            .switch_to_frame(&frame)
            .await
            .map_err(|e| navigation("editor-frame", e))?;
        sleep(SETTLE).await;

        info!(target: "publish.editor", url = %url, "editor frame entered");
        Ok(())
    }

    /// Best effort: a leftover draft raises a "resume writing?" dialog that
    /// blocks the editor. Absence is the normal case.
    async fn dismiss_draft_popup(&self, driver: &mut dyn BrowserDriver) {
        let wait = self.timeouts.popup_wait();
        if self
            .wait_for_element(driver, &selectors::draft_popup(), wait, "draft-popup")
            .await
            .is_err()
        {
            debug!(target: "publish.popup", "no draft popup");
            return;
        }

        if let Ok(found) = driver.find_elements(&selectors::draft_popup_cancel()).await {
            if let Some(cancel) = found.into_iter().next() {
                let _ = resilient_click(driver, &cancel, "draft popup cancel").await;
                self.wait_until_gone(driver, &selectors::draft_popup(), wait)
                    .await;
                info!(target: "publish.popup", "draft popup dismissed");
            }
        }
    }

    async fn enter_title(&self, driver: &mut dyn BrowserDriver, title: &str) -> Result<()> {
        let placeholder = self
            .wait_for_element(
                driver,
                &selectors::title_placeholder(),
                self.timeouts.editor_frame_wait(),
                "title-field",
            )
            .await?;
        resilient_click(driver, &placeholder, "title field")
            .await
            .map_err(|_| ScribeError::Interaction("title field".into()))?;
        sleep(SETTLE).await;

        let mut typer = self.typer(self.pacing.title_char_pause_ms);
        typer
            .type_text(driver, title)
            .await
            .map_err(|e| navigation("title-input", e))?;

        // End-of-line moves the caret into the body.
        typer
            .press_enter(driver)
            .await
            .map_err(|e| navigation("title-input", e))?;

        // The editor sometimes swallows that keypress; check and retry once.
        match driver.execute(selectors::FOCUS_IN_BODY, vec![]).await {
            Ok(value) if value.as_bool() == Some(false) => {
                debug!(target: "publish.title", "caret still in title, retrying line break");
                typer
                    .press_enter(driver)
                    .await
                    .map_err(|e| navigation("title-input", e))?;
            }
            _ => {}
        }

        info!(target: "publish.title", chars = title.chars().count(), "title entered");
        Ok(())
    }

    async fn enter_body(&self, driver: &mut dyn BrowserDriver, content: &str) -> Result<()> {
        let lines: Vec<&str> = content.lines().collect();
        let body = trim_blank_edges(&lines);

        let mut typer = self.typer(self.pacing.body_char_pause_ms);
        for (i, line) in body.iter().enumerate() {
            if !line.is_empty() {
                typer
                    .type_text(driver, line)
                    .await
                    .map_err(|e| navigation("body-input", e))?;
            }
            if i + 1 < body.len() {
                typer
                    .press_enter(driver)
                    .await
                    .map_err(|e| navigation("body-input", e))?;
            }
        }

        info!(target: "publish.body", lines = body.len(), "body entered");
        Ok(())
    }

    /// Best effort: first visits get a help/tutorial panel over the editor.
    async fn dismiss_help_panel(&self, driver: &mut dyn BrowserDriver) {
        let wait = self.timeouts.popup_wait();
        if self
            .wait_for_element(driver, &selectors::help_panel(), wait, "help-panel")
            .await
            .is_err()
        {
            debug!(target: "publish.popup", "no help panel");
            return;
        }

        if let Ok(found) = driver.find_elements(&selectors::help_panel_close()).await {
            if let Some(close) = found.into_iter().next() {
                let _ = resilient_click(driver, &close, "help panel close").await;
                self.wait_until_gone(driver, &selectors::help_panel(), wait)
                    .await;
                info!(target: "publish.popup", "help panel closed");
            }
        }
    }

    async fn click_first_publish(&self, driver: &mut dyn BrowserDriver) -> Result<()> {
        let button = self
            .wait_for_element(
                driver,
                &selectors::first_publish_button(),
                self.timeouts.editor_frame_wait(),
                "first-publish",
            )
            .await?;
        resilient_click(driver, &button, "first publish button")
            .await
            .map_err(|_| ScribeError::Interaction("first publish button".into()))?;
        sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn click_final_publish(&self, driver: &mut dyn BrowserDriver) -> Result<()> {
        let candidates = selectors::final_publish_candidates();
        let outcome = self
            .poller
            .find_and_click(
                driver,
                &candidates,
                self.timeouts.publish_deadline(),
                "final publish button",
            )
            .await
            .map_err(ScribeError::Driver)?;

        if outcome.is_none() {
            return Err(ScribeError::DeadlineExceeded(
                "locating the final publish control".into(),
            ));
        }

        // Give the confirmation dialog a chance to close before verifying.
        self.wait_until_gone(
            driver,
            &selectors::final_confirm_button(),
            Duration::from_secs(10),
        )
        .await;
        Ok(())
    }

    async fn verify(&self, driver: &mut dyn BrowserDriver, before: &str) -> Result<String> {
        let url = self
            .wait_for_url(driver, self.timeouts.verify_wait(), |url| url != before)
            .await
            .map_err(|_| ScribeError::Verification)?;
        Ok(url)
    }

    // ---- bounded-wait helpers ----

    fn typer(&self, char_pause_ms: [u64; 2]) -> PacedTyper {
        PacedTyper::new(PacingProfile {
            char_pause_ms,
            line_pause_ms: self.pacing.line_pause_ms,
        })
    }

    async fn wait_for_element(
        &self,
        driver: &mut dyn BrowserDriver,
        selector: &Selector,
        timeout: Duration,
        step: &'static str,
    ) -> Result<ElementRef> {
        let give_up = Instant::now() + timeout;
        loop {
            if let Ok(found) = driver.find_elements(selector).await {
                if let Some(element) = found.into_iter().next() {
                    return Ok(element);
                }
            }
            if Instant::now() >= give_up {
                return Err(ScribeError::Navigation {
                    step,
                    reason: format!("{selector} did not appear within {timeout:?}"),
                });
            }
            sleep(STEP_POLL).await;
        }
    }

    /// Best effort: wait for `selector` to stop matching. Gives up silently.
    async fn wait_until_gone(
        &self,
        driver: &mut dyn BrowserDriver,
        selector: &Selector,
        timeout: Duration,
    ) {
        let give_up = Instant::now() + timeout;
        loop {
            match driver.find_elements(selector).await {
                Ok(found) if found.is_empty() => return,
                Err(_) => return,
                _ => {}
            }
            if Instant::now() >= give_up {
                debug!(target: "publish.wait", selector = %selector, "element still present, moving on");
                return;
            }
            sleep(STEP_POLL).await;
        }
    }

    async fn wait_for_url<F>(
        &self,
        driver: &mut dyn BrowserDriver,
        timeout: Duration,
        accept: F,
    ) -> Result<String>
    where
        F: Fn(&str) -> bool,
    {
        let give_up = Instant::now() + timeout;
        loop {
            let url = driver.current_url().await.map_err(ScribeError::Driver)?;
            if accept(&url) {
                return Ok(url);
            }
            if Instant::now() >= give_up {
                return Err(ScribeError::Driver(anyhow!(
                    "url condition not met within {timeout:?} (last: {url})"
                )));
            }
            sleep(STEP_POLL).await;
        }
    }
}

fn navigation(step: &'static str, cause: anyhow::Error) -> ScribeError {
    ScribeError::Navigation {
        step,
        reason: cause.to_string(),
    }
}

/// Strip leading and trailing blank lines; interior blanks stay.
fn trim_blank_edges<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    let start = lines
        .iter()
        .position(|line| !line.is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map(|i| i + 1)
        .unwrap_or(start);
    &lines[start..end]
}
