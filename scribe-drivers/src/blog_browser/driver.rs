//! Capability surface over an automated browser, and its WebDriver backend.
//!
//! The publish workflow only ever talks to [`BrowserDriver`]; the
//! fantoccini-backed [`ScribeDriver`] is the production implementation and
//! tests substitute scripted fakes. Element handles are opaque and only
//! valid until the page navigates, because the editor rebuilds its DOM
//! between loads.
use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fantoccini::actions::{
    InputSource, KeyAction, KeyActions, MouseActions, PointerAction, MOUSE_BUTTON_LEFT,
};
use fantoccini::elements::Element;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Value};
use tracing::{debug, info};
use webdriver::capabilities::Capabilities;

/// How an element is located within the current frame context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Selector::Css(selector.into())
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Selector::XPath(selector.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{s}"),
            Selector::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Opaque handle to an element found in the current frame context.
///
/// Handles are ephemeral: navigation invalidates them, and a handle found
/// inside one frame must only be used while that frame is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub u64);

/// A single keypress delivered to the focused element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
}

/// Argument passed into an injected script.
#[derive(Debug, Clone)]
pub enum ScriptArg {
    Element(ElementRef),
    Json(Value),
}

/// Capability surface the workflow depends on.
///
/// One implementor instance is one exclusive browser session; it is never
/// shared between concurrent workflow invocations.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;
    async fn current_url(&mut self) -> Result<String>;
    /// Switch back to the top-level browsing context.
    async fn switch_to_root(&mut self) -> Result<()>;
    /// Switch into the frame backed by the given element handle.
    async fn switch_to_frame(&mut self, frame: &ElementRef) -> Result<()>;
    /// All matches for `selector` within the current frame context, in
    /// document order.
    async fn find_elements(&mut self, selector: &Selector) -> Result<Vec<ElementRef>>;
    /// Native click on the element.
    async fn click(&mut self, element: &ElementRef) -> Result<()>;
    /// Pointer-move-then-click through a simulated input device.
    async fn pointer_click(&mut self, element: &ElementRef) -> Result<()>;
    /// Deliver a single keypress to the currently focused element.
    async fn send_key(&mut self, key: KeyInput) -> Result<()>;
    /// Run a script against the page; elements are passed as arguments.
    async fn execute(&mut self, script: &str, args: Vec<ScriptArg>) -> Result<Value>;
    /// End the browser session. Idempotence is the caller's concern; the
    /// workflow releases exactly once per invocation.
    async fn release(&mut self) -> Result<()>;
}

/// Options for creating a WebDriver-backed session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// WebDriver service endpoint (chromedriver).
    pub endpoint: String,
    pub headless: bool,
    pub window_size: [u32; 2],
    /// Browser UI language; the target editor localises its controls.
    pub lang: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            headless: true,
            window_size: [1440, 900],
            lang: "ko-KR".to_string(),
        }
    }
}

fn build_chrome_arguments(options: &SessionOptions) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        format!(
            "--window-size={},{}",
            options.window_size[0], options.window_size[1]
        ),
        format!("--lang={}", options.lang),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

/// Production [`BrowserDriver`] backed by a fantoccini WebDriver client.
pub struct ScribeDriver {
    client: Client,
    handles: HashMap<u64, Element>,
    next_handle: u64,
}

impl ScribeDriver {
    /// Create a fresh session against a running WebDriver service.
    pub async fn connect(options: &SessionOptions) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(build_chrome_arguments(options)));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        info!(
            target: "driver.session",
            endpoint = %options.endpoint,
            headless = options.headless,
            "creating browser session"
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&options.endpoint)
            .await?;

        Ok(Self {
            client,
            handles: HashMap::new(),
            next_handle: 1,
        })
    }

    fn register(&mut self, element: Element) -> ElementRef {
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, element);
        ElementRef(id)
    }

    fn resolve(&self, element: &ElementRef) -> Result<&Element> {
        self.handles
            .get(&element.0)
            .ok_or_else(|| anyhow!("stale element handle {}", element.0))
    }
}

#[async_trait]
impl BrowserDriver for ScribeDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        // Element handles do not survive a page load.
        self.handles.clear();
        self.client.goto(url).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn switch_to_root(&mut self) -> Result<()> {
        self.client.clone().enter_frame(None).await?;
        Ok(())
    }

    async fn switch_to_frame(&mut self, frame: &ElementRef) -> Result<()> {
        let element = self.resolve(frame)?.clone();
        element.enter_frame().await?;
        Ok(())
    }

    async fn find_elements(&mut self, selector: &Selector) -> Result<Vec<ElementRef>> {
        let found = match selector {
            Selector::Css(s) => self.client.find_all(Locator::Css(s.as_str())).await?,
            Selector::XPath(s) => self.client.find_all(Locator::XPath(s.as_str())).await?,
        };
        Ok(found.into_iter().map(|el| self.register(el)).collect())
    }

    async fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.resolve(element)?.click().await?;
        Ok(())
    }

    async fn pointer_click(&mut self, element: &ElementRef) -> Result<()> {
        let target = self.resolve(element)?.clone();
        let actions = MouseActions::new("mouse".to_string())
            .then(PointerAction::MoveToElement {
                element: target,
                duration: Some(Duration::from_millis(120)),
                x: 0,
                y: 0,
            })
            .then(PointerAction::Pause {
                duration: Duration::from_millis(60),
            })
            .then(PointerAction::Down {
                button: MOUSE_BUTTON_LEFT,
            })
            .then(PointerAction::Up {
                button: MOUSE_BUTTON_LEFT,
            });
        self.client.perform_actions(actions).await?;
        Ok(())
    }

    async fn send_key(&mut self, key: KeyInput) -> Result<()> {
        let value: char = match key {
            KeyInput::Char(c) => c,
            KeyInput::Enter => Key::Enter.into(),
        };
        let actions = KeyActions::new("keyboard".to_string())
            .then(KeyAction::Down { value })
            .then(KeyAction::Up { value });
        self.client.perform_actions(actions).await?;
        Ok(())
    }

    async fn execute(&mut self, script: &str, args: Vec<ScriptArg>) -> Result<Value> {
        let mut json_args = Vec::with_capacity(args.len());
        for arg in args {
            json_args.push(match arg {
                ScriptArg::Element(r) => serde_json::to_value(self.resolve(&r)?)?,
                ScriptArg::Json(v) => v,
            });
        }
        let value = self.client.execute(script, json_args).await?;
        Ok(value)
    }

    async fn release(&mut self) -> Result<()> {
        debug!(target: "driver.session", "closing browser session");
        self.handles.clear();
        self.client.clone().close().await?;
        Ok(())
    }
}
