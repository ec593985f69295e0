//! Frame topology enumeration.
//!
//! The editor renders its controls across the page root, root-level
//! iframes, and iframes nested inside a well-known container frame, and the
//! exact placement shifts between page loads. Contexts are therefore
//! re-derived on every search and never cached across workflow steps.
use anyhow::Result;
use tracing::trace;

use super::driver::{BrowserDriver, ElementRef, Selector};

/// Id of the container frame the editor lives in. Not every page has it.
pub const CONTAINER_FRAME_ID: &str = "mainFrame";

/// One navigable frame: a human-readable path label plus the chain of
/// frame elements to enter from the page root. An empty chain is the root
/// itself.
///
/// Each element in `path` was located while its parent context was
/// entered, so replaying the chain from the root is always valid even for
/// nested frames.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub label: String,
    pub path: Vec<ElementRef>,
}

impl FrameContext {
    fn root() -> Self {
        Self {
            label: "root".to_string(),
            path: Vec::new(),
        }
    }
}

/// Enumerate every reachable frame context, freshly, in a deterministic
/// order: the root, root-level iframes in document order, then the
/// container frame and its nested iframes if the container exists.
///
/// The driver is always left positioned at the page root.
pub async fn list_contexts(driver: &mut dyn BrowserDriver) -> Result<Vec<FrameContext>> {
    let mut contexts = vec![FrameContext::root()];

    driver.switch_to_root().await?;
    let top_frames = driver
        .find_elements(&Selector::css("iframe"))
        .await
        .unwrap_or_default();
    for (i, frame) in top_frames.into_iter().enumerate() {
        contexts.push(FrameContext {
            label: format!("root#iframe[{i}]"),
            path: vec![frame],
        });
    }

    // The container frame is optional; absence is not an error.
    if let Ok(containers) = driver
        .find_elements(&Selector::css(format!("#{CONTAINER_FRAME_ID}")))
        .await
    {
        if let Some(container) = containers.into_iter().next() {
            contexts.push(FrameContext {
                label: CONTAINER_FRAME_ID.to_string(),
                path: vec![container],
            });
            if driver.switch_to_frame(&container).await.is_ok() {
                let nested = driver
                    .find_elements(&Selector::css("iframe"))
                    .await
                    .unwrap_or_default();
                for (i, frame) in nested.into_iter().enumerate() {
                    contexts.push(FrameContext {
                        label: format!("{CONTAINER_FRAME_ID}#iframe[{i}]"),
                        path: vec![container, frame],
                    });
                }
            }
        }
    }

    driver.switch_to_root().await?;
    trace!(target: "driver.contexts", count = contexts.len(), "enumerated frame contexts");
    Ok(contexts)
}

/// Position the driver inside `context`, replaying the frame chain from
/// the page root.
pub async fn enter_context(driver: &mut dyn BrowserDriver, context: &FrameContext) -> Result<()> {
    driver.switch_to_root().await?;
    for frame in &context.path {
        driver.switch_to_frame(frame).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    use crate::blog_browser::driver::{KeyInput, ScriptArg};

    /// Simulates a page with two root iframes and a container frame holding
    /// one nested iframe. Handles are stable across enumerations so the
    /// determinism property is observable.
    struct FramedPage {
        at_root: bool,
        in_container: bool,
    }

    impl FramedPage {
        fn new() -> Self {
            Self {
                at_root: true,
                in_container: false,
            }
        }
    }

    const CONTAINER: ElementRef = ElementRef(100);
    const NESTED: ElementRef = ElementRef(200);

    #[async_trait]
    impl BrowserDriver for FramedPage {
        async fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn current_url(&mut self) -> Result<String> {
            Ok(String::new())
        }
        async fn switch_to_root(&mut self) -> Result<()> {
            self.at_root = true;
            self.in_container = false;
            Ok(())
        }
        async fn switch_to_frame(&mut self, frame: &ElementRef) -> Result<()> {
            if *frame == CONTAINER && self.at_root {
                self.at_root = false;
                self.in_container = true;
                Ok(())
            } else if *frame == NESTED && self.in_container {
                self.in_container = false;
                Ok(())
            } else if self.at_root {
                // Plain root-level iframe.
                self.at_root = false;
                Ok(())
            } else {
                anyhow::bail!("no such frame in this context")
            }
        }
        async fn find_elements(&mut self, selector: &Selector) -> Result<Vec<ElementRef>> {
            match selector {
                Selector::Css(s) if s == "iframe" => {
                    if self.at_root {
                        Ok(vec![ElementRef(1), ElementRef(2)])
                    } else if self.in_container {
                        Ok(vec![NESTED])
                    } else {
                        Ok(vec![])
                    }
                }
                Selector::Css(s) if s == "#mainFrame" => {
                    if self.at_root {
                        Ok(vec![CONTAINER])
                    } else {
                        Ok(vec![])
                    }
                }
                _ => Ok(vec![]),
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
            Ok(Value::Null)
        }
        async fn release(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn enumerates_root_top_iframes_container_and_nested() {
        let mut page = FramedPage::new();
        let contexts = list_contexts(&mut page).await.unwrap();
        let labels: Vec<&str> = contexts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "root",
                "root#iframe[0]",
                "root#iframe[1]",
                "mainFrame",
                "mainFrame#iframe[0]"
            ]
        );
        // Driver must end up back at the root.
        assert!(page.at_root);
    }

    #[tokio::test]
    async fn repeated_enumeration_is_identical() {
        let mut page = FramedPage::new();
        let first: Vec<String> = list_contexts(&mut page)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.label)
            .collect();
        let second: Vec<String> = list_contexts(&mut page)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn nested_context_path_replays_from_root() {
        let mut page = FramedPage::new();
        let contexts = list_contexts(&mut page).await.unwrap();
        let nested = contexts
            .iter()
            .find(|c| c.label == "mainFrame#iframe[0]")
            .unwrap();
        assert_eq!(nested.path.len(), 2);
        enter_context(&mut page, nested).await.unwrap();
    }

    /// A page with no container frame still enumerates cleanly.
    struct BareRoot;

    #[async_trait]
    impl BrowserDriver for BareRoot {
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
            anyhow::bail!("no frames")
        }
        async fn find_elements(&mut self, _selector: &Selector) -> Result<Vec<ElementRef>> {
            Ok(vec![])
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
            Ok(Value::Null)
        }
        async fn release(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_container_frame_is_not_an_error() {
        let mut page = BareRoot;
        let contexts = list_contexts(&mut page).await.unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].label, "root");
        assert!(contexts[0].path.is_empty());
    }
}
