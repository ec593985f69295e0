//! Human-like typing cadence.
//!
//! The editor tolerates pasted text poorly and the platform watches for
//! robotic input, so text is delivered one keypress at a time with
//! randomised pauses. Pauses are drawn uniformly from configured ranges;
//! the character sequence itself is never altered by pacing.
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;

use super::driver::{BrowserDriver, KeyInput};

/// Pause ranges (milliseconds) for one kind of text entry.
///
/// Titles and body text use different per-character ranges; the end-of-line
/// range is larger to mimic a writing pause.
#[derive(Debug, Clone, Copy)]
pub struct PacingProfile {
    pub char_pause_ms: [u64; 2],
    pub line_pause_ms: [u64; 2],
}

impl PacingProfile {
    /// Default cadence for title entry.
    pub fn title() -> Self {
        Self {
            char_pause_ms: [30, 100],
            line_pause_ms: [150, 350],
        }
    }

    /// Default cadence for body text.
    pub fn body() -> Self {
        Self {
            char_pause_ms: [20, 80],
            line_pause_ms: [150, 350],
        }
    }
}

/// Types text through a [`BrowserDriver`] with randomised pacing.
///
/// Focus must already be on the target editable region; the typer does not
/// manage focus.
pub struct PacedTyper {
    profile: PacingProfile,
    rng: StdRng,
}

impl PacedTyper {
    pub fn new(profile: PacingProfile) -> Self {
        Self {
            profile,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic pacing for tests. The emitted characters are identical
    /// for every seed; only the latency differs.
    pub fn with_seed(profile: PacingProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Deliver `text` as individual keypresses with per-character pauses.
    pub async fn type_text(&mut self, driver: &mut dyn BrowserDriver, text: &str) -> Result<()> {
        for ch in text.chars() {
            driver.send_key(KeyInput::Char(ch)).await?;
            let pause = self.sample(self.profile.char_pause_ms);
            sleep(pause).await;
        }
        Ok(())
    }

    /// Deliver an end-of-line keypress followed by a longer writing pause.
    pub async fn press_enter(&mut self, driver: &mut dyn BrowserDriver) -> Result<()> {
        driver.send_key(KeyInput::Enter).await?;
        let pause = self.sample(self.profile.line_pause_ms);
        sleep(pause).await;
        Ok(())
    }

    fn sample(&mut self, range: [u64; 2]) -> Duration {
        let [lo, hi] = range;
        let upper = hi.max(lo);
        Duration::from_millis(self.rng.gen_range(lo..=upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    use crate::blog_browser::driver::{ElementRef, ScriptArg, Selector};

    /// Records every keypress it receives; all other capabilities are unused.
    #[derive(Default)]
    struct KeySink {
        keys: Vec<KeyInput>,
    }

    #[async_trait]
    impl BrowserDriver for KeySink {
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
        async fn find_elements(&mut self, _selector: &Selector) -> Result<Vec<ElementRef>> {
            Ok(vec![])
        }
        async fn click(&mut self, _element: &ElementRef) -> Result<()> {
            Ok(())
        }
        async fn pointer_click(&mut self, _element: &ElementRef) -> Result<()> {
            Ok(())
        }
        async fn send_key(&mut self, key: KeyInput) -> Result<()> {
            self.keys.push(key);
            Ok(())
        }
        async fn execute(&mut self, _script: &str, _args: Vec<ScriptArg>) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn release(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn typed_string(keys: &[KeyInput]) -> String {
        keys.iter()
            .map(|k| match k {
                KeyInput::Char(c) => *c,
                KeyInput::Enter => '\n',
            })
            .collect()
    }

    #[tokio::test]
    async fn content_is_identical_regardless_of_seed() {
        let text = "Hédy's café — 우리 동네 맛집!";
        for seed in [0u64, 1, 42, 9999] {
            let mut sink = KeySink::default();
            let mut typer = PacedTyper::with_seed(
                PacingProfile {
                    char_pause_ms: [0, 1],
                    line_pause_ms: [0, 1],
                },
                seed,
            );
            typer.type_text(&mut sink, text).await.unwrap();
            assert_eq!(typed_string(&sink.keys), text);
        }
    }

    #[tokio::test]
    async fn enter_is_a_single_keypress() {
        let mut sink = KeySink::default();
        let mut typer = PacedTyper::with_seed(
            PacingProfile {
                char_pause_ms: [0, 0],
                line_pause_ms: [0, 0],
            },
            7,
        );
        typer.press_enter(&mut sink).await.unwrap();
        assert_eq!(sink.keys, vec![KeyInput::Enter]);
    }

    #[tokio::test]
    async fn degenerate_range_does_not_panic() {
        let mut sink = KeySink::default();
        let mut typer = PacedTyper::with_seed(
            PacingProfile {
                char_pause_ms: [5, 5],
                line_pause_ms: [5, 2],
            },
            3,
        );
        typer.type_text(&mut sink, "ab").await.unwrap();
        typer.press_enter(&mut sink).await.unwrap();
        assert_eq!(typed_string(&sink.keys), "ab\n");
    }
}
