//! Driver layer for browser automation.
//!
//! This crate exposes the browser capability surface the publish workflow
//! drives, plus the resilience primitives that make a shifting editor UI
//! workable:
//!
//! - [`blog_browser::driver::BrowserDriver`]: capability trait over an
//!   automated browser session
//! - [`blog_browser::driver::ScribeDriver`]: WebDriver-backed implementation
//! - [`blog_browser::pacing::PacedTyper`]: human-like typing cadence
//! - [`blog_browser::interact`]: ordered fallback click chain
//! - [`blog_browser::contexts`]: frame topology enumeration
//! - [`blog_browser::poll::DeadlinePoller`]: bounded-time search-and-click
pub mod blog_browser;
