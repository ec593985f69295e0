//! Catalogue of URLs, selectors and page scripts for the Naver Blog editor.
//!
//! Everything the workflow knows about the target UI lives here so a markup
//! change is a one-file fix. XPath is used where a control is only
//! identifiable by its localised label text; the editor ships Korean
//! strings regardless of browser language.
use scribe_drivers::blog_browser::driver::Selector;

pub const LOGIN_URL: &str = "https://nid.naver.com/nidlogin.login";

/// Substring the URL keeps while the login form is still showing.
pub const LOGIN_PATH_MARKER: &str = "nidlogin";

pub fn write_url(blog_id: &str) -> String {
    format!("https://blog.naver.com/{blog_id}?Redirect=Write")
}

pub fn login_id_field() -> Selector {
    Selector::css("#id")
}

pub fn login_pw_field() -> Selector {
    Selector::css("#pw")
}

pub fn login_submit() -> Selector {
    Selector::css("#log\\.login")
}

/// The editor renders inside this container frame.
pub fn editor_frame() -> Selector {
    Selector::css("#mainFrame")
}

/// "You have a draft in progress." dialog, present only when a previous
/// session left an unsaved draft behind.
pub fn draft_popup() -> Selector {
    Selector::xpath(
        "//div[contains(@class,'se-popup-container') and \
         .//strong[normalize-space()='작성 중인 글이 있습니다.']]",
    )
}

pub fn draft_popup_cancel() -> Selector {
    Selector::xpath(
        "//div[contains(@class,'se-popup-container')]\
         //button[contains(@class,'se-popup-button-cancel') and \
         .//span[normalize-space()='취소']]",
    )
}

/// Title placeholder span; clicking it focuses the title field.
pub fn title_placeholder() -> Selector {
    Selector::xpath(
        "//div[contains(@class,'se-title-text')]\
         //span[contains(@class,'se-placeholder') and contains(@class,'se-fs32')]",
    )
}

/// First-run help panel that sometimes overlays the editor.
pub fn help_panel() -> Selector {
    Selector::xpath("//article[contains(@class,'se-help-panel')]")
}

pub fn help_panel_close() -> Selector {
    Selector::xpath(
        "//article[contains(@class,'se-help-panel')]\
         //button[contains(@class,'se-help-panel-close-button')]",
    )
}

/// First-stage publish button in the editor toolbar ('발행' = publish).
pub fn first_publish_button() -> Selector {
    Selector::xpath("//span[normalize-space()='발행']/ancestor::button")
}

/// Candidate selectors for the final confirmation button, in priority
/// order. Which one exists depends on the layout variant the page served.
pub fn final_publish_candidates() -> Vec<Selector> {
    vec![
        Selector::xpath("//button[@data-testid='seOnePublishBtn']"),
        Selector::xpath("//button[contains(@class,'confirm_btn') and .//span[normalize-space()='발행']]"),
        Selector::xpath("//div[contains(@class,'popup_blog')]//button[.//span[normalize-space()='발행']]"),
        Selector::xpath("//div[@role='dialog']//button[.//span[normalize-space()='발행']]"),
    ]
}

/// The confirmation button again, used to wait for it to disappear after a
/// successful final click.
pub fn final_confirm_button() -> Selector {
    Selector::xpath("//button[@data-testid='seOnePublishBtn']")
}

/// Paste-like value assignment for the login fields. Typing the secret
/// character by character would leave it in keystroke timing side channels
/// and trip the login form's input watchers.
pub const SET_FIELD_VALUE: &str = "arguments[0].value = arguments[1];";

/// Reports whether focus has actually moved into the body region after the
/// title's end-of-line keypress. The editor occasionally swallows it.
pub const FOCUS_IN_BODY: &str = r#"
const a = document.activeElement;
if (!a) return false;
const inBody = a.closest && a.closest("div[data-a11y-title='본문'], .se-component.se-text");
const isParagraph = a.matches && a.matches("p.se-text-paragraph, [contenteditable='true'], [role='textbox']");
return !!(inBody || isParagraph);
"#;
