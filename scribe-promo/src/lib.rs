//! Promo copy generation for linked stores.
//!
//! Turns store facts (name, mood, description, location) into a prompt,
//! asks the Gemini REST API for a strict-JSON answer, and parses the
//! returned variants. Model output that is not valid JSON is handed back
//! raw rather than dropped; the caller decides what to do with it.
//!
//! - [`prompt::PromoRequest`] and [`prompt::build_promo_prompt`]
//! - [`gemini::GeminiClient`]: the REST client
//! - [`PromoOutput`]: parsed variants or the raw model text
pub mod gemini;
pub mod prompt;

use serde::{Deserialize, Serialize};

/// One generated promo variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoVariant {
    pub headline: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cta: String,
}

/// Result of a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoOutput {
    Variants(Vec<PromoVariant>),
    /// The model answered, but not with the requested JSON shape.
    Raw(String),
}

/// Failures of the promo generator.
#[derive(thiserror::Error, Debug)]
pub enum PromoError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("model returned an empty response")]
    Empty,

    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Deserialize)]
struct VariantsEnvelope {
    variants: Vec<PromoVariant>,
}

/// Parse the model's answer, tolerating markdown code fences around the
/// JSON. Anything that does not deserialize cleanly comes back as raw text.
pub fn parse_promo_response(raw: &str) -> Result<PromoOutput, PromoError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PromoError::Empty);
    }

    let body = strip_code_fences(trimmed);
    match serde_json::from_str::<VariantsEnvelope>(body) {
        Ok(envelope) if !envelope.variants.is_empty() => {
            Ok(PromoOutput::Variants(envelope.variants))
        }
        _ => Ok(PromoOutput::Raw(trimmed.to_string())),
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let Some(inner) = raw.strip_prefix("```") else {
        return raw;
    };
    let inner = inner
        .strip_prefix("json")
        .or_else(|| inner.strip_prefix("JSON"))
        .unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r##"{"variants":[{"headline":"h","body":"b","tags":["#t"],"cta":"c"}]}"##;

    #[test]
    fn parses_plain_json() {
        let out = parse_promo_response(VALID).unwrap();
        match out {
            PromoOutput::Variants(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].headline, "h");
            }
            other => panic!("expected variants, got {other:?}"),
        }
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = format!("```json\n{VALID}\n```");
        let out = parse_promo_response(&fenced).unwrap();
        assert!(matches!(out, PromoOutput::Variants(_)));
    }

    #[test]
    fn non_json_comes_back_raw() {
        let out = parse_promo_response("Here are three great slogans!").unwrap();
        assert_eq!(
            out,
            PromoOutput::Raw("Here are three great slogans!".to_string())
        );
    }

    #[test]
    fn empty_answer_is_an_error() {
        assert!(matches!(parse_promo_response("  \n"), Err(PromoError::Empty)));
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let out =
            parse_promo_response(r#"{"variants":[{"headline":"h","body":"b","cta":"c"}]}"#)
                .unwrap();
        match out {
            PromoOutput::Variants(v) => assert!(v[0].tags.is_empty()),
            other => panic!("expected variants, got {other:?}"),
        }
    }
}
