//! Prompt assembly for promo generation.
use serde::{Deserialize, Serialize};

const MAX_VARIANTS: u8 = 5;

/// Store facts the prompt is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoRequest {
    pub store_name: String,
    /// Tone of voice, e.g. "lively" or "cozy".
    pub mood: String,
    #[serde(default)]
    pub store_description: Option<String>,
    #[serde(default)]
    pub location_text: Option<String>,
    /// How many variants to ask for; clamped to 1..=5.
    pub variants: u8,
    /// Output language code, e.g. "ko".
    pub language: String,
}

/// Build the generation prompt. The model is instructed to answer with the
/// exact JSON envelope [`crate::parse_promo_response`] expects.
pub fn build_promo_prompt(request: &PromoRequest) -> String {
    let variants = request.variants.clamp(1, MAX_VARIANTS);
    let description = request
        .store_description
        .as_deref()
        .unwrap_or("not provided");
    let location = request
        .location_text
        .as_deref()
        .unwrap_or("no location information");

    format!(
        r##"Write {variants} promotional blog post variant(s) for a local store. Output language: {language}.
Return ONLY the JSON below, with no code fences and no commentary.

Store facts
- name: {name}
- tone/mood: {mood}
- description: {description}
- location: {location}

Required JSON shape
{{
  "variants": [
    {{
      "headline": "one short headline",
      "body": "2-4 sentences reflecting the store, menu and location",
      "tags": ["#hashtag", "#district", "#menu"],
      "cta": "one sentence inviting a visit, booking or order"
    }}
  ]
}}"##,
        variants = variants,
        language = request.language,
        name = request.store_name,
        mood = request.mood,
        description = description,
        location = location,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PromoRequest {
        PromoRequest {
            store_name: "피자킹".into(),
            mood: "활기찬".into(),
            store_description: Some("석쇠 화덕 피자 전문점".into()),
            location_text: Some("서울 성동구".into()),
            variants: 3,
            language: "ko".into(),
        }
    }

    #[test]
    fn prompt_carries_all_store_facts() {
        let prompt = build_promo_prompt(&request());
        assert!(prompt.contains("피자킹"));
        assert!(prompt.contains("활기찬"));
        assert!(prompt.contains("석쇠 화덕 피자 전문점"));
        assert!(prompt.contains("서울 성동구"));
        assert!(prompt.contains("Output language: ko"));
    }

    #[test]
    fn variant_count_is_clamped() {
        let mut req = request();
        req.variants = 99;
        assert!(build_promo_prompt(&req).contains("Write 5 promotional"));
        req.variants = 0;
        assert!(build_promo_prompt(&req).contains("Write 1 promotional"));
    }

    #[test]
    fn missing_optionals_fall_back_to_placeholders() {
        let mut req = request();
        req.store_description = None;
        req.location_text = None;
        let prompt = build_promo_prompt(&req);
        assert!(prompt.contains("not provided"));
        assert!(prompt.contains("no location information"));
    }
}
