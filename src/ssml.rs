//! Markup document assembly for synthesis requests.

/// Options for one speak request.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpeakOptions {
    pub text: String,
    /// Voice selection.
    pub identifier: String,
    pub role: String,
    pub style: String,
}

/// Escape the five XML metacharacters.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Build the markup document submitted to the engine.
///
/// The escaped text is wrapped in an expressive-style element when `role` or
/// `style` is non-empty, then in the voice element, then in the fixed
/// namespace envelope. Output is well-formed for any input text.
pub fn build_document(text: &str, voice_id: &str, role: &str, style: &str) -> String {
    let escaped = escape_text(text);

    let inner = if !role.is_empty() || !style.is_empty() {
        let mut attrs = String::new();
        if !role.is_empty() {
            attrs.push_str(&format!(" role=\"{}\"", role));
        }
        if !style.is_empty() {
            attrs.push_str(&format!(" style=\"{}\"", style));
        }
        format!("<mstts:express-as{}>{}</mstts:express-as>", attrs, escaped)
    } else {
        escaped
    };

    format!(
        "<speak version='1.0' xml:lang='en-US' \
         xmlns='http://www.w3.org/2001/10/synthesis' \
         xmlns:mstts='http://www.w3.org/2001/mstts'>\
         <voice name='{}'>{}</voice></speak>",
        voice_id, inner
    )
}
