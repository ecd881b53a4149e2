//! Operator notification templates.

/// Escape text for inclusion in an HTML-mode chat message.
///
/// Submitted values are untrusted; without escaping, a crafted phone
/// number could inject markup into the operator chat.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Chat message announcing a new phone submission.
pub fn submission_message(phone_number: &str, country: &str) -> String {
    format!(
        "New phone submission:\n📱 Phone: {}\n🌍 Country: {}",
        escape_html(phone_number),
        escape_html(country)
    )
}

/// Question text for a code verification approval poll.
///
/// Poll questions are plain text, not HTML, so the values go in as-is.
pub fn poll_question(phone_number: &str, verification_code: &str) -> String {
    format!(
        "Code verification\n📱 {}\n🔐 Code: {}",
        phone_number, verification_code
    )
}
