//! Best-effort numeric extraction from a rendered price.

/// Parse the amount out of a price string such as `"$12.34"` or `"2,49€"`.
///
/// Keeps only digits, `.` and `,`, turns the first `,` into `.`, then reads
/// the longest leading float (browser `parseFloat` semantics). Thousands
/// separators are not understood: `"1.234,56€"` becomes `"1.234.56"` and
/// reads as `1.234`.
pub fn parse_price(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let normalised = kept.replacen(',', ".", 1);
    parse_float_prefix(&normalised)
}

/// Longest `digits[.digits]` prefix, `None` when no digit is present.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;

    for (position, c) in text.char_indices() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = position + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    text[..end].trim_end_matches('.').parse().ok()
}
