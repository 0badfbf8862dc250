//! Small HTML helpers for text-level rewriting.
//!
//! - `escape()` - entity escaping for text and attribute values
//! - `has_balanced_quotes()` - structural check for regex-matched tags

use std::borrow::Cow;

// =============================================================================
// Escaping
// =============================================================================

fn entity(c: char) -> Option<&'static str> {
    Some(match c {
        '<' => "&lt;",
        '>' => "&gt;",
        '&' => "&amp;",
        '"' => "&quot;",
        '\'' => "&#39;",
        _ => return None,
    })
}

/// Escape `<`, `>`, `&` and both quote characters. Borrows when nothing
/// needs escaping.
pub fn escape(s: &str) -> Cow<'_, str> {
    let Some(first) = s.find(|c: char| entity(c).is_some()) else {
        return Cow::Borrowed(s);
    };

    let mut out = String::with_capacity(s.len() + 16);
    out.push_str(&s[..first]);
    for c in s[first..].chars() {
        match entity(c) {
            Some(e) => out.push_str(e),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

// =============================================================================
// Structure
// =============================================================================

/// Check that every quoted attribute value in a tag is closed.
///
/// A regex match that cut a tag in the middle of a quoted value (a `>`
/// inside an attribute) fails this check.
pub fn has_balanced_quotes(tag: &str) -> bool {
    let mut open: Option<char> = None;
    for c in tag.chars() {
        match (open, c) {
            (None, '"' | '\'') => open = Some(c),
            (Some(q), c) if c == q => open = None,
            _ => {}
        }
    }
    open.is_none()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert!(matches!(escape("hello world"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_special_chars() {
        assert_eq!(escape("<script>"), "&lt;script&gt;");
        assert_eq!(escape("a & b"), "a &amp; b");
        assert_eq!(escape("say \"hi\""), "say &quot;hi&quot;");
        assert_eq!(escape("it's"), "it&#39;s");
    }

    #[test]
    fn test_has_balanced_quotes() {
        assert!(has_balanced_quotes(r#"<img src="a.jpg" alt='x'>"#));
        assert!(has_balanced_quotes(r#"<img alt="it's">"#));
        assert!(!has_balanced_quotes(r#"<img alt="a > b"#));
        assert!(!has_balanced_quotes("<img alt='x>"));
    }
}
