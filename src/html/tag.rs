//! Attribute access inside one matched start tag.
//!
//! Operates on the raw tag text (`<img src="a.jpg" alt='x'>`). Lookups are
//! case-insensitive on the attribute name; edits keep every other byte of the
//! tag as it was.

use std::ops::Range;

/// One attribute with its byte range in the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr<'a> {
    pub name: &'a str,
    /// `None` for a bare boolean attribute.
    pub value: Option<&'a str>,
    /// Covers `name`, `=` and the quoted value.
    pub span: Range<usize>,
}

/// Scan every attribute of a start tag.
pub fn attrs(tag: &str) -> Vec<Attr<'_>> {
    let bytes = tag.as_bytes();
    let mut i = 0;

    // Skip `<name`
    if bytes.first() == Some(&b'<') {
        i = 1;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
            i += 1;
        }
    }

    let mut out = Vec::new();
    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' {
            break;
        }

        let start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = &tag[start..i];
        if name.is_empty() {
            // Stray `=` or similar; step over it.
            i += 1;
            continue;
        }

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            out.push(Attr {
                name,
                value: None,
                span: start..i,
            });
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let (value, end) = match bytes.get(j) {
            Some(&q @ (b'"' | b'\'')) => {
                let close = tag[j + 1..].find(q as char).map_or(tag.len(), |k| j + 1 + k);
                (&tag[j + 1..close], (close + 1).min(tag.len()))
            }
            _ => {
                let mut k = j;
                while k < bytes.len() && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    k += 1;
                }
                (&tag[j..k], k)
            }
        };
        out.push(Attr {
            name,
            value: Some(value),
            span: start..end,
        });
        i = end;
    }
    out
}

fn find<'a>(tag: &'a str, name: &str) -> Option<Attr<'a>> {
    attrs(tag)
        .into_iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
}

/// Value of `name`; `Some("")` for a boolean attribute.
pub fn get<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    find(tag, name).map(|a| a.value.unwrap_or(""))
}

pub fn has(tag: &str, name: &str) -> bool {
    find(tag, name).is_some()
}

/// Whether `name` is present and its value equals `expected` ignoring case.
pub fn is(tag: &str, name: &str, expected: &str) -> bool {
    get(tag, name).is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
}

/// `name="value"`, single-quoted when the value holds a double quote.
fn render(name: &str, value: &str) -> String {
    if value.contains('"') {
        format!("{name}='{value}'")
    } else {
        format!("{name}=\"{value}\"")
    }
}

/// Byte offset of the tag's closing `>` or `/>`.
fn end_offset(tag: &str) -> usize {
    let trimmed = tag.trim_end();
    let body = trimmed.strip_suffix('>').unwrap_or(trimmed);
    let body = body.strip_suffix('/').unwrap_or(body);
    body.trim_end().len()
}

/// Append raw attribute text (e.g. `loading="lazy"`) before the tag end.
pub fn append(tag: &str, text: &str) -> String {
    let at = end_offset(tag);
    let mut out = String::with_capacity(tag.len() + text.len() + 1);
    out.push_str(&tag[..at]);
    out.push(' ');
    out.push_str(text);
    out.push_str(&tag[at..]);
    out
}

/// Set `name` to `value`, replacing it in place or appending it.
pub fn set(tag: &str, name: &str, value: &str) -> String {
    match find(tag, name) {
        Some(attr) => {
            let mut out = String::with_capacity(tag.len() + value.len());
            out.push_str(&tag[..attr.span.start]);
            out.push_str(&render(name, value));
            out.push_str(&tag[attr.span.end..]);
            out
        }
        None => append(tag, &render(name, value)),
    }
}

/// Remove `name` and the whitespace before it.
pub fn remove(tag: &str, name: &str) -> String {
    let Some(attr) = find(tag, name) else {
        return tag.to_string();
    };
    let start = tag[..attr.span.start].trim_end().len();
    let mut out = String::with_capacity(tag.len());
    out.push_str(&tag[..start]);
    out.push_str(&tag[attr.span.end..]);
    out
}

/// Rename `from` to `to`, keeping its value and position.
pub fn rename(tag: &str, from: &str, to: &str) -> String {
    let Some(attr) = find(tag, from) else {
        return tag.to_string();
    };
    let rendered = match attr.value {
        Some(v) => render(to, v),
        None => to.to_string(),
    };
    let mut out = String::with_capacity(tag.len() + to.len());
    out.push_str(&tag[..attr.span.start]);
    out.push_str(&rendered);
    out.push_str(&tag[attr.span.end..]);
    out
}

/// Add a class to the `class` attribute, creating it when absent.
pub fn add_class(tag: &str, class: &str) -> String {
    match get(tag, "class") {
        Some(existing) if existing.split_whitespace().any(|c| c == class) => tag.to_string(),
        Some(existing) if !existing.trim().is_empty() => {
            set(tag, "class", &format!("{} {class}", existing.trim_end()))
        }
        _ => set(tag, "class", class),
    }
}

/// Attribute names and values, names lowercased.
pub fn to_map(tag: &str) -> rustc_hash::FxHashMap<String, String> {
    attrs(tag)
        .into_iter()
        .map(|a| (a.name.to_ascii_lowercase(), a.value.unwrap_or("").to_string()))
        .collect()
}
