//! Server data embedded into inline `<script>` blocks.
//!
//! Everything the pipeline writes into a snippet goes through [`ScriptJson`],
//! which serializes with `serde_json` and then applies [`script_safe`], so no
//! value can close the surrounding `<script>` element early.

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

/// `<script` / `</script` in any letter case.
static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)(scr)(ipt)").unwrap());

/// Escape sequences that end or confuse a script element.
///
/// `</` becomes `<\/` and `<!--` becomes `<\!--`. Both are identical at
/// runtime inside a JS string literal.
pub fn script_safe(json: &str) -> Cow<'_, str> {
    if !json.contains("</") && !json.contains("<!--") {
        return Cow::Borrowed(json);
    }
    Cow::Owned(json.replace("</", "<\\/").replace("<!--", "<\\!--"))
}

/// A JSON literal that is safe to paste into an inline script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptJson(String);

impl ScriptJson {
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Self(script_safe(&json).into_owned()))
    }

    /// A JSON string literal whose `<script`/`</script` occurrences are split
    /// into concatenated halves (`"<scr" + "ipt"`), for embedding whole
    /// documents.
    pub fn split_string(value: &str) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        let split = SCRIPT_TAG.replace_all(&json, "<${1}${2}\" + \"${3}");
        Ok(Self(script_safe(&split).into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
