//! HTML escaping and the pre-escaped string type.

use std::{fmt::{self, Display},
          ops::Add};

use kstring::KString;

/// Text that is guaranteed to already be HTML-escaped. Rendering
/// emits it verbatim; everything else goes through `escape` first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SafeString(KString);

impl SafeString {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_kstring(self) -> KString {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for SafeString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<SafeString> for KString {
    fn from(s: SafeString) -> Self {
        s.0
    }
}

// Concatenation of two safe strings is safe again.
impl Add for SafeString {
    type Output = SafeString;

    fn add(self, rhs: SafeString) -> SafeString {
        let mut s = String::with_capacity(self.0.len() + rhs.0.len());
        s.push_str(self.0.as_str());
        s.push_str(rhs.0.as_str());
        SafeString(KString::from_string(s))
    }
}

/// Declare `s` to be already escaped, without checking.
pub fn mark_safe(s: impl Into<KString>) -> SafeString {
    SafeString(s.into())
}

/// Escape `s` for use in HTML text content or attribute values.
pub fn escape(s: &str) -> SafeString {
    let mut out = String::with_capacity(s.len());
    escape_into(&mut out, s);
    SafeString(KString::from_string(out))
}

/// Append the escaped form of `s` to `out`.
pub fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
