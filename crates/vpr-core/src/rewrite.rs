/// Original short link -> replacement, in first-seen text order.
///
/// `None` means "leave the original". A key is recorded once; inserting it
/// again keeps the first replacement so duplicates in the text agree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewritePlan {
    entries: Vec<(String, Option<String>)>,
}

impl RewritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `original`. Returns false if it was already planned.
    pub fn insert(&mut self, original: impl Into<String>, replacement: Option<String>) -> bool {
        let original = original.into();
        if original.is_empty() || self.contains(&original) {
            return false;
        }
        self.entries.push((original, replacement));
        true
    }

    pub fn contains(&self, original: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == original)
    }

    pub fn replacement(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == original)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys that actually get replaced.
    pub fn replaced_count(&self) -> usize {
        self.entries.iter().filter(|(_, v)| v.is_some()).count()
    }

    /// Substitute every occurrence of each planned link in one left-to-right
    /// pass, showing replacements without their scheme.
    ///
    /// Text produced by a replacement is never scanned again, and at each
    /// position the longest planned key wins, so `/Ab` can't eat into `/Ab12`.
    pub fn apply(&self, text: &str) -> String {
        if self.entries.is_empty() {
            return text.to_string();
        }

        let mut keys: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| {
                let shown = v.as_deref().map(strip_scheme).unwrap_or(k.as_str());
                (k.as_str(), shown)
            })
            .collect();
        keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(ch) = rest.chars().next() {
            if let Some((key, shown)) = keys.iter().find(|(k, _)| rest.starts_with(k)) {
                out.push_str(shown);
                rest = &rest[key.len()..];
            } else {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
        out
    }
}

/// `https://vplink.in/X` -> `vplink.in/X`.
pub fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}
