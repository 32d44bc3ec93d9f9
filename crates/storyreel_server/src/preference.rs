//! Deterministic choice among installed models.

/// Ordered candidate model identifiers, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPreferenceList(Vec<String>);

const BUILTIN: &[&str] = &[
    "qwen2.5:3b",
    "qwen2.5:7b",
    "qwen2.5:1.5b",
    "qwen2.5:14b",
    "llama3.2:3b",
    "llama3.2:1b",
    "llama3.1:8b",
    "gemma2:2b",
    "gemma2:9b",
    "gemma3:4b",
    "phi3:3.8b",
    "mistral:7b",
];

impl Default for ModelPreferenceList {
    fn default() -> Self {
        Self(BUILTIN.iter().map(|s| s.to_string()).collect())
    }
}

impl ModelPreferenceList {
    /// A custom preference order.
    pub fn new<I, S>(preferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(preferences.into_iter().map(Into::into).collect())
    }

    /// Preferences in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Walk the preferences in order and return the first installed match.
    ///
    /// An installed name matches a preference if it is equal to it, equal to
    /// `<preference>:latest`, or starts with the preference's pre-colon base.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyreel_server::ModelPreferenceList;
    ///
    /// let prefs = ModelPreferenceList::new(["qwen2.5:3b", "llama3.2:3b", "llama3.2:1b", "mistral:7b"]);
    /// let installed = ["llama3.2:1b".to_string(), "mistral:7b".to_string()];
    /// assert_eq!(prefs.select(&installed).as_deref(), Some("llama3.2:1b"));
    /// ```
    pub fn select(&self, installed: &[String]) -> Option<String> {
        self.0.iter().find_map(|preferred| {
            let base = preferred.split(':').next().unwrap_or(preferred);
            let latest = format!("{preferred}:latest");
            installed
                .iter()
                .find(|m| *m == preferred || **m == latest || m.starts_with(base))
                .cloned()
        })
    }
}
