//! Secret snapshot derived from the process environment.

/// Secrets shorter than this are ignored. Short values ("1", "true", "dev")
/// would otherwise redact half of every log line.
pub const MIN_SECRET_LEN: usize = 8;

/// Environment keys containing one of these markers name credentials.
const KEY_MARKERS: &[&str] = &[
    "TOKEN",
    "SECRET",
    "KEY",
    "PASSWORD",
    "PASSWD",
    "CREDENTIAL",
    "AUTH",
];

/// A snapshot of secret strings to redact.
///
/// Values are held sorted longest-first so that when one secret is a prefix
/// or substring of another, the longer match is replaced before the shorter
/// one can leave fragments behind.
#[derive(Clone, Debug, Default)]
pub struct SecretSet {
    secrets: Vec<String>,
}

impl SecretSet {
    /// Build a snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build a snapshot from explicit key/value pairs.
    ///
    /// Keys are matched case-insensitively against the credential markers;
    /// values shorter than [`MIN_SECRET_LEN`] are excluded.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut secrets: Vec<String> = pairs
            .into_iter()
            .filter(|(key, value)| is_credential_key(key) && value.len() >= MIN_SECRET_LEN)
            .map(|(_, value)| value)
            .collect();
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    /// Build a snapshot from raw secret values (no key filtering).
    #[must_use]
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self::from_pairs(values.into_iter().map(|v| ("SECRET".to_owned(), v)))
    }

    /// The secret values, longest first.
    #[must_use]
    pub fn secrets(&self) -> &[String] {
        &self.secrets
    }

    /// Number of secrets in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

/// Whether an environment key names a credential.
fn is_credential_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    KEY_MARKERS.iter().any(|marker| upper.contains(marker))
}
