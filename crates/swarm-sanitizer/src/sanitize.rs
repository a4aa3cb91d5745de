//! Recursive redaction of JSON values.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::secrets::SecretSet;

/// Literal replacement for every secret occurrence.
pub const REDACTED: &str = "[REDACTED]";

/// Nesting deeper than this is rejected rather than risking a stack
/// overflow inside the event pipeline.
const MAX_DEPTH: usize = 64;

/// Sanitization failure.
///
/// The event pipeline treats any failure as "drop the event": forwarding an
/// unsanitized event is never acceptable.
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    /// Value nesting exceeded [`MAX_DEPTH`].
    #[error("value nesting exceeds maximum depth of {0}")]
    DepthExceeded(usize),
}

/// Producer of [`SecretSet`] snapshots, swappable for tests and key rotation.
type SecretSource = Box<dyn Fn() -> SecretSet + Send + Sync>;

/// Redacts secret strings from JSON values.
///
/// The secret snapshot is built lazily on first use and cached until
/// [`Sanitizer::reset_cache`]; credential rotation therefore takes effect on
/// the next event after a reset.
pub struct Sanitizer {
    source: SecretSource,
    cache: RwLock<Option<Arc<SecretSet>>>,
}

impl Sanitizer {
    /// Sanitizer backed by the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(Box::new(SecretSet::from_env))
    }

    /// Sanitizer with a custom secret source.
    #[must_use]
    pub fn with_source(source: SecretSource) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
        }
    }

    /// Sanitizer with a fixed set of secret values (no environment access).
    #[must_use]
    pub fn with_secrets(secrets: Vec<String>) -> Self {
        Self::with_source(Box::new(move || SecretSet::from_values(secrets.clone())))
    }

    /// Drop the cached snapshot; the next call rebuilds it from the source.
    pub fn reset_cache(&self) {
        *self.cache.write() = None;
        debug!("secret cache reset");
    }

    /// The current secret snapshot, building it if necessary.
    pub fn secret_set(&self) -> Arc<SecretSet> {
        if let Some(set) = self.cache.read().as_ref() {
            return Arc::clone(set);
        }
        let mut guard = self.cache.write();
        // Another writer may have raced us between the read and the write.
        if let Some(set) = guard.as_ref() {
            return Arc::clone(set);
        }
        let set = Arc::new((self.source)());
        *guard = Some(Arc::clone(&set));
        set
    }

    /// Return a deep copy of `value` with every secret occurrence in every
    /// string leaf replaced by [`REDACTED`]. The input is never mutated.
    pub fn sanitize(&self, value: &Value) -> Result<Value, SanitizeError> {
        let secrets = self.secret_set();
        sanitize_value(value, &secrets, 0)
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_value(
    value: &Value,
    secrets: &SecretSet,
    depth: usize,
) -> Result<Value, SanitizeError> {
    if depth > MAX_DEPTH {
        return Err(SanitizeError::DepthExceeded(MAX_DEPTH));
    }
    Ok(match value {
        Value::String(s) => Value::String(redact_str(s, secrets)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_value(item, secrets, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                let _ = out.insert(key.clone(), sanitize_value(item, secrets, depth + 1)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

/// Replace every secret occurrence in `s`, longest secrets first.
/// Matching is literal and case-sensitive.
fn redact_str(s: &str, secrets: &SecretSet) -> String {
    let mut out = s.to_owned();
    for secret in secrets.secrets() {
        if out.contains(secret.as_str()) {
            out = out.replace(secret.as_str(), REDACTED);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitizer(secrets: &[&str]) -> Sanitizer {
        Sanitizer::with_secrets(secrets.iter().map(|s| (*s).to_owned()).collect())
    }

    #[test]
    fn redacts_string_leaf() {
        let s = sanitizer(&["abcdef12345"]);
        let out = s.sanitize(&json!({"text": "token is abcdef12345 here"})).unwrap();
        assert_eq!(out["text"], "token is [REDACTED] here");
    }

    #[test]
    fn redacts_multiple_distinct_secrets_in_one_string() {
        let s = sanitizer(&["abcdef12345", "ghijklm67890"]);
        let out = s
            .sanitize(&json!({"type": "raw", "text": "TOKEN=abcdef12345 KEY=ghijklm67890"}))
            .unwrap();
        let text = out["text"].as_str().unwrap();
        assert_eq!(text.matches(REDACTED).count(), 2);
        assert!(!text.contains("abcdef12345"));
        assert!(!text.contains("ghijklm67890"));
    }

    #[test]
    fn traverses_arrays_and_nested_objects() {
        let s = sanitizer(&["deep-secret-value"]);
        let out = s
            .sanitize(&json!({
                "items": [{"inner": {"note": "found deep-secret-value inside"}}, "deep-secret-value"]
            }))
            .unwrap();
        assert_eq!(out["items"][0]["inner"]["note"], "found [REDACTED] inside");
        assert_eq!(out["items"][1], REDACTED);
    }

    #[test]
    fn non_string_leaves_pass_through() {
        let s = sanitizer(&["abcdef12345"]);
        let input = json!({"count": 42, "flag": true, "nothing": null, "ratio": 0.5});
        let out = s.sanitize(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn input_is_not_mutated() {
        let s = sanitizer(&["abcdef12345"]);
        let input = json!({"text": "abcdef12345"});
        let _ = s.sanitize(&input).unwrap();
        assert_eq!(input["text"], "abcdef12345");
    }

    #[test]
    fn matching_is_case_sensitive() {
        let s = sanitizer(&["SecretValue99"]);
        let out = s.sanitize(&json!({"text": "secretvalue99 SecretValue99"})).unwrap();
        assert_eq!(out["text"], "secretvalue99 [REDACTED]");
    }

    #[test]
    fn secret_is_not_interpreted_as_regex() {
        let s = sanitizer(&["a.c+e(f)12"]);
        let out = s.sanitize(&json!({"text": "abcdef12 then a.c+e(f)12"})).unwrap();
        assert_eq!(out["text"], "abcdef12 then [REDACTED]");
    }

    #[test]
    fn overlapping_secrets_longest_first() {
        let s = sanitizer(&["prefix12", "prefix12-suffix34"]);
        let out = s.sanitize(&json!({"text": "prefix12-suffix34"})).unwrap();
        assert_eq!(out["text"], REDACTED);
    }

    #[test]
    fn depth_limit_is_an_error() {
        let mut value = json!("leaf");
        for _ in 0..100 {
            value = json!([value]);
        }
        let s = sanitizer(&["abcdef12345"]);
        let err = s.sanitize(&value).unwrap_err();
        assert!(matches!(err, SanitizeError::DepthExceeded(_)));
    }

    #[test]
    fn cache_is_rebuilt_after_reset() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let builds = Arc::new(AtomicUsize::new(0));
        let builds_clone = Arc::clone(&builds);
        let s = Sanitizer::with_source(Box::new(move || {
            let _ = builds_clone.fetch_add(1, Ordering::SeqCst);
            SecretSet::from_values(vec!["rotating-secret".to_owned()])
        }));

        let _ = s.sanitize(&json!("x")).unwrap();
        let _ = s.sanitize(&json!("y")).unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1, "snapshot should be cached");

        s.reset_cache();
        let _ = s.sanitize(&json!("z")).unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2, "reset should force a rebuild");
    }

    #[test]
    fn empty_secret_set_is_identity() {
        let s = sanitizer(&[]);
        let input = json!({"text": "nothing sensitive here"});
        assert_eq!(s.sanitize(&input).unwrap(), input);
    }
}
