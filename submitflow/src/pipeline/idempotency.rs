//! Idempotency keys for submission persistence.
//!
//! The persistence collaborator deduplicates on the `Idempotency-Key`
//! header. The key comes from the submission metadata when the host supplied
//! one, and is otherwise derived from the submission content so that a
//! resubmission of the same payload carries the same key.

use sha2::{Digest, Sha256};

use crate::config::PipelineConfig;
use crate::context::SubmissionPayload;

/// Header carrying the key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Generates an idempotency key from components.
#[must_use]
pub fn generate_idempotency_key(components: &[&str]) -> String {
    let combined = components.join(":");
    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    let result = hasher.finalize();
    format!("idem:{}", hex::encode(&result[..16]))
}

/// Derives a key from form id, version, submission time and answers.
#[must_use]
pub fn derive_submission_key(payload: &SubmissionPayload) -> String {
    let version = payload.version.to_string();
    let submitted_at = payload.submitted_at.to_string();
    let answers = serde_json::Value::Object(payload.answers.clone()).to_string();
    generate_idempotency_key(&[&payload.form_id, &version, &submitted_at, &answers])
}

/// Key to send with the persistence request, if idempotency is enabled.
///
/// `meta[key]` wins when it holds a non-empty string.
#[must_use]
pub fn resolve_idempotency_key(
    pipeline: &PipelineConfig,
    payload: &SubmissionPayload,
) -> Option<String> {
    let config = pipeline.idempotency.as_ref().filter(|c| c.enabled)?;

    Some(
        payload
            .meta_str(&config.key)
            .map_or_else(|| derive_submission_key(payload), str::to_string),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> SubmissionPayload {
        SubmissionPayload::new("booking", 2)
            .with_submitted_at(1_700_000_000_000)
            .with_answer("name", "Sara")
    }

    #[test]
    fn test_generate_key_is_stable() {
        let a = generate_idempotency_key(&["a", "b"]);
        let b = generate_idempotency_key(&["a", "b"]);
        let c = generate_idempotency_key(&["a", "c"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("idem:"));
        assert_eq!(a.len(), "idem:".len() + 32);
    }

    #[test]
    fn test_disabled_sends_no_key() {
        assert!(resolve_idempotency_key(&PipelineConfig::new(), &payload()).is_none());
    }

    #[test]
    fn test_meta_key_wins() {
        let pipeline = PipelineConfig::new().with_idempotency("requestId");
        let payload = payload().with_meta("requestId", "req-42");

        assert_eq!(
            resolve_idempotency_key(&pipeline, &payload).as_deref(),
            Some("req-42")
        );
    }

    #[test]
    fn test_derived_key_follows_content() {
        let pipeline = PipelineConfig::new().with_idempotency("requestId");

        let first = resolve_idempotency_key(&pipeline, &payload()).unwrap();
        let again = resolve_idempotency_key(&pipeline, &payload()).unwrap();
        let changed =
            resolve_idempotency_key(&pipeline, &payload().with_answer("name", "Omar")).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, changed);
    }
}
