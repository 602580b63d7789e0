//! Shared-link access keys for unauthenticated personal resources.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use calmux_core::types::UserId;

use crate::collaborators::IdentityDirectory;
use crate::error::ServiceResult;

/// Validates a shared-link access key against a `(requester, resource)` pair.
pub struct AccessGate {
    directory: Arc<dyn IdentityDirectory>,
}

impl AccessGate {
    #[must_use]
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    /// ## Summary
    /// Checks a supplied key against the one stored for
    /// `(user, resource_path)`.
    ///
    /// Returns `Ok(false)` on any mismatch, including an unknown user or a
    /// path with no key; it never turns a mismatch into an error. Callers
    /// translate `false` into an authorization failure.
    ///
    /// ## Errors
    /// Only if the directory lookup itself fails.
    #[tracing::instrument(skip(self, supplied_key))]
    pub async fn check(
        &self,
        user: UserId,
        resource_path: &str,
        supplied_key: &str,
    ) -> ServiceResult<bool> {
        let Some(expected) = self.directory.schedule_key(user, resource_path).await? else {
            return Ok(false);
        };

        Ok(keys_match(&expected, supplied_key))
    }
}

/// Constant-time-equivalent comparison: both sides are hashed so neither
/// key length nor a matching prefix shortens the comparison.
fn keys_match(expected: &str, supplied: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let supplied = Sha256::digest(supplied.as_bytes());

    expected
        .iter()
        .zip(supplied.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
