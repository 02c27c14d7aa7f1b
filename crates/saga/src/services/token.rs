//! Admission token verifier port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::ServiceError;

/// The claims of a successfully verified admission token.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub token: String,
    pub issuer: String,
    pub scope: String,
}

/// Trait for the external admission-token issuer.
///
/// Verification covers the signature and the issuer; the saga checks the
/// scope against the transaction being started.
#[async_trait]
pub trait AdmissionTokenVerifier: Send + Sync {
    /// Verifies a raw token and returns its claims.
    async fn verify(&self, token: &str) -> Result<VerifiedToken, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryTokenState {
    issued: HashMap<String, String>,
}

/// In-memory verifier for testing: tokens "issued" through it verify,
/// everything else fails.
#[derive(Debug, Clone)]
pub struct InMemoryAdmissionTokenVerifier {
    issuer: String,
    state: Arc<RwLock<InMemoryTokenState>>,
}

impl InMemoryAdmissionTokenVerifier {
    /// Creates a verifier for the given issuer.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            state: Arc::new(RwLock::new(InMemoryTokenState::default())),
        }
    }

    /// Issues a token with the given scope.
    pub fn issue(&self, token: impl Into<String>, scope: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .issued
            .insert(token.into(), scope.into());
    }
}

#[async_trait]
impl AdmissionTokenVerifier for InMemoryAdmissionTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, ServiceError> {
        let state = self.state.read().unwrap();
        match state.issued.get(token) {
            Some(scope) => Ok(VerifiedToken {
                token: token.to_string(),
                issuer: self.issuer.clone(),
                scope: scope.clone(),
            }),
            None => Err(ServiceError::argument(
                "passportToken",
                "token signature verification failed",
            )),
        }
    }
}
