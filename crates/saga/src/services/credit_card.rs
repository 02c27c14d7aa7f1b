//! Credit card payment service port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Money;

use super::ServiceError;

/// An open authorization held by the payment gateway.
#[derive(Debug, Clone)]
pub struct CreditCardAuthorization {
    /// Reference assigned by the gateway.
    pub external_ref: String,
    /// Handle of the gateway-side pending transaction, used to capture or
    /// void the charge later.
    pub pending_handle: String,
}

/// Trait for the external credit card payment gateway.
#[async_trait]
pub trait CreditCardService: Send + Sync {
    /// Authorizes a charge against a tokenized card.
    async fn authorize(
        &self,
        card_token: &str,
        amount: Money,
    ) -> Result<CreditCardAuthorization, ServiceError>;

    /// Captures a previously authorized charge. Capturing an
    /// already-captured charge is a no-op.
    async fn capture(&self, pending_handle: &str) -> Result<(), ServiceError>;

    /// Voids a previously authorized charge. Voiding an unknown or
    /// already-voided charge is a no-op.
    async fn void(&self, pending_handle: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCreditCardState {
    pending: HashMap<String, (String, Money)>,
    captured: HashMap<String, Money>,
    next_id: u32,
    fail_on_authorize: Option<ServiceError>,
    fail_on_capture: bool,
    fail_on_void: bool,
}

/// In-memory credit card service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCreditCardService {
    state: Arc<RwLock<InMemoryCreditCardState>>,
}

impl InMemoryCreditCardService {
    /// Creates a new in-memory credit card service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the next authorize call to fail with the given error.
    pub fn set_fail_on_authorize(&self, error: Option<ServiceError>) {
        self.state.write().unwrap().fail_on_authorize = error;
    }

    /// Configures the service to fail on the next capture call.
    pub fn set_fail_on_capture(&self, fail: bool) {
        self.state.write().unwrap().fail_on_capture = fail;
    }

    /// Configures the service to fail on the next void call.
    pub fn set_fail_on_void(&self, fail: bool) {
        self.state.write().unwrap().fail_on_void = fail;
    }

    /// Returns the number of open (uncaptured, unvoided) authorizations.
    pub fn pending_count(&self) -> usize {
        self.state.read().unwrap().pending.len()
    }

    /// Returns the number of captured charges.
    pub fn captured_count(&self) -> usize {
        self.state.read().unwrap().captured.len()
    }
}

#[async_trait]
impl CreditCardService for InMemoryCreditCardService {
    async fn authorize(
        &self,
        card_token: &str,
        amount: Money,
    ) -> Result<CreditCardAuthorization, ServiceError> {
        let mut state = self.state.write().unwrap();

        if let Some(error) = state.fail_on_authorize.take() {
            return Err(error);
        }

        state.next_id += 1;
        let external_ref = format!("CC-{:04}", state.next_id);
        let pending_handle = format!("cc-pending-{:04}", state.next_id);
        state
            .pending
            .insert(pending_handle.clone(), (card_token.to_string(), amount));

        Ok(CreditCardAuthorization {
            external_ref,
            pending_handle,
        })
    }

    async fn capture(&self, pending_handle: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_capture {
            return Err(ServiceError::Unavailable("gateway offline".to_string()));
        }

        match state.pending.remove(pending_handle) {
            Some((_, amount)) => {
                state.captured.insert(pending_handle.to_string(), amount);
                Ok(())
            }
            None if state.captured.contains_key(pending_handle) => Ok(()),
            None => Err(ServiceError::argument(
                "pendingHandle",
                format!("unknown pending transaction {pending_handle}"),
            )),
        }
    }

    async fn void(&self, pending_handle: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_void {
            return Err(ServiceError::Unavailable("gateway offline".to_string()));
        }
        state.pending.remove(pending_handle);
        Ok(())
    }
}
