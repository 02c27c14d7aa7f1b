//! Discount ticket service port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{DiscountTicketUnit, Money};

use super::ServiceError;

/// A discount-ticket authorization held by the issuer.
#[derive(Debug, Clone)]
pub struct DiscountTicketAuthorization {
    /// Reference assigned by the issuer.
    pub external_ref: String,
    /// The monetary share of the price the tickets cover.
    pub amount: Money,
}

/// Trait for the external discount-ticket issuer.
#[async_trait]
pub trait DiscountTicketService: Send + Sync {
    /// Authorizes the given units against the issuer for the claimed
    /// amount.
    async fn authorize(
        &self,
        units: &[DiscountTicketUnit],
        amount: Money,
    ) -> Result<DiscountTicketAuthorization, ServiceError>;

    /// Releases an authorization. Releasing an unknown or
    /// already-released authorization is a no-op.
    async fn cancel(&self, external_ref: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryDiscountTicketState {
    authorized: HashMap<String, Vec<DiscountTicketUnit>>,
    next_id: u32,
    fail_on_authorize: Option<ServiceError>,
}

/// In-memory discount-ticket service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiscountTicketService {
    state: Arc<RwLock<InMemoryDiscountTicketState>>,
}

impl InMemoryDiscountTicketService {
    /// Creates a new in-memory discount-ticket service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the next authorize call to fail with the given error.
    pub fn set_fail_on_authorize(&self, error: Option<ServiceError>) {
        self.state.write().unwrap().fail_on_authorize = error;
    }

    /// Returns the number of open authorizations.
    pub fn authorized_count(&self) -> usize {
        self.state.read().unwrap().authorized.len()
    }
}

#[async_trait]
impl DiscountTicketService for InMemoryDiscountTicketService {
    async fn authorize(
        &self,
        units: &[DiscountTicketUnit],
        amount: Money,
    ) -> Result<DiscountTicketAuthorization, ServiceError> {
        let mut state = self.state.write().unwrap();

        if let Some(error) = state.fail_on_authorize.take() {
            return Err(error);
        }
        if units.is_empty() {
            return Err(ServiceError::argument("units", "no units to authorize"));
        }

        state.next_id += 1;
        let external_ref = format!("DT-{:04}", state.next_id);
        state.authorized.insert(external_ref.clone(), units.to_vec());

        Ok(DiscountTicketAuthorization {
            external_ref,
            amount,
        })
    }

    async fn cancel(&self, external_ref: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        state.authorized.remove(external_ref);
        Ok(())
    }
}
