//! Seat reservation service port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, ReservedSeat, SeatOfferRequest, TicketType};

use super::ServiceError;

/// A hold the reservation service keeps on a set of seats.
#[derive(Debug, Clone)]
pub struct SeatHold {
    /// Reference assigned by the reservation service.
    pub external_ref: String,
    /// Total price the seller requires for the held seats.
    pub price: Money,
    /// Points the held seats require in addition to the price.
    pub point_requirement: i64,
    pub seats: Vec<ReservedSeat>,
}

/// Trait for the external seat reservation system.
#[async_trait]
pub trait SeatReservationService: Send + Sync {
    /// Places a temporary hold on the requested seats and prices them.
    async fn start(&self, requested_seats: &[SeatOfferRequest]) -> Result<SeatHold, ServiceError>;

    /// Releases a hold. Releasing an unknown or already-released hold is
    /// a no-op.
    async fn cancel(&self, external_ref: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemorySeatReservationState {
    ticket_types: HashMap<String, TicketType>,
    holds: HashMap<String, Vec<ReservedSeat>>,
    next_id: u32,
    fail_on_start: bool,
    fail_on_cancel: bool,
}

/// In-memory seat reservation service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeatReservationService {
    state: Arc<RwLock<InMemorySeatReservationState>>,
}

impl InMemorySeatReservationService {
    /// Creates a new in-memory seat reservation service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ticket type the service can price seats with.
    pub fn register_ticket_type(&self, ticket_type: TicketType) {
        self.state
            .write()
            .unwrap()
            .ticket_types
            .insert(ticket_type.code.clone(), ticket_type);
    }

    /// Configures the service to fail on the next start call.
    pub fn set_fail_on_start(&self, fail: bool) {
        self.state.write().unwrap().fail_on_start = fail;
    }

    /// Configures the service to fail on the next cancel call.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Returns the number of active holds.
    pub fn hold_count(&self) -> usize {
        self.state.read().unwrap().holds.len()
    }
}

#[async_trait]
impl SeatReservationService for InMemorySeatReservationService {
    async fn start(&self, requested_seats: &[SeatOfferRequest]) -> Result<SeatHold, ServiceError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_start {
            return Err(ServiceError::Unavailable(
                "reservation system offline".to_string(),
            ));
        }

        let mut seats = Vec::with_capacity(requested_seats.len());
        for request in requested_seats {
            let ticket_type = state
                .ticket_types
                .get(&request.ticket_type_code)
                .cloned()
                .ok_or_else(|| {
                    ServiceError::argument(
                        "ticketTypeCode",
                        format!("unknown ticket type {}", request.ticket_type_code),
                    )
                })?;
            seats.push(ReservedSeat {
                event_id: request.event_id.clone(),
                seat_number: request.seat_number.clone(),
                ticket_type,
            });
        }

        let price = seats.iter().map(|seat| seat.ticket_type.charge).sum();
        let point_requirement = seats
            .iter()
            .map(|seat| seat.ticket_type.point_requirement)
            .sum();

        state.next_id += 1;
        let external_ref = format!("HOLD-{:04}", state.next_id);
        state.holds.insert(external_ref.clone(), seats.clone());

        Ok(SeatHold {
            external_ref,
            price,
            point_requirement,
            seats,
        })
    }

    async fn cancel(&self, external_ref: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_cancel {
            return Err(ServiceError::Unavailable(
                "reservation system offline".to_string(),
            ));
        }
        state.holds.remove(external_ref);
        Ok(())
    }
}
