//! Points ledger service port and in-memory implementation.
//!
//! The ledger holds point accounts and two-phase transactions over them:
//! a withdrawal hold backs a point payment, a deposit hold backs an
//! incentive award. Both settle or void through their pending handle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::ServiceError;

/// An open hold on a point account.
#[derive(Debug, Clone)]
pub struct AccountHold {
    /// Reference assigned by the ledger.
    pub external_ref: String,
    /// Handle of the ledger-side pending transaction.
    pub pending_handle: String,
}

/// Trait for the external points ledger.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Opens a withdrawal hold (a point payment being authorized).
    async fn authorize_withdrawal(
        &self,
        account_number: &str,
        point_amount: i64,
    ) -> Result<AccountHold, ServiceError>;

    /// Opens a deposit hold (an incentive award being authorized).
    async fn authorize_deposit(
        &self,
        account_number: &str,
        point_amount: i64,
    ) -> Result<AccountHold, ServiceError>;

    /// Settles a hold, moving the points. Settling an already-settled
    /// hold is a no-op.
    async fn settle(&self, pending_handle: &str) -> Result<(), ServiceError>;

    /// Voids a hold. Voiding an unknown or already-voided hold is a
    /// no-op.
    async fn void(&self, pending_handle: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldDirection {
    Withdrawal,
    Deposit,
}

#[derive(Debug)]
struct PendingHold {
    account_number: String,
    point_amount: i64,
    direction: HoldDirection,
}

#[derive(Debug, Default)]
struct InMemoryAccountState {
    balances: HashMap<String, i64>,
    pending: HashMap<String, PendingHold>,
    settled: Vec<String>,
    next_id: u32,
    fail_on_settle: bool,
    fail_on_void: bool,
}

/// In-memory points ledger for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountService {
    state: Arc<RwLock<InMemoryAccountState>>,
}

impl InMemoryAccountService {
    /// Creates a new in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an account's balance.
    pub fn set_balance(&self, account_number: &str, balance: i64) {
        self.state
            .write()
            .unwrap()
            .balances
            .insert(account_number.to_string(), balance);
    }

    /// Returns an account's settled balance.
    pub fn balance(&self, account_number: &str) -> i64 {
        *self
            .state
            .read()
            .unwrap()
            .balances
            .get(account_number)
            .unwrap_or(&0)
    }

    /// Returns the number of open holds.
    pub fn pending_count(&self) -> usize {
        self.state.read().unwrap().pending.len()
    }

    /// Configures the ledger to fail on the next settle call.
    pub fn set_fail_on_settle(&self, fail: bool) {
        self.state.write().unwrap().fail_on_settle = fail;
    }

    /// Configures the ledger to fail on the next void call.
    pub fn set_fail_on_void(&self, fail: bool) {
        self.state.write().unwrap().fail_on_void = fail;
    }

    fn open_hold(
        &self,
        account_number: &str,
        point_amount: i64,
        direction: HoldDirection,
    ) -> Result<AccountHold, ServiceError> {
        let mut state = self.state.write().unwrap();

        if point_amount <= 0 {
            return Err(ServiceError::argument(
                "pointAmount",
                "point amount must be positive",
            ));
        }

        if direction == HoldDirection::Withdrawal {
            let balance = *state.balances.get(account_number).unwrap_or(&0);
            let held: i64 = state
                .pending
                .values()
                .filter(|hold| {
                    hold.direction == HoldDirection::Withdrawal
                        && hold.account_number == account_number
                })
                .map(|hold| hold.point_amount)
                .sum();
            if balance - held < point_amount {
                return Err(ServiceError::argument(
                    "pointAmount",
                    format!("insufficient balance on account {account_number}"),
                ));
            }
        }

        state.next_id += 1;
        let external_ref = format!("ACC-{:04}", state.next_id);
        let pending_handle = format!("acc-pending-{:04}", state.next_id);
        state.pending.insert(
            pending_handle.clone(),
            PendingHold {
                account_number: account_number.to_string(),
                point_amount,
                direction,
            },
        );

        Ok(AccountHold {
            external_ref,
            pending_handle,
        })
    }
}

#[async_trait]
impl AccountService for InMemoryAccountService {
    async fn authorize_withdrawal(
        &self,
        account_number: &str,
        point_amount: i64,
    ) -> Result<AccountHold, ServiceError> {
        self.open_hold(account_number, point_amount, HoldDirection::Withdrawal)
    }

    async fn authorize_deposit(
        &self,
        account_number: &str,
        point_amount: i64,
    ) -> Result<AccountHold, ServiceError> {
        self.open_hold(account_number, point_amount, HoldDirection::Deposit)
    }

    async fn settle(&self, pending_handle: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_settle {
            return Err(ServiceError::Unavailable("ledger offline".to_string()));
        }

        match state.pending.remove(pending_handle) {
            Some(hold) => {
                let delta = match hold.direction {
                    HoldDirection::Withdrawal => -hold.point_amount,
                    HoldDirection::Deposit => hold.point_amount,
                };
                *state.balances.entry(hold.account_number).or_insert(0) += delta;
                state.settled.push(pending_handle.to_string());
                Ok(())
            }
            None if state.settled.iter().any(|h| h == pending_handle) => Ok(()),
            None => Err(ServiceError::argument(
                "pendingHandle",
                format!("unknown pending transaction {pending_handle}"),
            )),
        }
    }

    async fn void(&self, pending_handle: &str) -> Result<(), ServiceError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_void {
            return Err(ServiceError::Unavailable("ledger offline".to_string()));
        }
        state.pending.remove(pending_handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_withdrawal_settles_against_the_balance() {
        let service = InMemoryAccountService::new();
        service.set_balance("ACC-001", 500);

        let hold = service.authorize_withdrawal("ACC-001", 200).await.unwrap();
        service.settle(&hold.pending_handle).await.unwrap();
        assert_eq!(service.balance("ACC-001"), 300);

        // Settling again is a no-op.
        service.settle(&hold.pending_handle).await.unwrap();
        assert_eq!(service.balance("ACC-001"), 300);
    }

    #[tokio::test]
    async fn test_withdrawal_respects_open_holds() {
        let service = InMemoryAccountService::new();
        service.set_balance("ACC-001", 300);

        service.authorize_withdrawal("ACC-001", 200).await.unwrap();
        let second = service.authorize_withdrawal("ACC-001", 200).await;
        assert!(matches!(second, Err(ServiceError::Argument { .. })));
    }

    #[tokio::test]
    async fn test_deposit_settles_into_the_balance() {
        let service = InMemoryAccountService::new();
        let hold = service.authorize_deposit("ACC-002", 50).await.unwrap();
        service.settle(&hold.pending_handle).await.unwrap();
        assert_eq!(service.balance("ACC-002"), 50);
    }

    #[tokio::test]
    async fn test_void_releases_the_hold() {
        let service = InMemoryAccountService::new();
        service.set_balance("ACC-001", 300);
        let hold = service.authorize_withdrawal("ACC-001", 300).await.unwrap();

        service.void(&hold.pending_handle).await.unwrap();
        assert_eq!(service.pending_count(), 0);
        assert_eq!(service.balance("ACC-001"), 300);

        // The released points are available again.
        service.authorize_withdrawal("ACC-001", 300).await.unwrap();
    }
}
