//! Tasks: the durable queue entries that carry a transaction's side
//! effects.
//!
//! Task kinds form a closed set. The payload enum is the registry: every
//! kind has exactly one payload shape, and dispatch is an exhaustive
//! `match`, so an unhandled kind cannot compile.

use chrono::{DateTime, Utc};
use common::{TaskId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::notification::EmailMessage;
use crate::order::OrderNumber;
use crate::transaction::{AccountSettlement, CreditCardSettlement, PointAwardGrant};

/// The state of a task in the queue.
///
/// State transitions:
/// ```text
/// Ready ──► Running ──┬──► Executed
///   ▲          │      └──► Aborted
///   └──────────┘ (retry sweep, tries remaining)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    /// Eligible for a worker to claim once `runs_at` has passed.
    #[default]
    Ready,

    /// Claimed by a worker; the lease expires by staleness, not by event.
    Running,

    /// Executed successfully (terminal state).
    Executed,

    /// Given up after exhausting every try (terminal state).
    Aborted,
}

impl TaskStatus {
    /// Returns true if a worker may claim the task in this state.
    pub fn can_claim(&self) -> bool {
        matches!(self, TaskStatus::Ready)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Executed | TaskStatus::Aborted)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Ready => "Ready",
            TaskStatus::Running => "Running",
            TaskStatus::Executed => "Executed",
            TaskStatus::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed set of task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    CreateOrder,
    SettleCreditCard,
    SettleAccount,
    SendOrder,
    GivePointAward,
    SendEmailMessage,
    CancelSeatReservation,
    CancelCreditCard,
    CancelAccount,
    CancelPointAward,
}

impl TaskKind {
    /// Every task kind, in dispatch order. Workers poll each kind in turn.
    pub const ALL: [TaskKind; 10] = [
        TaskKind::CreateOrder,
        TaskKind::SettleCreditCard,
        TaskKind::SettleAccount,
        TaskKind::SendOrder,
        TaskKind::GivePointAward,
        TaskKind::SendEmailMessage,
        TaskKind::CancelSeatReservation,
        TaskKind::CancelCreditCard,
        TaskKind::CancelAccount,
        TaskKind::CancelPointAward,
    ];

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::CreateOrder => "CreateOrder",
            TaskKind::SettleCreditCard => "SettleCreditCard",
            TaskKind::SettleAccount => "SettleAccount",
            TaskKind::SendOrder => "SendOrder",
            TaskKind::GivePointAward => "GivePointAward",
            TaskKind::SendEmailMessage => "SendEmailMessage",
            TaskKind::CancelSeatReservation => "CancelSeatReservation",
            TaskKind::CancelCreditCard => "CancelCreditCard",
            TaskKind::CancelAccount => "CancelAccount",
            TaskKind::CancelPointAward => "CancelPointAward",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown task kind: {s}"))
    }
}

/// Payload shared by the four compensation kinds: the handler resolves
/// everything else from the transaction's recorded actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationData {
    pub transaction_id: TransactionId,
}

/// Kind-specific task payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskPayload {
    CreateOrder { transaction_id: TransactionId },

    SettleCreditCard {
        transaction_id: TransactionId,
        settlement: CreditCardSettlement,
    },

    SettleAccount {
        transaction_id: TransactionId,
        settlement: AccountSettlement,
    },

    SendOrder {
        transaction_id: TransactionId,
        order_number: OrderNumber,
    },

    GivePointAward {
        transaction_id: TransactionId,
        grant: PointAwardGrant,
    },

    SendEmailMessage {
        transaction_id: TransactionId,
        message: EmailMessage,
    },

    CancelSeatReservation(CompensationData),
    CancelCreditCard(CompensationData),
    CancelAccount(CompensationData),
    CancelPointAward(CompensationData),
}

impl TaskPayload {
    /// Returns the kind this payload belongs to.
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::CreateOrder { .. } => TaskKind::CreateOrder,
            TaskPayload::SettleCreditCard { .. } => TaskKind::SettleCreditCard,
            TaskPayload::SettleAccount { .. } => TaskKind::SettleAccount,
            TaskPayload::SendOrder { .. } => TaskKind::SendOrder,
            TaskPayload::GivePointAward { .. } => TaskKind::GivePointAward,
            TaskPayload::SendEmailMessage { .. } => TaskKind::SendEmailMessage,
            TaskPayload::CancelSeatReservation(_) => TaskKind::CancelSeatReservation,
            TaskPayload::CancelCreditCard(_) => TaskKind::CancelCreditCard,
            TaskPayload::CancelAccount(_) => TaskKind::CancelAccount,
            TaskPayload::CancelPointAward(_) => TaskKind::CancelPointAward,
        }
    }

    /// Returns the transaction this payload belongs to.
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            TaskPayload::CreateOrder { transaction_id }
            | TaskPayload::SettleCreditCard { transaction_id, .. }
            | TaskPayload::SettleAccount { transaction_id, .. }
            | TaskPayload::SendOrder { transaction_id, .. }
            | TaskPayload::GivePointAward { transaction_id, .. }
            | TaskPayload::SendEmailMessage { transaction_id, .. } => *transaction_id,
            TaskPayload::CancelSeatReservation(data)
            | TaskPayload::CancelCreditCard(data)
            | TaskPayload::CancelAccount(data)
            | TaskPayload::CancelPointAward(data) => data.transaction_id,
        }
    }
}

/// One attempt's outcome, appended to the task's execution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub executed_at: DateTime<Utc>,
    /// Present when the attempt failed.
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Records a successful attempt.
    pub fn success() -> Self {
        Self {
            executed_at: Utc::now(),
            error: None,
        }
    }

    /// Records a failed attempt.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            executed_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// A durable queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Earliest time a worker may claim the task.
    pub runs_at: DateTime<Utc>,
    /// Tries left before the abort sweep may terminate the task.
    /// Monotonically non-increasing.
    pub remaining_tries: i32,
    pub number_of_tries: i32,
    pub last_tried_at: Option<DateTime<Utc>>,
    /// Append-only log of attempts.
    pub execution_results: Vec<ExecutionResult>,
    pub payload: TaskPayload,
}

impl Task {
    /// Creates a ready task scheduled at `runs_at` with the given try
    /// budget.
    pub fn new(payload: TaskPayload, runs_at: DateTime<Utc>, remaining_tries: i32) -> Self {
        Self {
            id: TaskId::new(),
            status: TaskStatus::Ready,
            runs_at,
            remaining_tries,
            number_of_tries: 0,
            last_tried_at: None,
            execution_results: Vec::new(),
            payload,
        }
    }

    /// Returns the kind of this task.
    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }
}
