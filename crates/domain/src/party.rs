//! Parties to a transaction: the agent (customer) and the seller.

use common::{AgentId, SellerId};
use serde::{Deserialize, Serialize};

/// Classification of a seller, carried into the order number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SellerType {
    /// A corporation selling through the platform.
    Corporation,

    /// A movie theater selling its own screenings.
    MovieTheater,
}

impl SellerType {
    /// Returns the single-letter prefix used in published order numbers.
    pub fn order_number_prefix(&self) -> &'static str {
        match self {
            SellerType::Corporation => "C",
            SellerType::MovieTheater => "M",
        }
    }

    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerType::Corporation => "Corporation",
            SellerType::MovieTheater => "MovieTheater",
        }
    }
}

impl std::fmt::Display for SellerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The seller side of a transaction.
///
/// Sellers live in a read-only catalog maintained elsewhere; transactions
/// embed the fields the core needs at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub name: String,
    /// Branch code, part of every published order number.
    pub branch_code: String,
    pub seller_type: SellerType,
}

impl Seller {
    /// Creates a new seller descriptor.
    pub fn new(
        id: SellerId,
        name: impl Into<String>,
        branch_code: impl Into<String>,
        seller_type: SellerType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            branch_code: branch_code.into(),
            seller_type,
        }
    }
}

/// The agent (customer) side of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Display name, when known at start time.
    pub name: Option<String>,
}

impl Agent {
    /// Creates an agent with only an identifier.
    pub fn new(id: AgentId) -> Self {
        Self { id, name: None }
    }
}

/// Contact details for the person receiving the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub family_name: String,
    pub given_name: String,
    pub email: String,
    pub telephone: String,
}

impl CustomerContact {
    /// Returns true if every field required for delivery is present.
    pub fn is_complete(&self) -> bool {
        !self.family_name.is_empty()
            && !self.given_name.is_empty()
            && !self.email.is_empty()
            && !self.telephone.is_empty()
    }
}
