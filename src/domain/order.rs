use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, UserId};

/// Store-assigned order identifier.
pub type OrderId = i64;

/// A paid order posted by its owner. The fee is reserved from the owner's
/// balance when the order is created and paid to the assignee when the
/// order is marked done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Owner who posted and pays for the order
    pub user_id: UserId,
    /// Worker currently fulfilling the order, if any
    pub assigned: Option<UserId>,
    pub title: String,
    pub fee: Cents,
    pub created_at: DateTime<Utc>,
    /// Completion time. Once set the order is terminal.
    pub done_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    /// Posted, nobody working on it
    Open,
    /// Assigned to a worker, not yet done
    Reserved,
    Done,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Open => "open",
            OrderState::Reserved => "reserved",
            OrderState::Done => "done",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// The two status transitions a caller can request on an open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusUpdate {
    /// Assign (or reassign) a worker; no money moves
    Reserve,
    /// Complete the order and pay the fee to the worker
    Done,
}

impl OrderStatusUpdate {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusUpdate::Reserve => "reserve",
            OrderStatusUpdate::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reserve" => Some(OrderStatusUpdate::Reserve),
            "done" => Some(OrderStatusUpdate::Done),
            _ => None,
        }
    }

    /// Completion timestamp this update writes, given the current time.
    pub fn done_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            OrderStatusUpdate::Reserve => None,
            OrderStatusUpdate::Done => Some(now),
        }
    }
}

impl std::fmt::Display for OrderStatusUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl Order {
    pub fn state(&self) -> OrderState {
        match (self.done_at, self.assigned) {
            (Some(_), _) => OrderState::Done,
            (None, Some(_)) => OrderState::Reserved,
            (None, None) => OrderState::Open,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }
}
