use serde::{Deserialize, Serialize};

use crate::domain::{Cents, Order, OrderId, OrderStatusUpdate, Skill, User, UserId};

use super::{AppError, ErrorKind, LedgerService};

/// A request a transport hands to the ledger, already parsed and typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerRequest {
    ListUsers,
    AddUser {
        name: String,
        #[serde(default)]
        balance: Cents,
    },
    GetUser {
        id: UserId,
    },
    AddSkill {
        user: UserId,
        name: String,
    },
    ListOrders,
    GetOrder {
        id: OrderId,
    },
    AddOrder {
        owner: UserId,
        title: String,
        fee: Cents,
    },
    UpdateOrder {
        order: OrderId,
        assignee: UserId,
        status: OrderStatusUpdate,
    },
}

/// Successful result of a [`LedgerRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LedgerResponse {
    Users(Vec<User>),
    Orders(Vec<Order>),
    User(User),
    Order(Order),
    Skill(Skill),
}

/// Wire shape of a reply: either the response or a classified error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    Ok { data: LedgerResponse },
    Error { kind: ErrorKind, message: String },
}

impl ResponseEnvelope {
    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseEnvelope::Ok { .. })
    }
}

impl From<Result<LedgerResponse, AppError>> for ResponseEnvelope {
    fn from(result: Result<LedgerResponse, AppError>) -> Self {
        match result {
            Ok(data) => ResponseEnvelope::Ok { data },
            Err(err) => ResponseEnvelope::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

impl LedgerService {
    /// Dispatch a typed request to the matching ledger operation.
    pub async fn handle(&self, request: LedgerRequest) -> Result<LedgerResponse, AppError> {
        match request {
            LedgerRequest::ListUsers => self.list_users().await.map(LedgerResponse::Users),
            LedgerRequest::AddUser { name, balance } => {
                self.add_user(&name, balance).await.map(LedgerResponse::User)
            }
            LedgerRequest::GetUser { id } => self.get_user(id).await.map(LedgerResponse::User),
            LedgerRequest::AddSkill { user, name } => {
                self.add_skill(user, &name).await.map(LedgerResponse::Skill)
            }
            LedgerRequest::ListOrders => self.list_orders().await.map(LedgerResponse::Orders),
            LedgerRequest::GetOrder { id } => self.get_order(id).await.map(LedgerResponse::Order),
            LedgerRequest::AddOrder { owner, title, fee } => self
                .add_order(owner, &title, fee)
                .await
                .map(LedgerResponse::Order),
            LedgerRequest::UpdateOrder {
                order,
                assignee,
                status,
            } => self
                .set_order_status(order, assignee, status)
                .await
                .map(LedgerResponse::Order),
        }
    }
}
