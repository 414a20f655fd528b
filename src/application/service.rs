use chrono::{DateTime, Utc};

use crate::config::StoreConfig;
use crate::domain::{Cents, Order, OrderId, OrderStatusUpdate, Skill, User, UserId};
use crate::storage::{
    NewOrderOutcome, NewSkillOutcome, NewUserOutcome, OrderUpdateOutcome, Repository,
};

use super::AppError;

/// Application service providing the ledger operations.
/// This is the primary interface for any client (CLI, API, etc.).
///
/// The service owns its store handle; share it between tasks with an `Arc`.
pub struct LedgerService {
    repo: Repository,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize the database (creating it if needed) and open it.
    pub async fn init(config: &StoreConfig) -> Result<Self, AppError> {
        let repo = Repository::init(config).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AppError> {
        let repo = Repository::connect(config, false).await?;
        Ok(Self::new(repo))
    }

    /// Release the store's connections. Safe to call more than once.
    pub async fn close(&self) {
        self.repo.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.repo.is_closed()
    }

    // ========================
    // User operations
    // ========================

    /// Register a user with an initial balance.
    ///
    /// The balance is stored as given; a negative opening balance is
    /// allowed and simply prevents the user from posting orders until
    /// they earn enough.
    pub async fn add_user(&self, name: &str, initial_balance: Cents) -> Result<User, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::EmptyName);
        }

        match self.repo.insert_user(name, initial_balance, Utc::now()).await? {
            NewUserOutcome::Created(user) => {
                tracing::info!(user_id = user.id, name = %user.name, balance = user.balance, "User created");
                Ok(user)
            }
            NewUserOutcome::DuplicateName => {
                tracing::warn!(name, "Rejected duplicate user name");
                Err(AppError::DuplicateName(name.to_string()))
            }
        }
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, AppError> {
        self.repo
            .get_user(id)
            .await?
            .ok_or(AppError::UserNotFound(id))
    }

    /// All users ordered by ID.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.repo.list_users().await?)
    }

    pub async fn add_skill(&self, user_id: UserId, name: &str) -> Result<Skill, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::EmptySkill);
        }

        match self.repo.insert_skill(user_id, name).await? {
            NewSkillOutcome::Added(skill) => Ok(skill),
            NewSkillOutcome::UserNotFound => Err(AppError::UserNotFound(user_id)),
        }
    }

    /// Sum of all balances. Order fees only move between users, so this
    /// changes only when users are added.
    pub async fn total_balance(&self) -> Result<i128, AppError> {
        Ok(self.repo.total_balance().await?)
    }

    // ========================
    // Order operations
    // ========================

    /// Post an order, reserving its fee from the owner's balance.
    pub async fn add_order(
        &self,
        owner: UserId,
        title: &str,
        fee: Cents,
    ) -> Result<Order, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::EmptyTitle);
        }
        if fee <= 0 {
            return Err(AppError::InvalidAmount("Fee must be positive".to_string()));
        }

        match self.repo.insert_order(owner, title, fee, Utc::now()).await? {
            NewOrderOutcome::Placed(order) => {
                tracing::info!(order_id = order.id, owner, fee, "Order placed");
                Ok(order)
            }
            NewOrderOutcome::OwnerNotFound => Err(AppError::UserNotFound(owner)),
            NewOrderOutcome::InsufficientFunds { balance } => {
                tracing::warn!(owner, fee, balance, "Order rejected: insufficient funds");
                Err(AppError::InsufficientFunds {
                    user_id: owner,
                    balance,
                    required: fee,
                })
            }
        }
    }

    /// Assign an open order to `assigned` and, when `done_at` is set,
    /// complete it and pay the fee to that same user.
    ///
    /// The caller-supplied assignee is trusted: completing an order that
    /// is reserved by someone else reassigns it and pays the completer.
    pub async fn update_order(
        &self,
        order_id: OrderId,
        assigned: UserId,
        done_at: Option<DateTime<Utc>>,
    ) -> Result<Order, AppError> {
        match self.repo.update_order(order_id, assigned, done_at).await? {
            OrderUpdateOutcome::Updated(order) => {
                if order.is_done() {
                    tracing::info!(order_id, worker = assigned, fee = order.fee, "Order done");
                } else {
                    tracing::info!(order_id, worker = assigned, "Order reserved");
                }
                Ok(order)
            }
            OrderUpdateOutcome::OrderNotFound => Err(AppError::OrderNotFound(order_id)),
            OrderUpdateOutcome::AssigneeNotFound => Err(AppError::UserNotFound(assigned)),
            OrderUpdateOutcome::BalanceOverflow => {
                tracing::warn!(order_id, worker = assigned, "Rejected completion: balance overflow");
                Err(AppError::BalanceOverflow(assigned))
            }
            OrderUpdateOutcome::AlreadyDone => {
                tracing::warn!(order_id, worker = assigned, "Rejected update of a done order");
                Err(AppError::AlreadyDone(order_id))
            }
        }
    }

    /// Apply a status transition requested by `worker`.
    pub async fn set_order_status(
        &self,
        order_id: OrderId,
        worker: UserId,
        status: OrderStatusUpdate,
    ) -> Result<Order, AppError> {
        self.update_order(order_id, worker, status.done_at(Utc::now()))
            .await
    }

    pub async fn reserve_order(&self, order_id: OrderId, worker: UserId) -> Result<Order, AppError> {
        self.set_order_status(order_id, worker, OrderStatusUpdate::Reserve)
            .await
    }

    pub async fn complete_order(
        &self,
        order_id: OrderId,
        worker: UserId,
    ) -> Result<Order, AppError> {
        self.set_order_status(order_id, worker, OrderStatusUpdate::Done)
            .await
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, AppError> {
        self.repo
            .get_order(id)
            .await?
            .ok_or(AppError::OrderNotFound(id))
    }

    /// All orders ordered by ID.
    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_orders().await?)
    }

    pub async fn count_orders(&self) -> Result<i64, AppError> {
        Ok(self.repo.count_orders().await?)
    }
}
