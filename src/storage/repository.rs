use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::StoreConfig;
use crate::domain::{Cents, Order, OrderId, Skill, User, UserId};

use super::MIGRATION_001_INITIAL;

const ORDER_COLUMNS: &str = "id, user_id, assigned, title, fee, created_at, done_at";

/// Result of inserting a user.
#[derive(Debug)]
pub enum NewUserOutcome {
    Created(User),
    DuplicateName,
}

/// Result of the debit-and-insert order transaction.
#[derive(Debug)]
pub enum NewOrderOutcome {
    Placed(Order),
    OwnerNotFound,
    /// The debit would have left the owner negative. `balance` is the
    /// owner's balance before the rolled-back debit.
    InsufficientFunds { balance: Cents },
}

/// Result of the guarded order update transaction.
#[derive(Debug)]
pub enum OrderUpdateOutcome {
    Updated(Order),
    OrderNotFound,
    AlreadyDone,
    AssigneeNotFound,
    /// Crediting the fee would push the assignee past the largest
    /// representable balance.
    BalanceOverflow,
}

#[derive(Debug)]
pub enum NewSkillOutcome {
    Added(Skill),
    UserNotFound,
}

/// Repository for persisting and querying users, skills and orders.
///
/// Every operation that moves money runs in a single SQLite transaction
/// whose first statement is a write, so the database write lock is taken
/// before any balance or order state is inspected.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database described by `config`. With `create_if_missing`
    /// the file is created when absent.
    pub async fn connect(config: &StoreConfig, create_if_missing: bool) -> Result<Self> {
        let pool = config
            .pool_options()
            .connect_with(config.connect_options(create_if_missing))
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to database {}",
                    config.database_path.display()
                )
            })?;

        tracing::info!(
            database = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opened ledger database"
        );

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect, creating the file, then migrate).
    pub async fn init(config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(config, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close every pooled connection. Calling it again is a no-op.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            tracing::info!("Ledger database closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    // ========================
    // User operations
    // ========================

    /// Insert a user. A name clash is reported through the unique
    /// constraint rather than a separate lookup, so concurrent inserts of
    /// the same name cannot both succeed.
    pub async fn insert_user(
        &self,
        name: &str,
        balance: Cents,
        created_at: DateTime<Utc>,
    ) -> Result<NewUserOutcome> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (name, balance, created_at)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(balance)
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(NewUserOutcome::Created(User {
                id: row.try_get("id").context("Invalid user ID")?,
                name: name.to_string(),
                balance,
                created_at,
                skills: Vec::new(),
            })),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Ok(NewUserOutcome::DuplicateName)
            }
            Err(err) => Err(err).context("Failed to save user"),
        }
    }

    /// Get a user (with skills) by ID.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, balance, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match row {
            Some(row) => {
                let mut user = Self::row_to_user(&row)?;
                user.skills = self.list_skills_for_user(id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub async fn user_exists(&self, id: UserId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up user")?;
        Ok(row.is_some())
    }

    /// List all users ordered by ID, each with their skills.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, balance, created_at FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        let mut skills = self.skills_by_user().await?;

        rows.iter()
            .map(|row| {
                let mut user = Self::row_to_user(row)?;
                user.skills = skills.remove(&user.id).unwrap_or_default();
                Ok(user)
            })
            .collect()
    }

    /// Sum of every user's balance. Summed in 128 bits since individual
    /// balances may sit anywhere in the `i64` range.
    pub async fn total_balance(&self) -> Result<i128> {
        let rows = sqlx::query("SELECT balance FROM users")
            .fetch_all(&self.pool)
            .await
            .context("Failed to sum balances")?;

        rows.iter().try_fold(0i128, |total, row| {
            let balance: Cents = row.try_get("balance").context("Invalid balance")?;
            Ok(total + i128::from(balance))
        })
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let created_at_str: String = row.try_get("created_at")?;

        Ok(User {
            id: row.try_get("id").context("Invalid user ID")?,
            name: row.try_get("name").context("Invalid user name")?,
            balance: row.try_get("balance").context("Invalid balance")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            skills: Vec::new(),
        })
    }

    // ========================
    // Skill operations
    // ========================

    /// Attach a skill to a user. Adding a skill the user already has
    /// returns the existing record.
    pub async fn insert_skill(&self, user_id: UserId, name: &str) -> Result<NewSkillOutcome> {
        if !self.user_exists(user_id).await? {
            return Ok(NewSkillOutcome::UserNotFound);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO skills (user_id, name)
            VALUES (?, ?)
            ON CONFLICT (user_id, name) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to save skill")?;

        Ok(NewSkillOutcome::Added(Skill {
            id: row.try_get("id").context("Invalid skill ID")?,
            user_id,
            name: name.to_string(),
        }))
    }

    pub async fn list_skills_for_user(&self, user_id: UserId) -> Result<Vec<Skill>> {
        let rows = sqlx::query("SELECT id, user_id, name FROM skills WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list skills")?;

        rows.iter().map(Self::row_to_skill).collect()
    }

    async fn skills_by_user(&self) -> Result<HashMap<UserId, Vec<Skill>>> {
        let rows = sqlx::query("SELECT id, user_id, name FROM skills ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list skills")?;

        let mut skills: HashMap<UserId, Vec<Skill>> = HashMap::new();
        for row in &rows {
            let skill = Self::row_to_skill(row)?;
            skills.entry(skill.user_id).or_default().push(skill);
        }
        Ok(skills)
    }

    fn row_to_skill(row: &SqliteRow) -> Result<Skill> {
        Ok(Skill {
            id: row.try_get("id").context("Invalid skill ID")?,
            user_id: row.try_get("user_id").context("Invalid skill owner")?,
            name: row.try_get("name").context("Invalid skill name")?,
        })
    }

    // ========================
    // Order operations
    // ========================

    /// Debit the fee from the owner and record the order, atomically.
    ///
    /// The debit runs first and the resulting balance is read back inside
    /// the same transaction. A negative result rolls back the debit and no
    /// order row is written. The debit itself only applies when it cannot
    /// underflow `i64`; SQLite would otherwise store the result as REAL.
    pub async fn insert_order(
        &self,
        owner: UserId,
        title: &str,
        fee: Cents,
        created_at: DateTime<Utc>,
    ) -> Result<NewOrderOutcome> {
        // Dropping `tx` on an early `?` return rolls the transaction back.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin order transaction")?;

        let debited = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance - ?
            WHERE id = ? AND balance >= ?
            RETURNING balance
            "#,
        )
        .bind(fee)
        .bind(owner)
        .bind(Cents::MIN.saturating_add(fee.max(0)))
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to debit order fee")?;

        let Some(row) = debited else {
            // Either no such owner, or a balance so low the debit would underflow.
            let current = sqlx::query("SELECT balance FROM users WHERE id = ?")
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to look up order owner")?;
            tx.rollback().await.context("Failed to roll back order")?;

            return match current {
                Some(row) => Ok(NewOrderOutcome::InsufficientFunds {
                    balance: row.try_get("balance").context("Invalid balance")?,
                }),
                None => Ok(NewOrderOutcome::OwnerNotFound),
            };
        };

        let balance: Cents = row.try_get("balance").context("Invalid balance")?;
        if balance < 0 {
            tx.rollback().await.context("Failed to roll back order")?;
            tracing::debug!(owner, fee, balance, "Order debit rolled back");
            return Ok(NewOrderOutcome::InsufficientFunds {
                balance: balance + fee,
            });
        }

        let row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, assigned, title, fee, created_at, done_at)
            VALUES (?, NULL, ?, ?, ?, NULL)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(title)
        .bind(fee)
        .bind(created_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to save order")?;

        let id: OrderId = row.try_get("id").context("Invalid order ID")?;

        tx.commit().await.context("Failed to commit order")?;

        tracing::debug!(order_id = id, owner, fee, balance, "Order fee debited");

        Ok(NewOrderOutcome::Placed(Order {
            id,
            user_id: owner,
            assigned: None,
            title: title.to_string(),
            fee,
            created_at,
            done_at: None,
        }))
    }

    /// Assign an open order and optionally complete it, atomically.
    ///
    /// The write is guarded by `done_at IS NULL`, so a terminal order is
    /// never touched. On completion the fee is credited to the `assigned`
    /// value read back from that same write, which makes the paid worker
    /// and the recorded worker one and the same.
    pub async fn update_order(
        &self,
        id: OrderId,
        assigned: UserId,
        done_at: Option<DateTime<Utc>>,
    ) -> Result<OrderUpdateOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin order update")?;

        let updated = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET assigned = ?, done_at = ?
            WHERE id = ? AND done_at IS NULL
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(assigned)
        .bind(done_at.map(|dt| dt.to_rfc3339()))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to update order")?;

        let Some(row) = updated else {
            let exists = sqlx::query("SELECT 1 FROM orders WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to look up order")?
                .is_some();
            tx.rollback().await.context("Failed to roll back order update")?;
            return Ok(if exists {
                OrderUpdateOutcome::AlreadyDone
            } else {
                OrderUpdateOutcome::OrderNotFound
            });
        };

        let order = Self::row_to_order(&row)?;

        let assignee_exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(assigned)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up assignee")?
            .is_some();
        if !assignee_exists {
            tx.rollback().await.context("Failed to roll back order update")?;
            return Ok(OrderUpdateOutcome::AssigneeNotFound);
        }

        if let (Some(_), Some(worker)) = (order.done_at, order.assigned) {
            // The assignee is known to exist, so a miss here means the
            // credit would overflow.
            let credited = sqlx::query(
                "UPDATE users SET balance = balance + ? WHERE id = ? AND balance <= ?",
            )
            .bind(order.fee)
            .bind(worker)
            .bind(Cents::MAX.saturating_sub(order.fee.max(0)))
            .execute(&mut *tx)
            .await
            .context("Failed to credit order fee")?;

            if credited.rows_affected() != 1 {
                tx.rollback().await.context("Failed to roll back order update")?;
                tracing::debug!(order_id = id, worker, fee = order.fee, "Order credit would overflow");
                return Ok(OrderUpdateOutcome::BalanceOverflow);
            }
            tracing::debug!(order_id = id, worker, fee = order.fee, "Order fee credited");
        }

        tx.commit().await.context("Failed to commit order update")?;

        Ok(OrderUpdateOutcome::Updated(order))
    }

    /// Get an order by ID.
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch order")?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    /// List all orders ordered by ID.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list orders")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    pub async fn count_orders(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM orders")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count orders")?;

        row.try_get("count").context("Invalid order count")
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        let created_at_str: String = row.try_get("created_at")?;
        let done_at_str: Option<String> = row.try_get("done_at")?;

        Ok(Order {
            id: row.try_get("id").context("Invalid order ID")?,
            user_id: row.try_get("user_id").context("Invalid order owner")?,
            assigned: row.try_get("assigned").context("Invalid assignee")?,
            title: row.try_get("title").context("Invalid title")?,
            fee: row.try_get("fee").context("Invalid fee")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            done_at: done_at_str
                .map(|s| parse_timestamp(&s))
                .transpose()
                .context("Invalid done_at timestamp")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
