use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Order, User};

/// Ledger snapshot for full JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub users: Vec<User>,
    pub orders: Vec<Order>,
}

/// Exporter for converting ledger data to CSV and JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export users to CSV. Skills are joined with ';'.
    pub async fn export_users_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let users = self.service.list_users().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "name", "balance", "created_at", "skills"])?;

        for user in &users {
            csv_writer.write_record([
                user.id.to_string(),
                user.name.clone(),
                user.balance.to_string(),
                user.created_at.to_rfc3339(),
                user.skill_names().join(";"),
            ])?;
        }

        csv_writer.flush()?;
        Ok(users.len())
    }

    /// Export orders to CSV. Unassigned and open orders leave the
    /// `assigned` and `done_at` cells empty.
    pub async fn export_orders_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let orders = self.service.list_orders().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "user_id",
            "assigned",
            "title",
            "fee",
            "created_at",
            "done_at",
            "state",
        ])?;

        for order in &orders {
            csv_writer.write_record([
                order.id.to_string(),
                order.user_id.to_string(),
                order.assigned.map(|id| id.to_string()).unwrap_or_default(),
                order.title.clone(),
                order.fee.to_string(),
                order.created_at.to_rfc3339(),
                order.done_at.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
                order.state().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(orders.len())
    }

    /// Export users and orders as one JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let users = self.service.list_users().await?;
        let orders = self.service.list_orders().await?;

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            users,
            orders,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
