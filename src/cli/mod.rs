use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{
    AppError, LedgerRequest, LedgerResponse, LedgerService, ResponseEnvelope,
};
use crate::config::{
    DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE_PATH, DEFAULT_MAX_CONNECTIONS, StoreConfig,
};
use crate::domain::{
    Order, OrderId, OrderStatusUpdate, User, UserId, format_cents, parse_cents,
};
use crate::telemetry;

/// Freelance - marketplace ledger
#[derive(Parser)]
#[command(name = "freelance")]
#[command(about = "A marketplace ledger: users post paid orders, others reserve and complete them")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "FREELANCE_DATABASE", default_value = DEFAULT_DATABASE_PATH)]
    pub database: String,

    /// Maximum number of pooled database connections
    #[arg(long, env = "FREELANCE_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// How long a write waits for the database lock, in milliseconds
    #[arg(long, env = "FREELANCE_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    pub busy_timeout: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON response envelopes
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Order management commands
    #[command(subcommand)]
    Order(OrderCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: users, orders, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Add {
        /// User name (must be unique)
        name: String,

        /// Opening balance (e.g., "1000" or "1000.00")
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        balance: String,
    },

    /// List all users
    List,

    /// Show a user with balance and skills
    Show {
        /// User ID
        id: UserId,
    },

    /// Add a skill to a user
    Skill {
        /// User ID
        id: UserId,

        /// Skill name
        skill: String,
    },
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Post a new order, reserving its fee from the owner's balance
    Add {
        /// Order title
        title: String,

        /// ID of the user posting and paying for the order
        #[arg(long)]
        owner: UserId,

        /// Fee paid to the worker on completion (e.g., "10" or "10.50")
        #[arg(short, long)]
        fee: String,
    },

    /// List all orders
    List,

    /// Show a single order
    Show {
        /// Order ID
        id: OrderId,
    },

    /// Reserve an order for a worker, or mark it done
    Update {
        /// Order ID
        id: OrderId,

        /// New status: reserve, done
        status: String,

        /// Worker ID
        #[arg(short, long)]
        user: UserId,
    },
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.database)
            .with_max_connections(self.max_connections)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout))
    }

    pub async fn run(self) -> Result<()> {
        telemetry::init(self.verbose);
        let config = self.store_config();

        let service = match self.command {
            Commands::Init => LedgerService::init(&config).await?,
            _ => LedgerService::connect(&config)
                .await
                .with_context(|| format!("Run `freelance --database {} init` first", self.database))?,
        };

        let result = self.dispatch(&service).await;
        service.close().await;
        result
    }

    async fn dispatch(&self, service: &LedgerService) -> Result<()> {
        match &self.command {
            Commands::Init => {
                println!("Database initialized: {}", self.database);
                Ok(())
            }

            Commands::User(cmd) => run_user_command(service, cmd, self.json).await,

            Commands::Order(cmd) => run_order_command(service, cmd, self.json).await,

            Commands::Export {
                export_type,
                output,
            } => run_export_command(service, export_type, output.as_deref()).await,
        }
    }
}

/// Send a request through the typed contract.
///
/// With `--json` the envelope is printed here and `None` is returned;
/// otherwise the caller renders the response as text.
async fn execute(
    service: &LedgerService,
    request: LedgerRequest,
    json: bool,
) -> Result<Option<LedgerResponse>> {
    let result = service.handle(request).await;

    if json {
        let envelope = ResponseEnvelope::from(result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if let ResponseEnvelope::Error { message, .. } = envelope {
            anyhow::bail!(message);
        }
        return Ok(None);
    }

    Ok(Some(result?))
}

/// Report an input error before any request is made, in the same shape
/// as errors coming back from the ledger.
fn reject(err: AppError, json: bool) -> Result<()> {
    if json {
        let message = err.to_string();
        let envelope = ResponseEnvelope::from(Err(err));
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        anyhow::bail!(message);
    }
    Err(err.into())
}

fn print_response(response: &LedgerResponse) {
    match response {
        LedgerResponse::Users(users) => print_users(users),
        LedgerResponse::Orders(orders) => print_orders(orders),
        LedgerResponse::User(user) => println!(
            "Created user: {} (id {}, balance {})",
            user.name,
            user.id,
            format_cents(user.balance)
        ),
        LedgerResponse::Order(order) => print_order_change(order),
        LedgerResponse::Skill(skill) => {
            println!("Added skill '{}' to user {}", skill.name, skill.user_id)
        }
    }
}

async fn run_user_command(service: &LedgerService, cmd: &UserCommands, json: bool) -> Result<()> {
    let request = match cmd {
        UserCommands::Add { name, balance } => {
            let balance = match parse_cents(balance) {
                Ok(balance) => balance,
                Err(e) => return reject(AppError::InvalidAmount(e.to_string()), json),
            };
            LedgerRequest::AddUser {
                name: name.clone(),
                balance,
            }
        }
        UserCommands::List => LedgerRequest::ListUsers,
        UserCommands::Show { id } => LedgerRequest::GetUser { id: *id },
        UserCommands::Skill { id, skill } => LedgerRequest::AddSkill {
            user: *id,
            name: skill.clone(),
        },
    };

    match (cmd, execute(service, request, json).await?) {
        (_, None) => {}
        (UserCommands::Show { .. }, Some(LedgerResponse::User(user))) => print_user_detail(&user),
        (_, Some(response)) => print_response(&response),
    }
    Ok(())
}

fn print_user_detail(user: &User) {
    println!("User: {}", user.name);
    println!("  ID:       {}", user.id);
    println!("  Balance:  {}", format_cents(user.balance));
    println!(
        "  Created:  {}",
        user.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if user.skills.is_empty() {
        println!("  Skills:   -");
    } else {
        println!("  Skills:   {}", user.skill_names().join(", "));
    }
}

async fn run_order_command(
    service: &LedgerService,
    cmd: &OrderCommands,
    json: bool,
) -> Result<()> {
    let request = match cmd {
        OrderCommands::Add { title, owner, fee } => {
            let fee = match parse_cents(fee) {
                Ok(fee) => fee,
                Err(e) => return reject(AppError::InvalidAmount(e.to_string()), json),
            };
            LedgerRequest::AddOrder {
                owner: *owner,
                title: title.clone(),
                fee,
            }
        }
        OrderCommands::List => LedgerRequest::ListOrders,
        OrderCommands::Show { id } => LedgerRequest::GetOrder { id: *id },
        OrderCommands::Update { id, status, user } => {
            let Some(status) = OrderStatusUpdate::from_str(status) else {
                return reject(AppError::InvalidStatus(status.clone()), json);
            };
            LedgerRequest::UpdateOrder {
                order: *id,
                assignee: *user,
                status,
            }
        }
    };

    match (cmd, execute(service, request, json).await?) {
        (_, None) => {}
        (OrderCommands::Show { .. }, Some(LedgerResponse::Order(order))) => {
            print_order_detail(&order)
        }
        (_, Some(response)) => print_response(&response),
    }
    Ok(())
}

fn print_order_detail(order: &Order) {
    println!("Order: {}", order.title);
    println!("  ID:       {}", order.id);
    println!("  Owner:    {}", order.user_id);
    println!(
        "  Assigned: {}",
        order
            .assigned
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Fee:      {}", format_cents(order.fee));
    println!("  State:    {}", order.state());
    println!(
        "  Created:  {}",
        order.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(done) = order.done_at {
        println!("  Done:     {}", done.format("%Y-%m-%d %H:%M:%S"));
    }
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "users" => {
            let count = exporter.export_users_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} users", count);
            }
        }
        "orders" => {
            let count = exporter.export_orders_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} orders", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} users, {} orders",
                    snapshot.users.len(),
                    snapshot.orders.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: users, orders, full",
                export_type
            );
        }
    }

    Ok(())
}

fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("No users found.");
        return;
    }

    println!("{:<6} {:<20} {:>14} {}", "ID", "NAME", "BALANCE", "SKILLS");
    println!("{}", "-".repeat(56));
    for user in users {
        println!(
            "{:<6} {:<20} {:>14} {}",
            user.id,
            user.name,
            format_cents(user.balance),
            user.skill_names().join(",")
        );
    }
}

fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders found.");
        return;
    }

    println!(
        "{:<6} {:<28} {:<6} {:<9} {:>12} {:<9}",
        "ID", "TITLE", "OWNER", "ASSIGNED", "FEE", "STATE"
    );
    println!("{}", "-".repeat(75));
    for order in orders {
        println!(
            "{:<6} {:<28} {:<6} {:<9} {:>12} {:<9}",
            order.id,
            truncate(&order.title, 28),
            order.user_id,
            order
                .assigned
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format_cents(order.fee),
            order.state()
        );
    }
}

fn print_order_change(order: &Order) {
    match (order.assigned, order.is_done()) {
        (Some(worker), true) => println!(
            "Order {} done by user {}: paid {}",
            order.id,
            worker,
            format_cents(order.fee)
        ),
        (Some(worker), false) => println!("Order {} reserved by user {}", order.id, worker),
        (None, _) => println!(
            "Posted order {}: '{}' for {} (owner {})",
            order.id,
            order.title,
            format_cents(order.fee),
            order.user_id
        ),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_update() {
        let cli = Cli::try_parse_from([
            "freelance",
            "--database",
            "test.db",
            "order",
            "update",
            "3",
            "done",
            "--user",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.database, "test.db");
        match cli.command {
            Commands::Order(OrderCommands::Update { id, status, user }) => {
                assert_eq!(id, 3);
                assert_eq!(status, "done");
                assert_eq!(user, 2);
            }
            _ => panic!("expected order update"),
        }
    }

    #[test]
    fn test_parse_negative_opening_balance() {
        let cli =
            Cli::try_parse_from(["freelance", "user", "add", "bob", "--balance", "-5"]).unwrap();
        match cli.command {
            Commands::User(UserCommands::Add { name, balance }) => {
                assert_eq!(name, "bob");
                assert_eq!(balance, "-5");
            }
            _ => panic!("expected user add"),
        }
    }

    #[test]
    fn test_order_id_must_be_numeric() {
        let parsed = Cli::try_parse_from(["freelance", "order", "show", "abc"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_busy_timeout_flag_reaches_store_config() {
        let cli = Cli::try_parse_from(["freelance", "--busy-timeout", "250", "user", "list"])
            .unwrap();
        assert_eq!(cli.store_config().busy_timeout(), Duration::from_millis(250));

        let cli = Cli::try_parse_from(["freelance", "user", "list"]).unwrap();
        assert_eq!(cli.busy_timeout, DEFAULT_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }
}
