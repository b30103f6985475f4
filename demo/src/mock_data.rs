//! Fictional business data the demo scenarios query.
//!
//! Nothing here touches an external system: the SQL tables live in an
//! in-memory SQLite database and the documents in an in-memory store.

use serde_json::json;

use maestro_contracts::error::MaestroResult;
use maestro_tools::{InMemoryDocumentStore, SqlQueryTool};

// ── SQL ──────────────────────────────────────────────────────────────────────

pub const USERS_SCHEMA: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    plan TEXT NOT NULL,
    signup_month TEXT NOT NULL,
    monthly_spend REAL NOT NULL
)";

pub const USERS_ROWS: [&str; 6] = [
    "INSERT INTO users VALUES (1, 'Northwind', 'pro', '2024-04', 420.0)",
    "INSERT INTO users VALUES (2, 'Contoso', 'starter', '2024-05', 49.0)",
    "INSERT INTO users VALUES (3, 'Fabrikam', 'pro', '2024-05', 380.5)",
    "INSERT INTO users VALUES (4, 'Tailspin', 'pro', '2024-05', 512.0)",
    "INSERT INTO users VALUES (5, 'Wingtip', 'enterprise', '2024-06', 2100.0)",
    "INSERT INTO users VALUES (6, 'Litware', 'starter', '2024-06', 49.0)",
];

/// A SQL tool over a fresh in-memory SQLite database holding `users`.
pub async fn seeded_sql_tool() -> MaestroResult<SqlQueryTool> {
    // One connection: every connection to `sqlite::memory:` is its own database.
    let tool = SqlQueryTool::connect_lazy_with("sqlite::memory:", 1)?;
    tool.execute_batch(std::iter::once(USERS_SCHEMA).chain(USERS_ROWS)).await?;
    Ok(tool)
}

// ── Documents ────────────────────────────────────────────────────────────────

/// A document store with a `clients` collection.
pub fn seeded_document_store() -> InMemoryDocumentStore {
    InMemoryDocumentStore::new().with_collection(
        "clients",
        vec![
            json!({ "_id": "cl-001", "name": "Northwind", "tier": "gold", "address": { "city": "Lyon" } }),
            json!({ "_id": "cl-002", "name": "Contoso", "tier": "silver", "address": { "city": "Paris" } }),
            json!({ "_id": "cl-003", "name": "Fabrikam", "tier": "gold", "address": { "city": "Paris" } }),
            json!({ "_id": "cl-004", "name": "Wingtip", "tier": "platinum", "address": { "city": "Nantes" } }),
        ],
    )
}
