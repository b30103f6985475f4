//! `sql_query`: SQL statements against a relational database.
//!
//! Every invocation runs inside its own transaction. Row-returning
//! statements (`SELECT`, `WITH`, `VALUES`, `PRAGMA`, `EXPLAIN`, `SHOW`, or
//! anything with a `RETURNING` clause) yield their rows as JSON objects keyed
//! by column name. Any other statement yields only the affected row count and
//! is committed. On any database error the transaction is rolled back, so a
//! failed invocation leaves no partial effects.
//!
//! Leading comments and whitespace are skipped when classifying a statement,
//! so `-- monthly totals\nSELECT ...` still returns rows.
//!
//! Parameters are positional and bound in order (`$1`, `$2` for Postgres,
//! `?` for SQLite). Arrays and objects are bound as their JSON text.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Database, Postgres, Row, Transaction};
use tracing::{debug, warn};

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    result::ToolResult,
    tool::{ParamSpec, ParamType, ToolDescriptor},
};
use maestro_core::{
    invoke::parse_arguments,
    traits::{Tool, ToolContext},
};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SqlQueryArgs {
    query: String,
    #[serde(default)]
    params: Option<Vec<Value>>,
}

/// Runs one SQL statement per invocation through an sqlx `AnyPool`.
///
/// The `Any` driver only carries integers, floats, text, booleans and bytes.
/// On Postgres, row-returning `SELECT`, `WITH` and `VALUES` statements and
/// `RETURNING` clauses are therefore wrapped so the server encodes each row
/// with `row_to_json`; timestamps, numerics, UUIDs and JSON columns come back
/// in their JSON rendering. `SHOW` and `EXPLAIN` on Postgres, and every
/// statement on other backends, are decoded column by column, where a
/// column of any other type reads as `null`.
pub struct SqlQueryTool {
    descriptor: ToolDescriptor,
    pool: AnyPool,
}

impl SqlQueryTool {
    pub const NAME: &'static str = "sql_query";

    pub fn new(pool: AnyPool) -> Self {
        let descriptor = ToolDescriptor::new(
            Self::NAME,
            "Executes SQL queries on a relational database. Read queries return rows; \
             other statements return the number of affected rows.",
        )
        .param("query", ParamSpec::required(ParamType::String, "The SQL query to execute"))
        .param(
            "params",
            ParamSpec::optional(ParamType::Array, "Positional parameters bound to the query placeholders")
                .nullable(),
        )
        .output(ParamType::Any);

        Self { descriptor, pool }
    }

    /// Build a pool for `url` without connecting; the first invocation does.
    ///
    /// # Errors
    ///
    /// `MaestroError::Config` when the URL does not parse.
    pub fn connect_lazy(url: &str) -> MaestroResult<Self> {
        Self::connect_lazy_with(url, DEFAULT_MAX_CONNECTIONS)
    }

    pub fn connect_lazy_with(url: &str, max_connections: u32) -> MaestroResult<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy(url)
            .map_err(|e| MaestroError::config(format!("invalid database url: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run setup statements (schema, seed rows) in one transaction.
    ///
    /// Returns the total number of affected rows. Nothing is committed if any
    /// statement fails.
    pub async fn execute_batch<'s>(&self, statements: impl IntoIterator<Item = &'s str>) -> MaestroResult<u64> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        let mut affected = 0;
        for statement in statements {
            match sqlx::query(statement).execute(&mut *tx).await {
                Ok(done) => affected += done.rows_affected(),
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!(error = %rollback, "rollback failed");
                    }
                    return Err(database_error(e));
                }
            }
        }
        tx.commit().await.map_err(database_error)?;
        Ok(affected)
    }

    async fn run_in(
        tx: &mut Transaction<'static, Any>,
        sql: &str,
        params: &[Value],
    ) -> Result<ToolResult, sqlx::Error> {
        let as_json = tx.backend_name() == Postgres::NAME && encodes_as_json(sql);
        let wrapped;
        let statement = if as_json {
            wrapped = json_rows_query(sql);
            wrapped.as_str()
        } else {
            sql
        };

        let mut query = sqlx::query(statement);
        for param in params {
            query = bind_param(query, param);
        }

        if returns_rows(sql) {
            let rows = query.fetch_all(&mut **tx).await?;
            let count = rows.len() as u64;
            let rows = if as_json {
                rows.iter().map(json_row).collect::<Result<Vec<_>, _>>()?
            } else {
                rows.iter().map(|row| Value::Object(row_to_object(row))).collect()
            };
            Ok(ToolResult::ok_with_count(Value::Array(rows), count))
        } else {
            let done = query.execute(&mut **tx).await?;
            Ok(ToolResult::affected(done.rows_affected()))
        }
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Map<String, Value>, ctx: &ToolContext) -> MaestroResult<ToolResult> {
        let args: SqlQueryArgs = parse_arguments(arguments)?;
        let sql = args.query.trim();
        if sql.is_empty() {
            return Err(MaestroError::validation("query must not be empty"));
        }
        let params = args.params.unwrap_or_default();

        debug!(run_id = %ctx.run_id, params = params.len(), "sql query");

        let mut tx = self.pool.begin().await.map_err(database_error)?;

        match Self::run_in(&mut tx, sql, &params).await {
            Ok(result) => {
                tx.commit().await.map_err(database_error)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(run_id = %ctx.run_id, error = %rollback, "rollback failed");
                }
                Err(database_error(e))
            }
        }
    }
}

fn database_error(e: sqlx::Error) -> MaestroError {
    MaestroError::execution(format!("database error: {e}"))
}

fn bind_param<'q>(query: Query<'q, Any, AnyArguments<'q>>, value: &Value) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Skip whitespace, opening parentheses and comments before the first keyword.
fn skip_preamble(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        let trimmed = rest.trim_start_matches(|c: char| c == '(' || c.is_whitespace());
        if let Some(comment) = trimmed.strip_prefix("--") {
            rest = comment.find('\n').map_or("", |end| &comment[end + 1..]);
        } else if let Some(comment) = trimmed.strip_prefix("/*") {
            rest = comment.find("*/").map_or("", |end| &comment[end + 2..]);
        } else {
            return trimmed;
        }
    }
}

fn leading_keyword(sql: &str) -> String {
    skip_preamble(sql)
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("")
        .to_ascii_uppercase()
}

fn has_returning(sql: &str) -> bool {
    sql.split_whitespace().any(|word| word.eq_ignore_ascii_case("RETURNING"))
}

/// Whether the statement produces a result set.
fn returns_rows(sql: &str) -> bool {
    matches!(
        leading_keyword(sql).as_str(),
        "SELECT" | "WITH" | "VALUES" | "PRAGMA" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    ) || has_returning(sql)
}

/// Row-returning statements Postgres accepts as the body of a CTE.
fn encodes_as_json(sql: &str) -> bool {
    matches!(leading_keyword(sql).as_str(), "SELECT" | "WITH" | "VALUES") || has_returning(sql)
}

/// Wrap `sql` so Postgres returns every row as one JSON text column.
///
/// The body sits on its own lines so a trailing `--` comment cannot swallow
/// the closing parenthesis.
fn json_rows_query(sql: &str) -> String {
    let body = sql.trim().trim_end_matches(';').trim_end();
    format!("WITH maestro_rows AS (\n{body}\n) SELECT row_to_json(maestro_rows)::text FROM maestro_rows")
}

fn json_row(row: &AnyRow) -> Result<Value, sqlx::Error> {
    let text: String = row.try_get(0)?;
    serde_json::from_str(&text).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn row_to_object(row: &AnyRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| (column.name().to_string(), decode_cell(row, i)))
        .collect()
}

/// Decode one cell, trying integer, float, text and boolean in turn.
fn decode_cell(row: &AnyRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use maestro_contracts::error::MaestroError;
    use maestro_core::traits::Tool;

    use super::{json_rows_query, returns_rows, skip_preamble, SqlQueryTool};
    use crate::test_support::ctx;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn seeded() -> SqlQueryTool {
        let tool = SqlQueryTool::connect_lazy_with("sqlite::memory:", 1).unwrap();
        let affected = tool
            .execute_batch([
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, note TEXT)",
                "INSERT INTO users (id, name, score, note) VALUES (1, 'ada', 9.5, NULL)",
                "INSERT INTO users (id, name, score, note) VALUES (2, 'grace', 7.25, 'admin')",
            ])
            .await
            .unwrap();
        assert_eq!(affected, 2);
        tool
    }

    #[tokio::test]
    async fn create_table_through_the_tool_reports_zero_rows() {
        let tool = SqlQueryTool::connect_lazy_with("sqlite::memory:", 1).unwrap();
        let result = tool
            .execute(args(json!({ "query": "CREATE TABLE t (a INTEGER)" })), &ctx())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.affected_count(), Some(0));
    }

    #[tokio::test]
    async fn failed_batch_commits_nothing() {
        let tool = seeded().await;
        let result = tool
            .execute_batch(["INSERT INTO users (id, name) VALUES (5, 'new')", "INSERT INTO nowhere VALUES (1)"])
            .await;
        assert!(matches!(result, Err(MaestroError::Execution { .. })));

        let count = tool
            .execute(args(json!({ "query": "SELECT count(*) AS n FROM users" })), &ctx())
            .await
            .unwrap();
        assert_eq!(count.data(), Some(&json!([{ "n": 2 }])));
    }

    #[test]
    fn statement_classification() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  select * from t"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("INSERT INTO t (a) VALUES (1) RETURNING id"));
        assert!(!returns_rows("INSERT INTO t (a) VALUES (1)"));
        assert!(!returns_rows("UPDATE t SET a = 1"));
        assert!(!returns_rows("CREATE TABLE returning_things (a INT)"));
    }

    #[test]
    fn comments_before_the_keyword_are_skipped() {
        assert!(returns_rows("-- list users\nSELECT id, name FROM users"));
        assert!(returns_rows("/* monthly\n totals */ select 1"));
        assert!(returns_rows("  -- a\n  /* b */ (\n-- c\nWITH x AS (SELECT 1) SELECT * FROM x)"));
        assert!(!returns_rows("-- SELECT is only mentioned here\nDELETE FROM users"));
        assert!(!returns_rows("/* SELECT */ UPDATE t SET a = 1"));
        assert!(!returns_rows("-- nothing but a comment"));
        assert_eq!(skip_preamble("/* unterminated"), "");
    }

    #[test]
    fn postgres_rows_are_wrapped_for_json_encoding() {
        assert_eq!(
            json_rows_query("SELECT * FROM users WHERE id = $1; "),
            "WITH maestro_rows AS (\nSELECT * FROM users WHERE id = $1\n) \
             SELECT row_to_json(maestro_rows)::text FROM maestro_rows"
        );
        assert!(json_rows_query("SELECT 1 -- trailing").contains("-- trailing\n)"));
    }

    #[tokio::test]
    async fn comment_prefixed_select_returns_rows() {
        let tool = seeded().await;

        let result = tool
            .execute(
                args(json!({ "query": "-- list users\n/* newest first */\nSELECT id, name FROM users ORDER BY id DESC" })),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.affected_count(), Some(2));
        assert_eq!(
            result.data(),
            Some(&json!([{ "id": 2, "name": "grace" }, { "id": 1, "name": "ada" }]))
        );
    }

    #[tokio::test]
    async fn select_returns_rows_keyed_by_column() {
        let tool = seeded().await;

        let result = tool
            .execute(args(json!({ "query": "SELECT id, name, score, note FROM users ORDER BY id" })), &ctx())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.affected_count(), Some(2));
        assert_eq!(
            result.data(),
            Some(&json!([
                { "id": 1, "name": "ada", "score": 9.5, "note": null },
                { "id": 2, "name": "grace", "score": 7.25, "note": "admin" }
            ]))
        );
    }

    #[tokio::test]
    async fn positional_params_are_bound() {
        let tool = seeded().await;

        let result = tool
            .execute(
                args(json!({ "query": "SELECT name FROM users WHERE score > ? AND name <> ?", "params": [8, "grace"] })),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result.data(), Some(&json!([{ "name": "ada" }])));
    }

    #[tokio::test]
    async fn update_returns_affected_count_and_commits() {
        let tool = seeded().await;

        let update = tool
            .execute(args(json!({ "query": "UPDATE users SET note = ?", "params": ["reviewed"] })), &ctx())
            .await
            .unwrap();
        assert!(update.is_success());
        assert_eq!(update.affected_count(), Some(2));
        assert!(update.data().is_none());

        let check = tool
            .execute(args(json!({ "query": "SELECT count(*) AS n FROM users WHERE note = 'reviewed'" })), &ctx())
            .await
            .unwrap();
        assert_eq!(check.data(), Some(&json!([{ "n": 2 }])));
    }

    #[tokio::test]
    async fn failed_statement_rolls_back() {
        let tool = seeded().await;

        let result = tool
            .execute(
                args(json!({
                    "query": "INSERT INTO users (id, name) VALUES (3, 'linus'); INSERT INTO users (id, name) VALUES (1, 'dup')"
                })),
                &ctx(),
            )
            .await;
        match result {
            Err(MaestroError::Execution { reason }) => assert!(reason.contains("database error"), "got: {reason}"),
            other => panic!("expected Execution error, got {:?}", other),
        }

        let count = tool
            .execute(args(json!({ "query": "SELECT count(*) AS n FROM users" })), &ctx())
            .await
            .unwrap();
        assert_eq!(count.data(), Some(&json!([{ "n": 2 }])), "partial insert must be rolled back");
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let tool = seeded().await;
        let result = tool.execute(args(json!({ "query": "   " })), &ctx()).await;
        assert!(matches!(result, Err(MaestroError::Validation { .. })));
    }
}
