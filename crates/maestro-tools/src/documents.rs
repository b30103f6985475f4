//! `document_query`: operations on a document database.
//!
//! The tool speaks to any backend implementing [`DocumentStore`]. The
//! bundled [`InMemoryDocumentStore`] keeps collections in memory and runs
//! each operation under one lock, so a multi-document update is atomic with
//! respect to other invocations.
//!
//! Filters are field equality on dotted paths (`{"address.city": "Lyon"}`);
//! an empty filter matches every document. Operator keys such as `$gt` are
//! rejected wherever they appear in the filter. Updates merge `data` into each
//! matching document the way a `$set` would.
//!
//! Idempotence: `find` is read-only; `update_*` with the same data is
//! idempotent; `insert_*` and `delete_*` are not.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    result::ToolResult,
    tool::{ParamSpec, ParamType, ToolDescriptor},
};
use maestro_core::{
    invoke::parse_arguments,
    traits::{Tool, ToolContext},
};

pub type Document = Map<String, Value>;

/// Backend of the `document_query` tool.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection` matching `filter`.
    async fn find(&self, collection: &str, filter: &Document) -> MaestroResult<Vec<Document>>;

    /// Insert documents, returning their ids in order.
    async fn insert(&self, collection: &str, documents: Vec<Document>) -> MaestroResult<Vec<String>>;

    /// Merge `set` into the first (or every) matching document.
    /// Returns how many documents actually changed.
    async fn update(&self, collection: &str, filter: &Document, set: &Document, many: bool) -> MaestroResult<u64>;

    /// Remove the first (or every) matching document. Returns how many were removed.
    async fn delete(&self, collection: &str, filter: &Document, many: bool) -> MaestroResult<u64>;
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// A `DocumentStore` over in-process collections.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection. Documents without an `_id` get one.
    pub fn with_collection(self, name: impl Into<String>, documents: Vec<Value>) -> Self {
        {
            let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
            let target = collections.entry(name.into()).or_default();
            for document in documents {
                if let Value::Object(mut document) = document {
                    document.entry("_id").or_insert_with(|| Value::String(new_id()));
                    target.push(document);
                }
            }
        }
        self
    }

    /// Snapshot of one collection, for inspection.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .map(|c| c.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn lock(&self) -> MaestroResult<std::sync::MutexGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .lock()
            .map_err(|e| MaestroError::execution(format!("document store lock poisoned: {e}")))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(&self, collection: &str, filter: &Document) -> MaestroResult<Vec<Document>> {
        check_filter(filter)?;
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, documents: Vec<Document>) -> MaestroResult<Vec<String>> {
        let mut collections = self.lock()?;
        let target = collections.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        let mut staged: Vec<Document> = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = match document.get("_id") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => {
                    let id = new_id();
                    document.insert("_id".to_string(), Value::String(id.clone()));
                    id
                }
            };
            let clash = target.iter().chain(staged.iter()).any(|d| d.get("_id") == document.get("_id"));
            if clash {
                return Err(MaestroError::execution(format!("duplicate _id '{id}' in '{collection}'")));
            }
            ids.push(id);
            staged.push(document);
        }
        target.extend(staged);
        Ok(ids)
    }

    async fn update(&self, collection: &str, filter: &Document, set: &Document, many: bool) -> MaestroResult<u64> {
        check_filter(filter)?;
        if set.keys().any(|k| k == "_id") {
            return Err(MaestroError::validation("data must not modify '_id'"));
        }

        let mut collections = self.lock()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut modified = 0;
        for document in docs.iter_mut().filter(|d| matches(d, filter)) {
            let before = document.clone();
            for (path, value) in set {
                set_path(document, path, value.clone());
            }
            if *document != before {
                modified += 1;
            }
            if !many {
                break;
            }
        }
        Ok(modified)
    }

    async fn delete(&self, collection: &str, filter: &Document, many: bool) -> MaestroResult<u64> {
        check_filter(filter)?;
        let mut collections = self.lock()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        if many {
            let before = docs.len();
            docs.retain(|d| !matches(d, filter));
            Ok((before - docs.len()) as u64)
        } else {
            match docs.iter().position(|d| matches(d, filter)) {
                Some(i) => {
                    docs.remove(i);
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Reject operator keys (`$gt`, `$in`, ...) at any depth of the filter.
fn check_filter(filter: &Document) -> MaestroResult<()> {
    match find_operator(filter) {
        Some(op) => Err(MaestroError::validation(format!(
            "filter operator '{op}' is not supported; use field equality"
        ))),
        None => Ok(()),
    }
}

fn find_operator(object: &Document) -> Option<&str> {
    object.iter().find_map(|(key, value)| {
        if key.starts_with('$') {
            return Some(key.as_str());
        }
        match value {
            Value::Object(inner) => find_operator(inner),
            Value::Array(items) => items.iter().find_map(|item| item.as_object().and_then(find_operator)),
            _ => None,
        }
    })
}

fn resolve_path<'v>(document: &'v Document, path: &str) -> Option<&'v Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(path, expected)| resolve_path(document, path) == Some(expected))
}

/// Set a dotted path, creating intermediate objects and replacing non-objects.
fn set_path(document: &mut Document, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop().unwrap_or(path);

    let mut current = document;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}

// ── Tool ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentQueryArgs {
    collection: String,
    operation: String,
    #[serde(default)]
    query: Option<Document>,
    #[serde(default)]
    data: Option<Value>,
}

/// Runs find/insert/update/delete operations against a [`DocumentStore`].
pub struct DocumentQueryTool {
    descriptor: ToolDescriptor,
    store: Arc<dyn DocumentStore>,
}

impl DocumentQueryTool {
    pub const NAME: &'static str = "document_query";

    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let descriptor = ToolDescriptor::new(Self::NAME, "Executes queries on a document database.")
            .param(
                "collection",
                ParamSpec::required(ParamType::String, "The name of the collection to query"),
            )
            .param(
                "operation",
                ParamSpec::required(
                    ParamType::String,
                    "The operation to perform (find, insert_one, insert_many, update_one, update_many, delete_one, delete_many)",
                ),
            )
            .param(
                "query",
                ParamSpec::optional(
                    ParamType::Object,
                    "Field-equality filter, dotted paths allowed. For updates and deletes, selects the documents.",
                )
                .nullable(),
            )
            .param(
                "data",
                ParamSpec::optional(
                    ParamType::Any,
                    "Document(s) to insert (object, or array for insert_many) or fields to set on update",
                )
                .nullable(),
            )
            .output(ParamType::Object);

        Self { descriptor, store }
    }
}

fn require_object(data: Option<Value>, operation: &str) -> MaestroResult<Document> {
    match data {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(MaestroError::validation(format!("'{operation}' requires 'data' to be an object"))),
    }
}

#[async_trait]
impl Tool for DocumentQueryTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Map<String, Value>, ctx: &ToolContext) -> MaestroResult<ToolResult> {
        let args: DocumentQueryArgs = parse_arguments(arguments)?;
        let filter = args.query.unwrap_or_default();
        let collection = args.collection.as_str();

        debug!(run_id = %ctx.run_id, collection, operation = %args.operation, "document query");

        let result = match args.operation.as_str() {
            "find" => {
                let docs = self.store.find(collection, &filter).await?;
                let count = docs.len() as u64;
                ToolResult::ok_with_count(Value::Array(docs.into_iter().map(Value::Object).collect()), count)
            }
            "insert_one" => {
                let document = require_object(args.data, "insert_one")?;
                let ids = self.store.insert(collection, vec![document]).await?;
                ToolResult::ok_with_count(json!({ "inserted_id": ids.first() }), 1)
            }
            "insert_many" => {
                let documents = match args.data {
                    Some(Value::Array(items)) if !items.is_empty() => items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(map) => Ok(map),
                            _ => Err(MaestroError::validation("'insert_many' requires an array of objects")),
                        })
                        .collect::<MaestroResult<Vec<_>>>()?,
                    _ => {
                        return Err(MaestroError::validation(
                            "'insert_many' requires 'data' to be a non-empty array of objects",
                        ))
                    }
                };
                let ids = self.store.insert(collection, documents).await?;
                let count = ids.len() as u64;
                ToolResult::ok_with_count(json!({ "inserted_ids": ids }), count)
            }
            op @ ("update_one" | "update_many") => {
                let set = require_object(args.data, op)?;
                let modified = self.store.update(collection, &filter, &set, op == "update_many").await?;
                ToolResult::affected(modified)
            }
            op @ ("delete_one" | "delete_many") => {
                let deleted = self.store.delete(collection, &filter, op == "delete_many").await?;
                ToolResult::affected(deleted)
            }
            other => ToolResult::failure(format!("Unsupported operation: {other}")),
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Map, Value};

    use maestro_contracts::error::MaestroError;
    use maestro_core::traits::Tool;

    use super::{DocumentQueryTool, InMemoryDocumentStore};
    use crate::test_support::ctx;

    fn seeded() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new().with_collection(
            "clients",
            vec![
                json!({ "_id": "c1", "name": "Acme", "tier": "gold", "address": { "city": "Lyon" } }),
                json!({ "_id": "c2", "name": "Globex", "tier": "silver", "address": { "city": "Paris" } }),
                json!({ "_id": "c3", "name": "Initech", "tier": "gold", "address": { "city": "Paris" } }),
            ],
        )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn find_returns_exact_documents_and_count() {
        let tool = DocumentQueryTool::new(Arc::new(seeded()));

        let result = tool
            .execute(args(json!({ "collection": "clients", "operation": "find", "query": { "tier": "gold" } })), &ctx())
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.affected_count(), Some(2));
        let docs = result.data().unwrap().as_array().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Acme", "Initech"]);
    }

    #[tokio::test]
    async fn find_with_dotted_path_and_empty_filter() {
        let tool = DocumentQueryTool::new(Arc::new(seeded()));

        let paris = tool
            .execute(
                args(json!({ "collection": "clients", "operation": "find", "query": { "address.city": "Paris" } })),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(paris.affected_count(), Some(2));

        let all = tool
            .execute(args(json!({ "collection": "clients", "operation": "find" })), &ctx())
            .await
            .unwrap();
        assert_eq!(all.affected_count(), Some(3));

        let none = tool
            .execute(args(json!({ "collection": "missing", "operation": "find", "query": {} })), &ctx())
            .await
            .unwrap();
        assert_eq!(none.data(), Some(&json!([])));
        assert_eq!(none.affected_count(), Some(0));
    }

    #[tokio::test]
    async fn unsupported_operation_has_no_side_effects() {
        let store = seeded();
        let tool = DocumentQueryTool::new(Arc::new(store.clone()));
        let before = store.documents("clients");

        let result = tool
            .execute(
                args(json!({ "collection": "clients", "operation": "drop", "query": {}, "data": { "x": 1 } })),
                &ctx(),
            )
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Unsupported operation: drop"));
        assert!(result.data().is_none());
        assert_eq!(store.documents("clients"), before);
    }

    #[tokio::test]
    async fn insert_one_and_many_return_ids() {
        let store = InMemoryDocumentStore::new();
        let tool = DocumentQueryTool::new(Arc::new(store.clone()));

        let one = tool
            .execute(
                args(json!({ "collection": "reports", "operation": "insert_one", "data": { "_id": "r1", "title": "Q3" } })),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(one.data(), Some(&json!({ "inserted_id": "r1" })));
        assert_eq!(one.affected_count(), Some(1));

        let many = tool
            .execute(
                args(json!({ "collection": "reports", "operation": "insert_many", "data": [{ "title": "Q4" }, { "title": "Q1" }] })),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(many.affected_count(), Some(2));
        assert_eq!(many.data().unwrap()["inserted_ids"].as_array().unwrap().len(), 2);
        assert_eq!(store.documents("reports").len(), 3);
    }

    #[tokio::test]
    async fn duplicate_id_is_an_execution_error() {
        let tool = DocumentQueryTool::new(Arc::new(seeded()));
        let result = tool
            .execute(
                args(json!({ "collection": "clients", "operation": "insert_one", "data": { "_id": "c1" } })),
                &ctx(),
            )
            .await;
        assert!(matches!(result, Err(MaestroError::Execution { .. })));
    }

    #[tokio::test]
    async fn update_counts_only_modified_documents() {
        let store = seeded();
        let tool = DocumentQueryTool::new(Arc::new(store.clone()));

        let result = tool
            .execute(
                args(json!({
                    "collection": "clients",
                    "operation": "update_many",
                    "query": { "address.city": "Paris" },
                    "data": { "tier": "gold", "address.zip": "75001" }
                })),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(result.affected_count(), Some(2));
        assert!(result.data().is_none());

        let again = tool
            .execute(
                args(json!({
                    "collection": "clients",
                    "operation": "update_one",
                    "query": { "_id": "c3" },
                    "data": { "tier": "gold" }
                })),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(again.affected_count(), Some(0), "no-op update modifies nothing");

        let globex = store.documents("clients").into_iter().find(|d| d["_id"] == "c2").unwrap();
        assert_eq!(globex["tier"], "gold");
        assert_eq!(globex["address"]["zip"], "75001");
        assert_eq!(globex["address"]["city"], "Paris");
    }

    #[tokio::test]
    async fn delete_one_and_many() {
        let store = seeded();
        let tool = DocumentQueryTool::new(Arc::new(store.clone()));

        let one = tool
            .execute(args(json!({ "collection": "clients", "operation": "delete_one", "query": { "tier": "gold" } })), &ctx())
            .await
            .unwrap();
        assert_eq!(one.affected_count(), Some(1));

        let many = tool
            .execute(args(json!({ "collection": "clients", "operation": "delete_many", "query": {} })), &ctx())
            .await
            .unwrap();
        assert_eq!(many.affected_count(), Some(2));
        assert!(store.documents("clients").is_empty());
    }

    #[tokio::test]
    async fn missing_data_and_operator_filters_are_validation_errors() {
        let tool = DocumentQueryTool::new(Arc::new(seeded()));

        let insert = tool
            .execute(args(json!({ "collection": "clients", "operation": "insert_one" })), &ctx())
            .await;
        assert!(matches!(insert, Err(MaestroError::Validation { .. })));

        let operator = tool
            .execute(
                args(json!({ "collection": "clients", "operation": "find", "query": { "$where": "1" } })),
                &ctx(),
            )
            .await;
        assert!(matches!(operator, Err(MaestroError::Validation { .. })));

        for query in [
            json!({ "address.city": { "$in": ["Paris", "Lyon"] } }),
            json!({ "address": { "city": { "$ne": "Paris" } } }),
            json!({ "tier": "gold", "tags": [{ "$exists": true }] }),
        ] {
            let nested = tool
                .execute(args(json!({ "collection": "clients", "operation": "find", "query": query })), &ctx())
                .await;
            match nested {
                Err(MaestroError::Validation { reason }) => assert!(reason.contains("not supported"), "got: {reason}"),
                other => panic!("expected Validation error for nested operator, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn nested_operator_filter_leaves_documents_untouched() {
        let store = seeded();
        let tool = DocumentQueryTool::new(Arc::new(store.clone()));

        let result = tool
            .execute(
                args(json!({
                    "collection": "clients",
                    "operation": "delete_many",
                    "query": { "tier": { "$ne": "gold" } }
                })),
                &ctx(),
            )
            .await;

        assert!(matches!(result, Err(MaestroError::Validation { .. })));
        assert_eq!(store.documents("clients").len(), 3);
    }
}
