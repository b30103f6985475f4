//! # maestro-tools
//!
//! Concrete tools for maestro agents:
//!
//! | Tool                  | Backend                                |
//! |-----------------------|----------------------------------------|
//! | `document_query`      | any [`DocumentStore`]                  |
//! | `sql_query`           | sqlx `AnyPool` (Postgres, SQLite)      |
//! | `python_file_creator` | local filesystem under a fixed root    |
//! | `google_search`       | Serper search API                      |
//! | `serper_scrape`       | Serper scrape API                      |
//! | `jina_rerank`         | Jina rerank API                        |
//!
//! Every tool deserializes its arguments into a typed record before any side
//! effect and reports domain problems as `MaestroError::Validation`.

pub mod documents;
pub mod files;
pub mod sql;
pub mod web;

pub use documents::{Document, DocumentQueryTool, DocumentStore, InMemoryDocumentStore};
pub use files::PythonFileCreatorTool;
pub use sql::SqlQueryTool;
pub use web::{GoogleSearchTool, JinaRerankTool, SerperScrapeTool};
