/// Database Module
///
/// This module provides the data-access layer, organized into focused
/// submodules:
///
/// - **Connection** (`connection.rs`): provider and statement traits, the SQLite implementation
/// - **Query Execution** (`query.rs`): values, rows, fetch shapes and the statement executor
/// - **Transactions** (`transaction.rs`): Idle/Active state machine over a connection
/// - **Schema** (`schema.rs`): CREATE TABLE / ADD INDEX generation
/// - **Facade** (`database.rs`): caller-facing CRUD operations tying the above together
///
/// ## Error Handling
///
/// All database operations use the standardized `DalError` type; driver
/// errors are passed through without translation.
pub mod connection;
pub mod database;
pub mod query;
pub mod schema;
pub mod transaction;

pub use connection::*;
pub use database::*;
pub use query::*;
pub use schema::*;
pub use transaction::*;
