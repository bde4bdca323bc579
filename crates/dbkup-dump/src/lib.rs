//! The dump engine
//!
//! Walks table metadata and row data from a [`DatabaseSource`] and writes a
//! replayable SQL text file:
//!
//! ```text
//! CREATE TABLE ...;            (optional)
//!
//! -- Table: users
//! INSERT INTO `users` (`id`, `name`) VALUES ('1', 'ada');
//!
//! ```
//!
//! [`DumpOrchestrator`] runs jobs, [`PreviewReader`] serves bounded table
//! snapshots and stored dumps, [`BackupStore`] owns the backup directory.
//!
//! [`DatabaseSource`]: dbkup_source::DatabaseSource

pub mod emitter;
pub mod orchestrator;
pub mod preview;
pub mod serializer;
pub mod store;

// Re-exports
pub use emitter::{RowEmitter, comment_line, emit_inserts, emit_schema, table_marker};
pub use orchestrator::{DEFAULT_LABEL, DumpOrchestrator};
pub use preview::{PREVIEW_ROW_LIMIT, PreviewReader};
pub use serializer::serialize_value;
pub use store::{BackupStore, PendingDump};
