//! Record persistence
//!
//! The repository talks to a [`RecordStore`]; [`JsonFileStore`] is the
//! file-backed implementation used by the admin tooling and tests. The
//! production PostgreSQL instance sits behind the same contract.

mod json_file;
mod traits;

pub use json_file::JsonFileStore;
pub use traits::RecordStore;
