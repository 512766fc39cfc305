//! migr8-backup: snapshots of files before they are rewritten.
//!
//! The [`BackupStore`] trait is what the migration engine writes through;
//! [`FsBackupStore`] is the store used by the `migr8` binary.

pub mod conformance;
mod error;
mod fs_store;
mod memory;
mod record;
mod traits;

pub use error::BackupError;
pub use fs_store::FsBackupStore;
pub use memory::MemoryBackupStore;
pub use record::{content_hash, BackedUpFile, BackupId, BackupRecord};
pub use traits::BackupStore;
