//! `migdir`: tamper-evident migration directory primitives for schema
//! management tools.
//!
//! Scope:
//! - directory abstraction over versioned SQL migration files (`storage`)
//! - the `atlas:<name>` directive mini-language (`directive`, `file`)
//! - the `atlas.sum` integrity manifest (`checksum`)
//! - checkpoint traversal (`checkpoint`)
//! - plan formatting, version minting, tar packing (`format`, `version`,
//!   `archive`)
//!
//! Non-goal: executing migrations, splitting SQL statements, or comparing
//! schemas (those belong to the layers above and below this crate).
//!
//! ## Contract (what you can rely on)
//!
//! - `files()` is deterministic: every `.sql` entry, byte-lexicographic by
//!   name, regardless of backend.
//! - The manifest is a chained digest: each entry covers the file's name and
//!   bytes plus the entire prefix before it, so any reordering, insertion,
//!   or substitution earlier in the directory changes every later entry.
//! - `validate` localizes the first divergence with a line number, byte
//!   offset, file name, and reason (`added` / `edited` / `removed`).
//! - A fresh database replays the most recent checkpoint plus everything
//!   after it; history before that checkpoint is never executed.
//!
//! Operations on a single directory are not internally synchronized; callers
//! serialize mutations. The only process-wide state is the named in-memory
//! directory registry behind [`open_mem_dir`].

#![warn(missing_docs)]

pub mod archive;
pub mod checkpoint;
pub mod checksum;
pub mod directive;
pub mod error;
pub mod file;
pub mod format;
pub mod plan;
pub mod storage;
pub mod version;

pub use archive::{archive_dir, archive_dir_to, unarchive_dir, unarchive_dir_from};
pub use checkpoint::{
    checkpoint_files, files_from_checkpoint, files_from_last_checkpoint, files_last_index,
    skip_checkpoint_files,
};
pub use checksum::{validate, write_sum_file, ChecksumError, HashEntry, HashFile, Reason, HASH_FILE_NAME};
pub use error::{MigrateError, MigrateResult};
pub use file::MigrationFile;
pub use format::{Formatter, TemplateFormatter};
pub use plan::{Change, Plan};
pub use storage::{open_mem_dir, CheckpointDir, Dir, LocalDir, MemDir, SyncSink};
pub use version::{check_version, new_version, VERSION_FORMAT};
