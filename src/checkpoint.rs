//! Checkpoint traversal.
//!
//! A checkpoint file replays the entire accumulated schema, so a fresh
//! database executes the most recent checkpoint plus everything written
//! after it; history before the checkpoint is never executed. These helpers
//! keep that "checkpoint + suffix" logic out of consumers.

use crate::error::{MigrateError, MigrateResult};
use crate::file::MigrationFile;
use crate::storage::Dir;

/// The checkpoint files in the directory, preserving `files()` order.
pub fn checkpoint_files<D: Dir + ?Sized>(dir: &D) -> MigrateResult<Vec<MigrationFile>> {
    Ok(dir.files()?.into_iter().filter(MigrationFile::is_checkpoint).collect())
}

/// The files to execute from the named checkpoint file, including it.
///
/// The last file with that name which is a checkpoint anchors the suffix;
/// fails with [`MigrateError::CheckpointNotFound`] when there is none.
pub fn files_from_checkpoint<D: Dir + ?Sized>(
    dir: &D,
    name: &str,
) -> MigrateResult<Vec<MigrationFile>> {
    let mut files = dir.files()?;
    match files_last_index(&files, |f| f.is_checkpoint() && f.name() == name) {
        Some(i) => Ok(files.split_off(i)),
        None => Err(MigrateError::CheckpointNotFound),
    }
}

/// The files a fresh database must execute: the most recent checkpoint and
/// everything after it. Directories without checkpoint support, or without
/// any checkpoint file, yield all files.
pub fn files_from_last_checkpoint(dir: &dyn Dir) -> MigrateResult<Vec<MigrationFile>> {
    let Some(ck) = dir.as_checkpoint() else {
        return dir.files();
    };
    let cks = ck.checkpoint_files()?;
    match cks.last() {
        Some(last) => ck.files_from_checkpoint(last.name()),
        None => dir.files(),
    }
}

/// Drop checkpoint files, keeping only the incremental migrations.
pub fn skip_checkpoint_files(all: Vec<MigrationFile>) -> Vec<MigrationFile> {
    all.into_iter().filter(|f| !f.is_checkpoint()).collect()
}

/// Index of the last file satisfying `pred`, or `None` if none does.
pub fn files_last_index<F>(files: &[MigrationFile], pred: F) -> Option<usize>
where
    F: Fn(&MigrationFile) -> bool,
{
    files.iter().rposition(|f| pred(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CheckpointDir, MemDir};

    fn seeded() -> MemDir {
        let dir = MemDir::new();
        dir.write_file("1_a.sql", b"CREATE TABLE a (c int);\n").unwrap();
        dir.write_checkpoint("2_chk.sql", "v1", b"CREATE TABLE a (c int);\n").unwrap();
        dir.write_file("3_b.sql", b"ALTER TABLE a ADD d int;\n").unwrap();
        dir.write_file("4_c.sql", b"ALTER TABLE a ADD e int;\n").unwrap();
        dir
    }

    fn names(files: &[MigrationFile]) -> Vec<String> {
        files.iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn traversal_starts_at_the_last_checkpoint() {
        let dir = seeded();
        let run = files_from_last_checkpoint(&dir).unwrap();
        assert_eq!(names(&run), ["2_chk.sql", "3_b.sql", "4_c.sql"]);
        assert!(run[0].is_checkpoint());
    }

    #[test]
    fn later_checkpoints_shadow_earlier_ones() {
        let dir = seeded();
        dir.write_checkpoint("5_chk.sql", "", b"CREATE TABLE a (c int, d int, e int);\n")
            .unwrap();
        let run = files_from_last_checkpoint(&dir).unwrap();
        assert_eq!(names(&run), ["5_chk.sql"]);
    }

    #[test]
    fn no_checkpoint_means_all_files() {
        let dir = MemDir::new();
        dir.write_file("1_a.sql", b"A").unwrap();
        dir.write_file("2_b.sql", b"B").unwrap();
        let run = files_from_last_checkpoint(&dir).unwrap();
        assert_eq!(names(&run), ["1_a.sql", "2_b.sql"]);
    }

    #[test]
    fn checkpoint_files_filters_in_order() {
        let dir = seeded();
        let cks = checkpoint_files(&dir).unwrap();
        assert_eq!(names(&cks), ["2_chk.sql"]);
        assert_eq!(cks[0].checkpoint_tag().unwrap(), "v1");
    }

    #[test]
    fn files_from_checkpoint_requires_a_checkpoint_name() {
        let dir = seeded();
        let run = dir.files_from_checkpoint("2_chk.sql").unwrap();
        assert_eq!(run.len(), 3);

        // A present file that is not a checkpoint does not anchor a suffix.
        assert!(matches!(
            dir.files_from_checkpoint("3_b.sql"),
            Err(MigrateError::CheckpointNotFound)
        ));
        assert!(matches!(
            dir.files_from_checkpoint("missing.sql"),
            Err(MigrateError::CheckpointNotFound)
        ));
    }

    #[test]
    fn skip_checkpoint_files_keeps_increments() {
        let dir = seeded();
        let rest = skip_checkpoint_files(dir.files().unwrap());
        assert_eq!(names(&rest), ["1_a.sql", "3_b.sql", "4_c.sql"]);
    }
}
