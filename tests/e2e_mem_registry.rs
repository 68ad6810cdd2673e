//! End-to-end behavior of the named in-memory directory registry and the
//! MemDir write-through sinks.

use migdir::{open_mem_dir, validate, Dir, LocalDir, MemDir, MigrationFile};

#[test]
fn named_opens_share_one_directory() {
    let a = open_mem_dir("registry-shared");
    let b = open_mem_dir("registry-shared");
    a.write_file("1_a.sql", b"A").unwrap();
    assert_eq!(b.files().unwrap().len(), 1);

    a.close().unwrap();
    // Still registered: a third open observes the same contents.
    let c = open_mem_dir("registry-shared");
    assert_eq!(c.files().unwrap().len(), 1);

    b.close().unwrap();
    c.close().unwrap();

    // Last close removed the entry; the name now maps to a fresh directory.
    let fresh = open_mem_dir("registry-shared");
    assert!(fresh.files().unwrap().is_empty());
    fresh.close().unwrap();
}

#[test]
fn distinct_names_are_distinct_directories() {
    let a = open_mem_dir("registry-a");
    let b = open_mem_dir("registry-b");
    a.write_file("1_a.sql", b"A").unwrap();
    assert!(b.files().unwrap().is_empty());
    a.close().unwrap();
    b.close().unwrap();
}

#[test]
fn sync_writes_mirror_into_a_local_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let local = LocalDir::new(tmp.path()).unwrap();

    let mem = MemDir::new();
    {
        let local = local.clone();
        mem.sync_writes(move |name, data| local.write_file(name, data));
    }

    let files = vec![
        MigrationFile::new("1_a.sql", "CREATE TABLE a (c int);\n"),
        MigrationFile::new("2_b.sql", "CREATE TABLE b (c int);\n"),
    ];
    mem.copy_files(&files).unwrap();

    // The mirror received the migrations and the sum file, so it validates
    // on its own.
    validate(&local).unwrap();
    assert_eq!(local.files().unwrap(), mem.files().unwrap());
}

#[test]
fn copy_files_covers_preexisting_content() {
    let mem = MemDir::new();
    mem.write_file("1_old.sql", b"CREATE TABLE old (c int);\n").unwrap();
    mem.copy_files(&[MigrationFile::new("2_new.sql", "CREATE TABLE new (c int);\n")])
        .unwrap();
    // The rewritten sum file covers both files, not just the copied slice.
    validate(&mem).unwrap();
    assert_eq!(mem.files().unwrap().len(), 2);
}

#[test]
fn reset_clears_files_and_sinks() {
    let mem = MemDir::new();
    mem.write_file("1_a.sql", b"A").unwrap();
    mem.sync_writes(|_, _| panic!("sink survived reset"));
    mem.reset();
    assert!(mem.files().unwrap().is_empty());
    mem.write_file("2_b.sql", b"B").unwrap();
}
