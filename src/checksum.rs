//! The `atlas.sum` integrity manifest.
//!
//! ## Public invariants (must not change without a scheme bump)
//!
//! - **Chained digest**: one SHA-256 hasher is threaded through the whole
//!   file list and never reset. Per file: the name is hashed, then the bytes
//!   (unless the header carries `atlas:sum ignore`), then the running digest
//!   is snapshotted into the entry. Every entry therefore covers the entire
//!   prefix before it; reordering, insertion, or substitution anywhere
//!   earlier changes every later entry.
//! - **Wire format**: `h1:<sum>\n` followed by `<name> h1:<hash>\n` per
//!   entry, in `files()` order. Hashes are standard base64 of 32-byte
//!   digests (44 characters with padding).
//! - **Summary hash**: SHA-256 over `name || hash` of each entry in order.

use std::fmt;
use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{MigrateError, MigrateResult};
use crate::file::MigrationFile;
use crate::storage::Dir;

/// Name of the migration directory integrity sum file.
pub const HASH_FILE_NAME: &str = "atlas.sum";

// h1: (3) + standard base64 of a SHA-256 digest (44).
const HASH_LEN: usize = 3 + 44;

/// One manifest entry: a file name and the running digest after that file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    /// File name the entry covers.
    pub name: String,
    /// Base64 of the running digest after hashing this file.
    pub hash: String,
}

/// The ordered integrity manifest of a migration directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashFile(Vec<HashEntry>);

impl HashFile {
    /// Compute a manifest from files already ordered by name.
    ///
    /// Files whose header carries `atlas:sum ignore` contribute their name
    /// to the running digest but not their bytes, so later edits to their
    /// content cannot invalidate the manifest.
    pub fn from_files(files: &[MigrationFile]) -> HashFile {
        let mut h = Sha256::new();
        let mut entries = Vec::with_capacity(files.len());
        for f in files {
            h.update(f.name().as_bytes());
            if !f.sum_ignored() {
                h.update(f.bytes());
            }
            entries.push(HashEntry {
                name: f.name().to_string(),
                hash: STANDARD.encode(h.clone().finalize()),
            });
        }
        HashFile(entries)
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> &[HashEntry] {
        &self.0
    }

    /// The summary hash over all entries.
    pub fn sum(&self) -> String {
        let mut sha = Sha256::new();
        for e in &self.0 {
            sha.update(e.name.as_bytes());
            sha.update(e.hash.as_bytes());
        }
        STANDARD.encode(sha.finalize())
    }

    /// The hash recorded for the named file.
    pub fn sum_by_name(&self, name: &str) -> MigrateResult<&str> {
        self.0
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.hash.as_str())
            .ok_or_else(|| MigrateError::NotFound(name.to_string()))
    }

    /// Serialize to the sum file wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        use std::fmt::Write;
        let mut out = format!("h1:{}\n", self.sum());
        for e in &self.0 {
            let _ = writeln!(out, "{} h1:{}", e.name, e.hash);
        }
        out.into_bytes()
    }

    /// Parse a sum file and verify its header hash against the entries.
    pub fn parse(b: &[u8]) -> MigrateResult<HashFile> {
        let text = std::str::from_utf8(b).map_err(|_| MigrateError::ChecksumFormat)?;
        let mut lines = text.lines();
        let first = lines.next().unwrap_or("");
        let sum = first.strip_prefix("h1:").unwrap_or(first);
        let mut entries = Vec::new();
        for line in lines {
            let (name, hash) = line.split_once("h1:").ok_or(MigrateError::ChecksumFormat)?;
            entries.push(HashEntry { name: name.trim().to_string(), hash: hash.to_string() });
        }
        let parsed = HashFile(entries);
        if sum != parsed.sum() {
            return Err(MigrateError::ChecksumMismatch(None));
        }
        Ok(parsed)
    }
}

/// Write the manifest to the directory's sum file, creating it if needed.
pub fn write_sum_file<D: Dir + ?Sized>(dir: &D, sum: &HashFile) -> MigrateResult<()> {
    dir.write_file(HASH_FILE_NAME, &sum.to_bytes())
}

fn read_sum_file<D: Dir + ?Sized>(dir: &D) -> MigrateResult<HashFile> {
    let mut r = dir.open(HASH_FILE_NAME)?;
    let mut b = Vec::new();
    r.read_to_end(&mut b)?;
    HashFile::parse(&b)
}

/// Why a stored manifest entry diverged from the live directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// A file not covered by the sum file was added.
    Added,
    /// A covered file's content changed.
    Edited,
    /// A covered file is gone from the directory.
    Removed,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reason::Added => "added",
            Reason::Edited => "edited",
            Reason::Removed => "removed",
        })
    }
}

/// Localized divergence between a directory and its sum file.
///
/// Carries enough context for a CLI to render a pointer-under-offset
/// diagnostic into the sum file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("checksum mismatch")]
pub struct ChecksumError {
    /// 1-based line in the sum file where the divergence starts. The header
    /// hash occupies line 1.
    pub line: usize,
    /// Total number of entries in the stored sum file.
    pub total: usize,
    /// Byte offset into the sum file where the divergence starts.
    pub pos: usize,
    /// Name of the diverging file.
    pub file: String,
    /// What happened to it.
    pub reason: Reason,
}

/// Check that the migration directory is in sync with its sum file.
///
/// A directory without migration files needs no sum file. When the sums
/// differ, the stored manifest is walked in order and the first divergence is
/// reported as a [`ChecksumError`].
pub fn validate<D: Dir + ?Sized>(dir: &D) -> MigrateResult<()> {
    let stored = match read_sum_file(dir) {
        Err(MigrateError::NotFound(_)) => {
            return if dir.files()?.is_empty() {
                Ok(())
            } else {
                Err(MigrateError::ChecksumNotFound)
            };
        }
        other => other?,
    };
    let live = dir.checksum()?;
    if stored.sum() == live.sum() {
        return Ok(());
    }
    log::warn!("sum file diverged from directory contents");
    let mut pos = HASH_LEN + 1; // header hash + newline
    for (i, stored_entry) in stored.0.iter().enumerate() {
        if live.0.get(i) == Some(stored_entry) {
            pos += stored_entry.name.len() + 1 + HASH_LEN + 1; // name + space + hash + newline
            continue;
        }
        let (file, reason) = match live.0.iter().position(|e| e.name == stored_entry.name) {
            None => (stored_entry.name.clone(), Reason::Removed),
            Some(idx) if idx == i => (stored_entry.name.clone(), Reason::Edited),
            // The stored entry moved: another file slid in before it.
            Some(_) => (live.0[i].name.clone(), Reason::Added),
        };
        return Err(MigrateError::ChecksumMismatch(Some(Box::new(ChecksumError {
            line: i + 2,
            total: stored.0.len(),
            pos,
            file,
            reason,
        }))));
    }
    // Every stored entry matches, so the live manifest has extra files at
    // the end (the sums cannot differ otherwise).
    let total = stored.0.len();
    Err(MigrateError::ChecksumMismatch(Some(Box::new(ChecksumError {
        line: total + 2,
        total,
        pos,
        file: live.0[total].name.clone(),
        reason: Reason::Added,
    }))))
}
