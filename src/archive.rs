//! Tar packing of migration directories.
//!
//! Archives carry the sum file first (when present) and then every
//! migration file, as plain USTAR entries with mode 0600. Entry order in
//! the stream is the producer's write order; consumers get the canonical
//! ordering back through `files()`, which always sorts by name.

use std::io::{Read, Write};

use crate::checksum::HASH_FILE_NAME;
use crate::error::{MigrateError, MigrateResult};
use crate::storage::{Dir, MemDir};

/// Pack the directory into a tar byte stream.
pub fn archive_dir<D: Dir + ?Sized>(dir: &D) -> MigrateResult<Vec<u8>> {
    let mut buf = Vec::new();
    archive_dir_to(&mut buf, dir)?;
    Ok(buf)
}

/// Write a tar archive of the directory to `w`.
pub fn archive_dir_to<W: Write, D: Dir + ?Sized>(w: W, dir: &D) -> MigrateResult<()> {
    let mut tw = tar::Builder::new(w);
    match dir.open(HASH_FILE_NAME) {
        Ok(mut f) => {
            let mut sum = Vec::new();
            f.read_to_end(&mut sum)?;
            append_entry(&mut tw, HASH_FILE_NAME, &sum)?;
        }
        Err(MigrateError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    for f in dir.files()? {
        append_entry(&mut tw, f.name(), f.bytes())?;
    }
    tw.finish()?;
    Ok(())
}

/// Extract a tar archive into a fresh in-memory directory.
pub fn unarchive_dir(arc: &[u8]) -> MigrateResult<MemDir> {
    unarchive_dir_from(arc)
}

/// Extract a tar archive read from `r` into a fresh in-memory directory.
pub fn unarchive_dir_from<R: Read>(r: R) -> MigrateResult<MemDir> {
    let dir = MemDir::new();
    let mut tr = tar::Archive::new(r);
    for entry in tr.entries()? {
        let mut entry = entry?;
        let name = entry
            .path()?
            .to_str()
            .ok_or_else(|| MigrateError::Format("non-utf8 archive entry name".into()))?
            .to_string();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        dir.write_file(&name, &data)?;
    }
    Ok(dir)
}

fn append_entry<W: Write>(tw: &mut tar::Builder<W>, name: &str, data: &[u8]) -> MigrateResult<()> {
    let mut header = tar::Header::new_ustar();
    header.set_path(name)?;
    header.set_size(data.len() as u64);
    header.set_mode(0o600);
    header.set_cksum();
    tw.append(&header, data)?;
    Ok(())
}
