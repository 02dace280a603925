use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

fn parent_of(dest: &Path) -> io::Result<&Path> {
    dest.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", dest.display()),
        )
    })
}

/// Write `data` to `dest` through a temporary file in the same directory,
/// creating parent directories as needed. An existing file is replaced.
pub fn write_file_atomic(dest: &Path, data: &[u8]) -> io::Result<()> {
    let dir = parent_of(dest)?;
    // Parallel writers share parents; an existing directory is success.
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Copy `src` byte-for-byte to `dest` with the same guarantees as
/// [`write_file_atomic`]. Returns the number of bytes copied.
pub fn copy_file_atomic(src: &Path, dest: &Path) -> io::Result<u64> {
    let dir = parent_of(dest)?;
    fs::create_dir_all(dir)?;
    let mut input = File::open(src)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    let copied = io::copy(&mut input, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(copied)
}
