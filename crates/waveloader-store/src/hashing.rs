use md5::{Digest, Md5};
use std::fmt::Write as _;
use std::fs::File;
use std::io;
use std::path::Path;

/// Lowercase hex md5 digest of `data`, the checksum release manifests record.
pub fn hash_bytes(data: &[u8]) -> String {
    to_hex(&Md5::digest(data))
}

/// Lowercase hex md5 digest of the file at `path`, streamed from disk.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(to_hex(&hasher.finalize()))
}

fn to_hex(digest: &[u8]) -> String {
    digest.iter().fold(String::with_capacity(digest.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
