//! Content checksums.
//!
//! The digest is only used to show that an output differs from its source;
//! it is not an integrity check.

use md5::{Digest, Md5};
use std::fs::File;
use std::io;
use std::path::Path;

/// Streams the file at `path` through MD5 and returns the lowercase hex digest.
pub fn file_md5(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
