//! Random output filenames.
//!
//! Each call draws from the calling thread's own generator, so concurrent
//! workers never contend on or correlate through a shared RNG.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Returns `length` random ASCII letters and digits.
pub fn random_base_name(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Returns a random base name of `length` characters with `extension` appended.
pub fn random_file_name(length: usize, extension: &str) -> String {
    format!("{}.{}", random_base_name(length), extension)
}
