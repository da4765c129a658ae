//! Cache-ID text builder.
//!
//! A cache-ID is the stable textual digest of an op:
//!
//! ```text
//! <Tag> <in-depth> <out-depth> <direction> <payload...>
//! ```
//!
//! Floats print with 7 significant digits, doubles with full round-trip
//! precision, and long sample arrays as the SHA-256 of their little-endian
//! bytes.

use sha2::{Digest, Sha256};
use vfx_math::{double_literal, format_sig7};

use crate::meta::{Direction, OpMeta};

/// Incremental cache-ID writer.
#[derive(Debug, Clone)]
pub struct CacheIdBuilder {
    text: String,
}

impl CacheIdBuilder {
    /// Starts a cache-ID with the common header.
    pub fn new(tag: &str, meta: &OpMeta, direction: Direction) -> Self {
        Self {
            text: format!(
                "{tag} {} {} {direction}",
                meta.input_bit_depth, meta.output_bit_depth
            ),
        }
    }

    /// Appends a word.
    pub fn word(mut self, w: &str) -> Self {
        self.text.push(' ');
        self.text.push_str(w);
        self
    }

    /// Appends an integer.
    pub fn int(self, v: usize) -> Self {
        self.word(&v.to_string())
    }

    /// Appends a float at 7 significant digits.
    pub fn float(self, v: f32) -> Self {
        self.word(&format_sig7(v))
    }

    /// Appends floats at 7 significant digits.
    pub fn floats(mut self, values: &[f32]) -> Self {
        for v in values {
            self = self.float(*v);
        }
        self
    }

    /// Appends a double at full precision.
    pub fn double(self, v: f64) -> Self {
        self.word(&double_literal(v))
    }

    /// Appends doubles at full precision.
    pub fn doubles(mut self, values: &[f64]) -> Self {
        for v in values {
            self = self.double(*v);
        }
        self
    }

    /// Appends an optional double, `-` when unset.
    pub fn opt_double(self, v: Option<f64>) -> Self {
        match v {
            Some(v) => self.double(v),
            None => self.word("-"),
        }
    }

    /// Appends the SHA-256 digest of a sample array.
    pub fn digest(self, values: &[f32]) -> Self {
        let d = digest_f32(values);
        self.word(&d)
    }

    /// Finished cache-ID.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Hex SHA-256 of the little-endian bytes of `values`.
pub fn digest_f32(values: &[f32]) -> String {
    let mut hasher = Sha256::new();
    for v in values {
        hasher.update(v.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}
