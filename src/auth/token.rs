//! Conversion between base64 wire tokens and raw engine buffers

use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::ops::{Deref, DerefMut};
use zeroize::Zeroizing;

/// Raw token buffer scoped to a single negotiation step.
///
/// The contents are wiped when the buffer is dropped.
pub struct TokenBuffer {
    data: Zeroizing<Vec<u8>>,
}

impl TokenBuffer {
    /// Zero-filled output buffer of exactly `size` bytes
    pub fn with_size(size: usize) -> Self {
        Self {
            data: Zeroizing::new(vec![0u8; size]),
        }
    }

    /// Decode a base64 wire token into a raw buffer
    pub fn decode(token: &str) -> Result<Self> {
        let data = STANDARD.decode(token.trim())?;
        Ok(Self {
            data: Zeroizing::new(data),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encode the first `len` bytes as a base64 wire token.
    ///
    /// Returns `None` when `len` is zero.
    pub fn encode_prefix(&self, len: usize) -> Option<String> {
        if len == 0 {
            return None;
        }
        Some(STANDARD.encode(&self.data[..len.min(self.data.len())]))
    }
}

impl Deref for TokenBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for TokenBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Encode raw bytes as a base64 wire token
pub fn encode_token(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 wire token into raw bytes
pub fn decode_token(token: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(token.trim())?)
}
