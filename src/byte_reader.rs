//! Endian-aware fixed-width integer reads over an SFF stream.
//!
//! SFF is big-endian, but some writers emit a byte-swapped file; [`ByteReader`]
//! detects this once from the leading magic number and then transparently
//! swaps every subsequent multi-byte read. All structural padding in SFF
//! aligns to 8-byte boundaries; [`pad_len`] computes how many bytes to skip.

use crate::error::{Result, SffError};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Reads big-endian (or byte-swapped) fixed-width integers from any `Read`.
pub struct ByteReader<R: Read> {
    inner: R,
    path: PathBuf,
    swap: bool,
    consumed_since_boundary: u64,
}

impl<R: Read> ByteReader<R> {
    /// Wrap `inner`. `path` is used only to annotate errors.
    pub fn new(inner: R, path: impl AsRef<Path>) -> Self {
        Self {
            inner,
            path: path.as_ref().to_path_buf(),
            swap: false,
            consumed_since_boundary: 0,
        }
    }

    /// Whether byte-swap mode has been enabled (set once, by [`Self::detect_magic`]).
    pub fn is_swapped(&self) -> bool {
        self.swap
    }

    fn fail_truncated(&self, context: &str, source: std::io::Error) -> SffError {
        SffError::IoTruncated {
            path: self.path.clone(),
            context: context.to_string(),
            source,
        }
    }

    /// Read exactly `buf.len()` bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner
            .read_exact(buf)
            .map_err(|e| self.fail_truncated("reading bytes", e))?;
        self.consumed_since_boundary += buf.len() as u64;
        Ok(())
    }

    /// Read `n` bytes into a freshly allocated vector.
    pub fn read_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a 16-bit integer, swapping per [`Self::is_swapped`].
    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_bytes(&mut buf)?;
        let v = u16::from_be_bytes(buf);
        Ok(if self.swap { v.swap_bytes() } else { v })
    }

    /// Read a 32-bit integer, swapping per [`Self::is_swapped`].
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        let v = u32::from_be_bytes(buf);
        Ok(if self.swap { v.swap_bytes() } else { v })
    }

    /// Read a 64-bit integer, swapping per [`Self::is_swapped`].
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        let v = u64::from_be_bytes(buf);
        Ok(if self.swap { v.swap_bytes() } else { v })
    }

    /// Read the leading 4-byte magic number and, if it doesn't match
    /// `expected`, flip byte-swap mode and check again. Fatal `BadMagic` if
    /// neither orientation matches.
    pub fn detect_magic(&mut self, expected: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        let direct = u32::from_be_bytes(buf);
        if direct == expected {
            self.swap = false;
            return Ok(());
        }
        if direct.swap_bytes() == expected {
            self.swap = true;
            return Ok(());
        }
        Err(SffError::BadMagic {
            path: self.path.clone(),
            found: direct,
        })
    }

    /// Number of payload bytes to discard to reach the next 8-byte boundary,
    /// given `consumed` payload bytes read since the last boundary.
    pub fn pad_len(consumed: u64) -> u64 {
        (8 - consumed % 8) % 8
    }

    /// Reset the running payload-byte counter used to compute padding via
    /// [`Self::skip_padding_since_boundary`].
    pub fn reset_boundary(&mut self) {
        self.consumed_since_boundary = 0;
    }

    /// Skip the padding implied by the bytes consumed since the last
    /// [`Self::reset_boundary`] call.
    pub fn skip_padding_since_boundary(&mut self) -> Result<()> {
        let pad = Self::pad_len(self.consumed_since_boundary);
        self.skip(pad)
    }

    /// Discard exactly `n` bytes.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let mut buf = vec![0u8; n as usize];
        self.read_bytes(&mut buf)
    }
}
