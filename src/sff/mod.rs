//! SFF (Standard Flowgram Format) decoder.
//!
//! Decodes the fixed header, the optional out-of-band manifest, and the
//! stream of per-read records. Flowgram values and per-base flow indices are
//! parsed (to keep the record boundaries correct and the padding math right)
//! but are not retained past decode; only bases, quality, and the read name
//! survive into [`crate::ingest`].

use crate::byte_reader::ByteReader;
use crate::constants::{AS_READ_MAX_LEN, SFF_MAGIC};
use crate::error::{Result, SffError};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Fixed portion of the SFF file header.
#[derive(Debug, Clone)]
pub struct SffHeader {
    pub version: [u8; 4],
    pub index_offset: u64,
    pub index_length: u32,
    pub number_of_reads: u32,
    pub header_length: u16,
    pub key_length: u16,
    pub number_of_flows_per_read: u16,
    pub flowgram_format_code: u8,
    pub flow_chars: Vec<u8>,
    pub key_sequence: Vec<u8>,
}

/// The optional out-of-band manifest block.
#[derive(Debug, Clone)]
pub struct SffManifest {
    pub version: [u8; 4],
    pub text: String,
}

/// One decoded read record. Flowgram data is discarded after parsing since
/// this core never uses it downstream.
#[derive(Debug, Clone)]
pub struct SffRead {
    pub name: String,
    pub number_of_bases: u32,
    pub clip_quality_left: u16,
    pub clip_quality_right: u16,
    pub clip_adapter_left: u16,
    pub clip_adapter_right: u16,
    pub bases: Vec<u8>,
    pub quality_scores: Vec<u8>,
}

/// Streaming decoder over one SFF input.
pub struct SffReader<R: Read> {
    byte_reader: ByteReader<R>,
    path: PathBuf,
    header: SffHeader,
    manifest: Option<SffManifest>,
    reads_remaining: u32,
    reads_emitted: u32,
    bytes_consumed: u64,
}

impl<R: Read> SffReader<R> {
    /// Parse the file header (and manifest, if positioned immediately after
    /// it) from `inner`.
    pub fn new(inner: R, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut byte_reader = ByteReader::new(inner, &path);
        byte_reader.detect_magic(SFF_MAGIC)?;

        let mut version = [0u8; 4];
        byte_reader.read_bytes(&mut version)?;
        let index_offset = byte_reader.read_u64()?;
        let index_length = byte_reader.read_u32()?;
        let number_of_reads = byte_reader.read_u32()?;
        let header_length = byte_reader.read_u16()?;
        let key_length = byte_reader.read_u16()?;
        let number_of_flows_per_read = byte_reader.read_u16()?;
        let flowgram_format_code = byte_reader.read_u8()?;

        let flow_chars = byte_reader.read_vec(number_of_flows_per_read as usize)?;
        let key_sequence = byte_reader.read_vec(key_length as usize)?;

        // Fixed fields above total 31 bytes; padding is relative to header_length.
        let fixed_and_variable = 31 + number_of_flows_per_read as u64 + key_length as u64;
        let pad = ByteReader::<R>::pad_len(fixed_and_variable);
        byte_reader.skip(pad)?;
        let _ = header_length; // header_length is informational; padding is derived, not trusted blindly.

        let header = SffHeader {
            version,
            index_offset,
            index_length,
            number_of_reads,
            header_length,
            key_length,
            number_of_flows_per_read,
            flowgram_format_code,
            flow_chars,
            key_sequence,
        };

        let header_bytes_consumed = fixed_and_variable + pad;

        let mut reader = Self {
            byte_reader,
            path,
            header,
            manifest: None,
            reads_remaining: number_of_reads,
            reads_emitted: 0,
            bytes_consumed: header_bytes_consumed,
        };

        reader.try_read_manifest()?;
        Ok(reader)
    }

    pub fn header(&self) -> &SffHeader {
        &self.header
    }

    pub fn manifest(&self) -> Option<&SffManifest> {
        self.manifest.as_ref()
    }

    /// Attempt to parse the manifest if `index_length > 0` and the stream
    /// happens to be at `index_offset`. Both immediately-after-header and
    /// immediately-after-last-read positions are valid call sites; this may
    /// be called from either.
    fn try_read_manifest(&mut self) -> Result<()> {
        if self.manifest.is_some() || self.header.index_length == 0 {
            return Ok(());
        }
        // We can't introspect the underlying stream's position portably, so
        // the canonical call sites are: once after the header, and once
        // after the final read. Track position ourselves.
        if self.stream_pos() != self.header.index_offset {
            return Ok(());
        }

        let magic = self.byte_reader.read_u32()?;
        if magic != SFF_MAGIC {
            // Not actually positioned at the manifest; bail out quietly,
            // matching the reference's "best effort" manifest handling.
            log::debug!(
                "{}: expected manifest magic at offset {}, found {:#010x}; skipping",
                self.path.display(),
                self.header.index_offset,
                magic
            );
            return Ok(());
        }
        let mut version = [0u8; 4];
        self.byte_reader.read_bytes(&mut version)?;
        let manifest_length = self.byte_reader.read_u32()?;
        let _reserved = self.byte_reader.read_u32()?;
        let text_bytes = self.byte_reader.read_vec(manifest_length as usize)?;
        let text = String::from_utf8_lossy(&text_bytes).into_owned();

        let consumed = 16u64 + manifest_length as u64;
        let remaining_pad = (self.header.index_length as u64).saturating_sub(consumed);
        self.byte_reader.skip(remaining_pad)?;
        self.bytes_consumed += consumed + remaining_pad;

        self.manifest = Some(SffManifest { version, text });
        Ok(())
    }

    /// Bytes consumed so far: header fixed+variable+padding plus every read
    /// consumed up to now. Used only to decide whether we've reached
    /// `index_offset` for the manifest.
    fn stream_pos(&self) -> u64 {
        self.bytes_consumed
    }

    /// Decode the next read record, or `None` once `number_of_reads` have
    /// been emitted (after which the trailing manifest, if any, is parsed).
    pub fn next_read(&mut self) -> Result<Option<SffRead>> {
        if self.reads_remaining == 0 {
            self.try_read_manifest()?;
            return Ok(None);
        }

        let start = self.bytes_consumed;
        let read_header_length = self.byte_reader.read_u16()?;
        let name_length = self.byte_reader.read_u16()?;
        let number_of_bases = self.byte_reader.read_u32()?;
        let clip_quality_left = self.byte_reader.read_u16()?;
        let clip_quality_right = self.byte_reader.read_u16()?;
        let clip_adapter_left = self.byte_reader.read_u16()?;
        let clip_adapter_right = self.byte_reader.read_u16()?;

        if number_of_bases as usize > AS_READ_MAX_LEN * 4 {
            return Err(SffError::FormatInvalid {
                path: self.path.clone(),
                reason: format!(
                    "read {} claims {} bases, exceeding the {}x safety cap",
                    self.reads_emitted,
                    number_of_bases,
                    AS_READ_MAX_LEN * 4
                ),
            });
        }

        let name_bytes = self.byte_reader.read_vec(name_length as usize)?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let fixed_header_bytes = 16u64; // the seven fixed fields above
        let header_consumed = fixed_header_bytes + name_length as u64;
        let header_pad = ByteReader::<R>::pad_len(header_consumed);
        self.byte_reader.skip(header_pad)?;
        let _ = read_header_length;

        let n_flows = self.header.number_of_flows_per_read as usize;
        let n_bases = number_of_bases as usize;

        let flowgram_values = self.byte_reader.read_vec(n_flows * 2)?;
        let flow_index_per_base = self.byte_reader.read_vec(n_bases)?;
        let bases = self.byte_reader.read_vec(n_bases)?;
        let quality_scores = self.byte_reader.read_vec(n_bases)?;
        drop(flowgram_values);
        drop(flow_index_per_base);

        let payload_bytes = (n_flows * 2 + n_bases * 3) as u64;
        let payload_pad = ByteReader::<R>::pad_len(payload_bytes);
        self.byte_reader.skip(payload_pad)?;

        let consumed_this_read =
            16 + name_length as u64 + header_pad + payload_bytes + payload_pad;
        self.bytes_consumed = start + consumed_this_read;

        self.reads_remaining -= 1;
        self.reads_emitted += 1;

        if self.reads_remaining == 0 {
            self.try_read_manifest()?;
        }

        Ok(Some(SffRead {
            name,
            number_of_bases,
            clip_quality_left,
            clip_quality_right,
            clip_adapter_left,
            clip_adapter_right,
            bases,
            quality_scores,
        }))
    }
}
