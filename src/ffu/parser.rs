//! Low-level FFU container parser.
//!
//! This module walks the top-level container structure, reading from any
//! source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! An FFU container is read strictly forward:
//! 1. Security header, followed by the opaque catalog and hash table regions
//! 2. Image header, followed by the opaque manifest
//! 3. One store: store header, validation data, write descriptor table
//! 4. The payload chunks, starting at the next chunk boundary
//!
//! Each of the three region groups is padded to a chunk boundary, where the
//! chunk size comes from the security header. The walk skips the opaque
//! regions with forward seeks and never reads a payload byte; payload
//! replay is a separate pass that starts at the recorded data offset.

use std::sync::Arc;

use crate::error::Result;
use crate::io::ReadAt;

use super::structures::*;

/// Advance `pos` to the next multiple of `chunk_size`.
///
/// Positions are absolute stream offsets; an already-aligned position is
/// returned unchanged.
pub(crate) fn align_to_chunk(pos: u64, chunk_size: u64) -> u64 {
    let rem = pos % chunk_size;
    if rem != 0 { pos + (chunk_size - rem) } else { pos }
}

/// Low-level FFU container parser.
///
/// This struct handles reading and parsing the container's record
/// structure from a data source. It's generic over the reader type so the
/// same walk works against files and in-memory buffers.
///
/// ## Usage
///
/// Typically used through [`FfuFlasher`](super::FfuFlasher) rather than
/// directly.
pub struct FfuParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the container in bytes
    size: u64,
}

impl<R: ReadAt> FfuParser<R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Parse the container's metadata in one forward pass.
    ///
    /// Walks security header, image header and the store's write
    /// descriptor table, skipping the opaque catalog, hash table, manifest
    /// and validation regions, and records where the payload begins. The
    /// returned [`FfuMeta`] is immutable; both the device-size estimate and
    /// the block copy work from it.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::TruncatedInput`] if the source ends
    /// inside a record, or [`crate::Error::MalformedRecord`] if a
    /// signature check fails. No recovery is attempted in either case.
    pub async fn read_meta(&self) -> Result<FfuMeta> {
        let mut pos = 0u64;

        let security = self.read_security_header(&mut pos).await?;

        // The catalog and hash table hold signing data this tool neither
        // verifies nor needs; skip both regions unread.
        pos += security.catalog_size as u64 + security.hash_table_size as u64;

        let chunk_size = security.chunk_size();
        pos = align_to_chunk(pos, chunk_size);

        let image = self.read_image_header(&mut pos).await?;
        pos += image.manifest_length as u64;
        // Alignment always uses the security header's chunk size; the image
        // header carries its own chunk size field but it is informational.
        pos = align_to_chunk(pos, chunk_size);

        let store_header = self.read_store_header(&mut pos).await?;

        // Validation descriptors are present but uninterpreted
        pos += store_header.validate_descriptor_count as u64
            * store_header.validate_descriptor_length as u64;

        let mut entries = Vec::with_capacity(store_header.write_descriptor_count as usize);
        for _ in 0..store_header.write_descriptor_count {
            entries.push(self.read_block_data_entry(&mut pos).await?);
        }
        pos = align_to_chunk(pos, chunk_size);

        let stores = vec![Store {
            header: store_header,
            entries,
        }];

        Ok(FfuMeta {
            security,
            image,
            stores,
            data_offset: pos,
        })
    }

    /// Get the total size of the container in bytes.
    pub fn container_size(&self) -> u64 {
        self.size
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    async fn read_security_header(&self, pos: &mut u64) -> Result<SecurityHeader> {
        let mut buf = [0u8; SecurityHeader::SIZE];
        self.reader.read_exact_at(*pos, &mut buf).await?;
        *pos += SecurityHeader::SIZE as u64;
        SecurityHeader::from_bytes(&buf)
    }

    async fn read_image_header(&self, pos: &mut u64) -> Result<ImageHeader> {
        let mut buf = [0u8; ImageHeader::SIZE];
        self.reader.read_exact_at(*pos, &mut buf).await?;
        *pos += ImageHeader::SIZE as u64;
        ImageHeader::from_bytes(&buf)
    }

    async fn read_store_header(&self, pos: &mut u64) -> Result<StoreHeader> {
        let mut buf = [0u8; StoreHeader::SIZE];
        self.reader.read_exact_at(*pos, &mut buf).await?;
        *pos += StoreHeader::SIZE as u64;
        StoreHeader::from_bytes(&buf)
    }

    /// Read one write descriptor.
    ///
    /// The record is self-describing: the fixed prefix carries the number
    /// of trailing [`DiskLocation`] sub-records, which are decoded in the
    /// same step and returned as part of the entry.
    async fn read_block_data_entry(&self, pos: &mut u64) -> Result<BlockDataEntry> {
        let mut prefix = [0u8; BlockDataEntry::PREFIX_SIZE];
        self.reader.read_exact_at(*pos, &mut prefix).await?;
        *pos += BlockDataEntry::PREFIX_SIZE as u64;

        let location_count = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        let block_count = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);

        let mut raw = vec![0u8; location_count as usize * DiskLocation::SIZE];
        self.reader.read_exact_at(*pos, &mut raw).await?;
        *pos += raw.len() as u64;

        let locations = raw
            .chunks_exact(DiskLocation::SIZE)
            .map(DiskLocation::from_bytes)
            .collect::<Result<Vec<_>>>()?;

        Ok(BlockDataEntry {
            block_count,
            locations,
        })
    }
}
