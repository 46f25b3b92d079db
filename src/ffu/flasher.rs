use std::sync::Arc;

use crate::error::{Error, Result};
use crate::gpt::{Gpt, SECTOR_SIZE};
use crate::io::{ReadAt, WriteAt};

use super::parser::FfuParser;
use super::structures::{DiskAccessMethod, FfuMeta, Store};

/// FFU payload replay driver.
///
/// Wraps an [`FfuParser`] and adds the two operations that work from the
/// parsed metadata: sizing the destination medium and replaying the
/// payload chunks into it.
pub struct FfuFlasher<R: ReadAt> {
    parser: FfuParser<R>,
}

impl<R: ReadAt> FfuFlasher<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: FfuParser::new(reader),
        }
    }

    /// Parse the container's metadata
    pub async fn read_meta(&self) -> Result<FfuMeta> {
        self.parser.read_meta().await
    }

    /// Get the total size of the container in bytes
    pub fn container_size(&self) -> u64 {
        self.parser.container_size()
    }

    /// Read and parse the store's final partition table.
    ///
    /// The store header addresses the final table as a block index and
    /// block count into the payload region.
    pub async fn final_gpt(&self, meta: &FfuMeta) -> Result<Gpt> {
        let store = Self::single_store(meta)?;
        let header = &store.header;
        let block_size = header.block_size as u64;

        let offset = meta.data_offset + header.final_table_index as u64 * block_size;
        let mut raw = vec![0u8; header.final_table_count as usize * header.block_size as usize];
        self.parser.reader().read_exact_at(offset, &mut raw).await?;

        Gpt::parse(&raw, SECTOR_SIZE)
    }

    /// Estimate the minimum size of the destination medium, in bytes.
    ///
    /// The final partition table was laid out for the target medium with
    /// its backup header on the last sector, so `(backup LBA + 1)` sectors
    /// covers the whole device. That placement is a convention of the
    /// tooling that builds these containers, not a guarantee of the
    /// format; a container with an unusual final table will produce an
    /// unusable estimate rather than an error.
    pub async fn estimate_device_size(&self, meta: &FfuMeta) -> Result<u64> {
        let gpt = self.final_gpt(meta).await?;
        Ok((gpt.header.backup_lba + 1) * SECTOR_SIZE)
    }

    /// Replay every payload chunk into the destination medium.
    ///
    /// Chunks are read back-to-back from the container's payload region,
    /// in write-descriptor table order, and each chunk is written once per
    /// destination it declares. The destination must already have its
    /// final size: end-addressed locations resolve against
    /// [`WriteAt::size`].
    ///
    /// # Errors
    ///
    /// Any read or write failure aborts immediately; no partially written
    /// data is cleaned up. A location using an access method other than
    /// begin/end fails with `UnsupportedFormat` before anything is written
    /// for that chunk.
    pub async fn copy_blocks<W: WriteAt>(&self, meta: &FfuMeta, image: &W) -> Result<()> {
        let mut pos = meta.data_offset;

        for store in &meta.stores {
            let block_size = store.header.block_size as u64;

            for entry in &store.entries {
                let len = entry.block_count as u64 * block_size;
                let mut chunk = vec![0u8; len as usize];
                self.parser.reader().read_exact_at(pos, &mut chunk).await?;
                pos += len;

                for location in &entry.locations {
                    let offset = match location.access_method {
                        DiskAccessMethod::Begin => location.block_index as u64 * block_size,
                        DiskAccessMethod::End => {
                            // Measured backward from the end of the medium
                            let back = location.block_index as u64 * block_size;
                            image.size().checked_sub(back).ok_or_else(|| {
                                Error::malformed(
                                    "DiskLocation",
                                    format!(
                                        "end-addressed block index {} reaches {} bytes before \
                                         the start of a {}-byte medium",
                                        location.block_index,
                                        back - image.size(),
                                        image.size()
                                    ),
                                )
                            })?
                        }
                        DiskAccessMethod::Unknown(method) => {
                            return Err(Error::UnsupportedFormat(format!(
                                "disk access method {method}"
                            )));
                        }
                    };
                    image.write_all_at(offset, &chunk).await?;
                }
            }
        }

        Ok(())
    }

    fn single_store(meta: &FfuMeta) -> Result<&Store> {
        match meta.stores.as_slice() {
            [store] => Ok(store),
            stores => Err(Error::UnsupportedFormat(format!(
                "expected exactly one store, found {}",
                stores.len()
            ))),
        }
    }
}
