mod local;

pub use local::{LocalFileReader, LocalImageWriter};

use crate::error::{Error, Result};
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the buffer completely from the given offset.
    ///
    /// Running out of data before the buffer is full is a format error
    /// (a record claimed more bytes than the source holds), reported as
    /// [`Error::TruncatedInput`].
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .read_at(offset + filled as u64, &mut buf[filled..])
                .await?;
            if n == 0 {
                return Err(Error::TruncatedInput {
                    offset,
                    needed: buf.len(),
                    available: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }
}

/// Trait for random access writing to a fixed-size destination medium.
///
/// The destination must already have its final size before any write:
/// end-addressed payload locations are resolved against [`WriteAt::size`],
/// so growing the medium mid-copy would shift them.
#[async_trait]
pub trait WriteAt: Send + Sync {
    /// Write data at the specified offset, returning the number of bytes written
    async fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize>;

    /// Get the total size of the destination medium
    fn size(&self) -> u64;

    /// Write the whole buffer at the given offset.
    async fn write_all_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self
                .write_at(offset + written as u64, &buf[written..])
                .await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            written += n;
        }
        Ok(())
    }
}
