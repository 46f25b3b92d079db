use super::{ReadAt, WriteAt};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Local file reader with random access support
pub struct LocalFileReader {
    file: std::fs::File,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.file.read_at(buf, offset)?)
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))?;
            Ok(file.read(buf)?)
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Local disk image writer with random access support.
///
/// The image is created (or truncated) at its full final size up front,
/// so end-addressed writes resolve against a stable length.
pub struct LocalImageWriter {
    file: std::fs::File,
    size: u64,
}

impl LocalImageWriter {
    /// Create the image file and extend it to `size` bytes.
    pub fn create(path: &Path, size: u64) -> Result<Self> {
        let file = std::fs::File::create(path)?;
        file.set_len(size)?;
        Ok(Self { file, size })
    }
}

#[async_trait]
impl WriteAt for LocalImageWriter {
    async fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.file.write_at(buf, offset)?)
        }

        #[cfg(not(unix))]
        {
            use std::io::{Seek, SeekFrom, Write};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))?;
            Ok(file.write(buf)?)
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}
