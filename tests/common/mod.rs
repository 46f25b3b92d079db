//! Common test utilities: in-memory devices and synthetic containers
#![allow(dead_code)]

pub mod builder;
pub use builder::{FfuBuilder, GptBuilder, PartitionSpec};

use std::sync::Mutex;

use async_trait::async_trait;
use ffu2img::error::Result;
use ffu2img::io::{ReadAt, WriteAt};

/// In-memory container source for testing
pub struct MemoryReader {
    pub data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - offset);
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// In-memory destination medium with a fixed size.
///
/// Writes past the end fail, like they would on a real block device.
pub struct MemoryWriter {
    data: Mutex<Vec<u8>>,
}

impl MemoryWriter {
    pub fn new(size: u64) -> Self {
        Self {
            data: Mutex::new(vec![0u8; size as usize]),
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

#[async_trait]
impl WriteAt for MemoryWriter {
    async fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        let mut data = self.data.lock().unwrap();
        let offset = offset as usize;
        if offset + buf.len() > data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "write past end of medium",
            )
            .into());
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }
}
