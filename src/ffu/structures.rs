use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// How a payload chunk's destination offset is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskAccessMethod {
    /// Offset counts forward from the start of the medium
    Begin,
    /// Offset counts backward from the end of the medium
    End,
    Unknown(u32),
}

impl DiskAccessMethod {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => DiskAccessMethod::Begin,
            2 => DiskAccessMethod::End,
            _ => DiskAccessMethod::Unknown(value),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            DiskAccessMethod::Begin => 0,
            DiskAccessMethod::End => 2,
            DiskAccessMethod::Unknown(v) => *v,
        }
    }
}

/// Security header - 32 bytes, first record in the container
#[derive(Debug)]
pub struct SecurityHeader {
    pub cb_size: u32,
    pub chunk_size_kb: u32,
    pub alg_id: u32,
    pub catalog_size: u32,
    pub hash_table_size: u32,
}

impl SecurityHeader {
    pub const SIGNATURE: &'static [u8; 12] = b"SignedImage ";
    pub const SIZE: usize = 32;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedInput {
                offset: 0,
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let cb_size = cursor.read_u32::<LittleEndian>()?;

        let mut signature = [0u8; 12];
        cursor.read_exact(&mut signature)?;
        if signature != *Self::SIGNATURE {
            return Err(Error::malformed(
                "SecurityHeader",
                format!("bad signature {:?}", signature),
            ));
        }

        let chunk_size_kb = cursor.read_u32::<LittleEndian>()?;
        if chunk_size_kb == 0 {
            // The chunk size drives region alignment for the whole container
            return Err(Error::malformed("SecurityHeader", "zero chunk size"));
        }

        Ok(Self {
            cb_size,
            chunk_size_kb,
            alg_id: cursor.read_u32::<LittleEndian>()?,
            catalog_size: cursor.read_u32::<LittleEndian>()?,
            hash_table_size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Alignment granularity for padded container regions, in bytes
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size_kb as u64 * 1024
    }
}

/// Image header - 24 bytes, follows the catalog and hash table regions
#[derive(Debug)]
pub struct ImageHeader {
    pub cb_size: u32,
    pub manifest_length: u32,
    /// Informational only; alignment always uses the security header's value
    pub chunk_size: u32,
}

impl ImageHeader {
    pub const SIGNATURE: &'static [u8; 12] = b"ImageFlash  ";
    pub const SIZE: usize = 24;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedInput {
                offset: 0,
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let cb_size = cursor.read_u32::<LittleEndian>()?;

        let mut signature = [0u8; 12];
        cursor.read_exact(&mut signature)?;
        if signature != *Self::SIGNATURE {
            return Err(Error::malformed(
                "ImageHeader",
                format!("bad signature {:?}", signature),
            ));
        }

        Ok(Self {
            cb_size,
            manifest_length: cursor.read_u32::<LittleEndian>()?,
            chunk_size: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// Store header - 248 bytes, describes one unit of flashable content.
///
/// The supported (V1) container revision holds exactly one store. The V2
/// revision appends a store count, store index, per-store payload size and
/// device path; those containers are not handled here.
#[derive(Debug)]
pub struct StoreHeader {
    pub update_type: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub full_flash_major_version: u16,
    pub full_flash_minor_version: u16,
    /// NUL-padded platform identifier, see [`StoreHeader::platform_id_str`]
    pub platform_id: [u8; 192],
    pub block_size: u32,
    pub write_descriptor_count: u32,
    pub write_descriptor_length: u32,
    pub validate_descriptor_count: u32,
    pub validate_descriptor_length: u32,
    pub initial_table_index: u32,
    pub initial_table_count: u32,
    pub flash_only_table_index: u32,
    pub flash_only_table_count: u32,
    pub final_table_index: u32,
    pub final_table_count: u32,
}

impl StoreHeader {
    pub const SIZE: usize = 248;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedInput {
                offset: 0,
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let update_type = cursor.read_u32::<LittleEndian>()?;
        let major_version = cursor.read_u16::<LittleEndian>()?;
        let minor_version = cursor.read_u16::<LittleEndian>()?;
        let full_flash_major_version = cursor.read_u16::<LittleEndian>()?;
        let full_flash_minor_version = cursor.read_u16::<LittleEndian>()?;

        let mut platform_id = [0u8; 192];
        cursor.read_exact(&mut platform_id)?;

        Ok(Self {
            update_type,
            major_version,
            minor_version,
            full_flash_major_version,
            full_flash_minor_version,
            platform_id,
            block_size: cursor.read_u32::<LittleEndian>()?,
            write_descriptor_count: cursor.read_u32::<LittleEndian>()?,
            write_descriptor_length: cursor.read_u32::<LittleEndian>()?,
            validate_descriptor_count: cursor.read_u32::<LittleEndian>()?,
            validate_descriptor_length: cursor.read_u32::<LittleEndian>()?,
            initial_table_index: cursor.read_u32::<LittleEndian>()?,
            initial_table_count: cursor.read_u32::<LittleEndian>()?,
            flash_only_table_index: cursor.read_u32::<LittleEndian>()?,
            flash_only_table_count: cursor.read_u32::<LittleEndian>()?,
            final_table_index: cursor.read_u32::<LittleEndian>()?,
            final_table_count: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Platform identifier with the NUL padding stripped
    pub fn platform_id_str(&self) -> String {
        let end = self
            .platform_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.platform_id.len());
        String::from_utf8_lossy(&self.platform_id[..end]).to_string()
    }
}

/// One destination address for a payload chunk - 8 bytes
#[derive(Debug, Clone, Copy)]
pub struct DiskLocation {
    pub access_method: DiskAccessMethod,
    pub block_index: u32,
}

impl DiskLocation {
    pub const SIZE: usize = 8;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedInput {
                offset: 0,
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        Ok(Self {
            access_method: DiskAccessMethod::from_u32(cursor.read_u32::<LittleEndian>()?),
            block_index: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// Write descriptor for one payload chunk: how many blocks long it is and
/// every destination it must be written to.
///
/// The fixed 8-byte prefix carries the location count and block count; the
/// locations follow immediately, so the record is self-describing. The
/// parser decodes the prefix, then exactly that many [`DiskLocation`]
/// sub-records, and returns them together as one value.
#[derive(Debug)]
pub struct BlockDataEntry {
    pub block_count: u32,
    pub locations: Vec<DiskLocation>,
}

impl BlockDataEntry {
    pub const PREFIX_SIZE: usize = 8;
}

/// One store together with its write descriptor table, in table order
#[derive(Debug)]
pub struct Store {
    pub header: StoreHeader,
    pub entries: Vec<BlockDataEntry>,
}

/// Parsed container metadata.
///
/// Built by a single forward pass over the container and never mutated
/// afterwards. `data_offset` is the absolute offset of the first payload
/// byte; the payload chunks follow back-to-back in write-descriptor table
/// order.
#[derive(Debug)]
pub struct FfuMeta {
    pub security: SecurityHeader,
    pub image: ImageHeader,
    pub stores: Vec<Store>,
    pub data_offset: u64,
}
