//! GUID Partition Table sub-parser.
//!
//! An FFU store's final table region carries a complete GPT laid out for
//! the target medium. This module parses that structure from a byte range,
//! independently of the surrounding container format: the range may start
//! with a protective MBR or other padding, so parsing begins at the first
//! occurrence of the header signature.
//!
//! Only the layout information is extracted. The header and entry-array
//! CRC fields are carried through but never verified.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// Sector size the final table region is laid out for, in bytes
pub const SECTOR_SIZE: u64 = 512;

/// GPT header - 92 bytes
#[derive(Debug)]
pub struct GptHeader {
    pub header_size: u32,
    pub crc32: u32,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    /// Disk GUID in canonical mixed-endian text form
    pub disk_guid: String,
    pub part_entry_start_lba: u64,
    pub num_part_entries: u32,
    pub part_entry_size: u32,
    pub crc32_part_array: u32,
}

impl GptHeader {
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";
    pub const REVISION: [u8; 4] = [0, 0, 1, 0];
    pub const SIZE: usize = 92;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedInput {
                offset: 0,
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);

        let mut signature = [0u8; 8];
        cursor.read_exact(&mut signature)?;
        if signature != *Self::SIGNATURE {
            return Err(Error::malformed(
                "GptHeader",
                format!("bad signature {:?}", signature),
            ));
        }

        let mut revision = [0u8; 4];
        cursor.read_exact(&mut revision)?;
        if revision != Self::REVISION {
            return Err(Error::malformed(
                "GptHeader",
                format!("bad revision {:?}", revision),
            ));
        }

        let header_size = cursor.read_u32::<LittleEndian>()?;
        if (header_size as usize) < Self::SIZE {
            return Err(Error::malformed(
                "GptHeader",
                format!("header size {} below minimum {}", header_size, Self::SIZE),
            ));
        }

        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let _reserved = cursor.read_u32::<LittleEndian>()?;
        let current_lba = cursor.read_u64::<LittleEndian>()?;
        let backup_lba = cursor.read_u64::<LittleEndian>()?;
        let first_usable_lba = cursor.read_u64::<LittleEndian>()?;
        let last_usable_lba = cursor.read_u64::<LittleEndian>()?;

        let mut disk_guid = [0u8; 16];
        cursor.read_exact(&mut disk_guid)?;

        Ok(Self {
            header_size,
            crc32,
            current_lba,
            backup_lba,
            first_usable_lba,
            last_usable_lba,
            disk_guid: format_guid(&disk_guid),
            part_entry_start_lba: cursor.read_u64::<LittleEndian>()?,
            num_part_entries: cursor.read_u32::<LittleEndian>()?,
            part_entry_size: cursor.read_u32::<LittleEndian>()?,
            crc32_part_array: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// One used partition slot
#[derive(Debug)]
pub struct GptPartition {
    pub type_guid: String,
    pub unique_guid: String,
    pub first_lba: u64,
    pub last_lba: u64,
    pub flags: u64,
    /// Partition name, truncated at the first NUL code unit
    pub name: String,
}

impl GptPartition {
    pub const SIZE: usize = 128;

    /// Decode one entry-array slot.
    ///
    /// A slot whose type GUID is all zero is unused and decodes to `None`;
    /// nothing else in it is resolved.
    pub fn from_bytes(data: &[u8]) -> Result<Option<Self>> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedInput {
                offset: 0,
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);

        let mut type_guid = [0u8; 16];
        cursor.read_exact(&mut type_guid)?;
        if type_guid == [0u8; 16] {
            return Ok(None);
        }

        let mut unique_guid = [0u8; 16];
        cursor.read_exact(&mut unique_guid)?;

        let first_lba = cursor.read_u64::<LittleEndian>()?;
        let last_lba = cursor.read_u64::<LittleEndian>()?;
        let flags = cursor.read_u64::<LittleEndian>()?;

        let mut raw_name = [0u8; 72];
        cursor.read_exact(&mut raw_name)?;

        Ok(Some(Self {
            type_guid: format_guid(&type_guid),
            unique_guid: format_guid(&unique_guid),
            first_lba,
            last_lba,
            flags,
            name: decode_utf16_name(&raw_name),
        }))
    }
}

/// A parsed partition table: header plus the full entry array.
///
/// Unused slots appear as `None` so entry indices stay aligned with the
/// on-disk array.
#[derive(Debug)]
pub struct Gpt {
    pub header: GptHeader,
    pub entries: Vec<Option<GptPartition>>,
}

impl Gpt {
    /// Parse a partition table from a byte range.
    ///
    /// The header is located by scanning for the first `"EFI PART"`
    /// signature in the range; everything before it is ignored. The entry
    /// array starts at `part_entry_start_lba * sector_size` relative to
    /// the header, and each slot occupies `part_entry_size` bytes. Only
    /// the first 128 bytes of a slot are decoded; the cursor advances by
    /// the declared stride so oversized slots skip their padding.
    ///
    /// # Errors
    ///
    /// Fails with `MalformedRecord` if no signature is found or a header
    /// check fails, and `TruncatedInput` if the range ends inside the
    /// header or the entry array.
    pub fn parse(data: &[u8], sector_size: u64) -> Result<Self> {
        let start = find_signature(data)?;
        let region = &data[start..];

        let header = GptHeader::from_bytes(region)?;

        let stride = header.part_entry_size as usize;
        let array_start = header.part_entry_start_lba * sector_size;

        let mut entries = Vec::with_capacity(header.num_part_entries as usize);
        for i in 0..header.num_part_entries as u64 {
            let offset = (array_start + i * stride as u64) as usize;
            if offset + GptPartition::SIZE > region.len() {
                return Err(Error::TruncatedInput {
                    offset: start as u64 + offset as u64,
                    needed: GptPartition::SIZE,
                    available: region.len().saturating_sub(offset),
                });
            }
            entries.push(GptPartition::from_bytes(&region[offset..])?);
        }

        Ok(Self { header, entries })
    }
}

/// Find the offset of the first header signature in the range
fn find_signature(data: &[u8]) -> Result<usize> {
    data.windows(GptHeader::SIGNATURE.len())
        .position(|window| window == GptHeader::SIGNATURE)
        .ok_or_else(|| Error::malformed("GptHeader", "signature not found in range"))
}

/// Render a raw 16-byte GUID in canonical text form.
///
/// The first three fields are stored little-endian, the rest as plain
/// bytes (the usual on-disk mixed-endian layout).
fn format_guid(raw: &[u8; 16]) -> String {
    let d1 = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let d2 = u16::from_le_bytes([raw[4], raw[5]]);
    let d3 = u16::from_le_bytes([raw[6], raw[7]]);
    format!(
        "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        d1, d2, d3, raw[8], raw[9], raw[10], raw[11], raw[12], raw[13], raw[14], raw[15]
    )
}

/// Decode a fixed UTF-16LE name field, stopping at the first NUL unit
fn decode_utf16_name(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
