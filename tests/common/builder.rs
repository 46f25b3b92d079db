//! Builders for synthetic FFU containers and partition tables
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use ffu2img::ffu::{BlockDataEntry, ImageHeader, SecurityHeader};

/// Microsoft basic data partition type GUID, raw on-disk bytes
pub const BASIC_DATA_GUID: [u8; 16] = [
    0xa2, 0xa0, 0xd0, 0xeb, 0xe5, 0xb9, 0x33, 0x44, 0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7,
];

struct EntrySpec {
    payload: Vec<u8>,
    locations: Vec<(u32, u32)>,
}

/// Builds a complete synthetic V1 container: security header, opaque
/// regions, image header, one store with its write descriptor table, and
/// the payload chunks, with every region padded to the chunk boundary the
/// way the parser expects to find it.
pub struct FfuBuilder {
    chunk_size_kb: u32,
    block_size: u32,
    security_signature: [u8; 12],
    image_signature: [u8; 12],
    catalog: Vec<u8>,
    hash_table: Vec<u8>,
    manifest: Vec<u8>,
    validate_descriptors: (u32, u32, u8),
    final_table: (u32, u32),
    entries: Vec<EntrySpec>,
}

impl FfuBuilder {
    pub fn new() -> Self {
        Self {
            chunk_size_kb: 1,
            block_size: 512,
            security_signature: *SecurityHeader::SIGNATURE,
            image_signature: *ImageHeader::SIGNATURE,
            catalog: Vec::new(),
            hash_table: Vec::new(),
            manifest: Vec::new(),
            validate_descriptors: (0, 0, 0),
            final_table: (0, 0),
            entries: Vec::new(),
        }
    }

    pub fn chunk_size_kb(mut self, kb: u32) -> Self {
        self.chunk_size_kb = kb;
        self
    }

    pub fn block_size(mut self, bytes: u32) -> Self {
        self.block_size = bytes;
        self
    }

    pub fn security_signature(mut self, signature: [u8; 12]) -> Self {
        self.security_signature = signature;
        self
    }

    pub fn image_signature(mut self, signature: [u8; 12]) -> Self {
        self.image_signature = signature;
        self
    }

    pub fn catalog(mut self, bytes: Vec<u8>) -> Self {
        self.catalog = bytes;
        self
    }

    pub fn hash_table(mut self, bytes: Vec<u8>) -> Self {
        self.hash_table = bytes;
        self
    }

    pub fn manifest(mut self, bytes: Vec<u8>) -> Self {
        self.manifest = bytes;
        self
    }

    /// Fill the validation region with `count * length` bytes of `fill`
    pub fn validate_descriptors(mut self, count: u32, length: u32, fill: u8) -> Self {
        self.validate_descriptors = (count, length, fill);
        self
    }

    /// Address the final partition table as a block range into the payload
    pub fn final_table(mut self, index: u32, count: u32) -> Self {
        self.final_table = (index, count);
        self
    }

    /// Append one payload chunk and its destinations.
    ///
    /// `locations` pairs are `(access_method, block_index)`; the payload
    /// must be a whole number of blocks.
    pub fn entry(mut self, payload: Vec<u8>, locations: Vec<(u32, u32)>) -> Self {
        assert_eq!(
            payload.len() % self.block_size as usize,
            0,
            "payload must be a whole number of blocks"
        );
        self.entries.push(EntrySpec { payload, locations });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let chunk = self.chunk_size_kb as usize * 1024;
        let mut out = Vec::new();

        // Security header
        out.write_u32::<LittleEndian>(SecurityHeader::SIZE as u32).unwrap();
        out.extend_from_slice(&self.security_signature);
        out.write_u32::<LittleEndian>(self.chunk_size_kb).unwrap();
        out.write_u32::<LittleEndian>(0x0000800c).unwrap();
        out.write_u32::<LittleEndian>(self.catalog.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(self.hash_table.len() as u32).unwrap();
        out.extend_from_slice(&self.catalog);
        out.extend_from_slice(&self.hash_table);
        pad_to(&mut out, chunk);

        // Image header and manifest
        out.write_u32::<LittleEndian>(ImageHeader::SIZE as u32).unwrap();
        out.extend_from_slice(&self.image_signature);
        out.write_u32::<LittleEndian>(self.manifest.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(self.chunk_size_kb).unwrap();
        out.extend_from_slice(&self.manifest);
        pad_to(&mut out, chunk);

        // Store header
        let (validate_count, validate_length, validate_fill) = self.validate_descriptors;
        let write_descriptor_length = self
            .entries
            .first()
            .map(|e| (BlockDataEntry::PREFIX_SIZE + e.locations.len() * 8) as u32)
            .unwrap_or(0);

        out.write_u32::<LittleEndian>(0).unwrap(); // update type
        out.write_u16::<LittleEndian>(1).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(2).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        let mut platform_id = [0u8; 192];
        platform_id[..13].copy_from_slice(b"Test.Platform");
        out.extend_from_slice(&platform_id);
        out.write_u32::<LittleEndian>(self.block_size).unwrap();
        out.write_u32::<LittleEndian>(self.entries.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(write_descriptor_length).unwrap();
        out.write_u32::<LittleEndian>(validate_count).unwrap();
        out.write_u32::<LittleEndian>(validate_length).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap(); // initial table
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap(); // flash-only table
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(self.final_table.0).unwrap();
        out.write_u32::<LittleEndian>(self.final_table.1).unwrap();

        // Validation region
        out.extend(std::iter::repeat_n(
            validate_fill,
            validate_count as usize * validate_length as usize,
        ));

        // Write descriptor table
        for entry in &self.entries {
            out.write_u32::<LittleEndian>(entry.locations.len() as u32).unwrap();
            out.write_u32::<LittleEndian>((entry.payload.len() / self.block_size as usize) as u32)
                .unwrap();
            for &(method, index) in &entry.locations {
                out.write_u32::<LittleEndian>(method).unwrap();
                out.write_u32::<LittleEndian>(index).unwrap();
            }
        }
        pad_to(&mut out, chunk);

        // Payload chunks, back-to-back in table order
        for entry in self.entries {
            out.extend_from_slice(&entry.payload);
        }

        out
    }
}

/// One used partition slot for [`GptBuilder`]
pub struct PartitionSpec {
    pub type_guid: [u8; 16],
    pub unique_guid: [u8; 16],
    pub first_lba: u64,
    pub last_lba: u64,
    pub flags: u64,
    pub name: String,
}

impl PartitionSpec {
    pub fn new(name: &str, first_lba: u64, last_lba: u64) -> Self {
        let mut unique_guid = BASIC_DATA_GUID;
        unique_guid[0] = first_lba as u8;
        Self {
            type_guid: BASIC_DATA_GUID,
            unique_guid,
            first_lba,
            last_lba,
            flags: 0,
            name: name.to_string(),
        }
    }
}

/// Builds a raw partition-table byte range: optional prefix padding, the
/// 92-byte header, then the entry array at `part_entry_start_lba` sectors
/// past the header, used slots first and zeroed slots after.
pub struct GptBuilder {
    prefix: usize,
    backup_lba: u64,
    entry_size: u32,
    slots: u32,
    revision: [u8; 4],
    header_size: u32,
    entry_pad_fill: u8,
    partitions: Vec<PartitionSpec>,
}

impl GptBuilder {
    pub fn new(backup_lba: u64) -> Self {
        Self {
            prefix: 0,
            backup_lba,
            entry_size: 128,
            slots: 4,
            revision: [0, 0, 1, 0],
            header_size: 92,
            entry_pad_fill: 0,
            partitions: Vec::new(),
        }
    }

    /// Bytes of junk placed before the header signature
    pub fn prefix(mut self, len: usize) -> Self {
        self.prefix = len;
        self
    }

    /// Declared per-slot stride (may exceed the 128 decoded bytes)
    pub fn entry_size(mut self, size: u32) -> Self {
        self.entry_size = size;
        self
    }

    /// Total entry-array slots, including unused ones
    pub fn slots(mut self, slots: u32) -> Self {
        self.slots = slots;
        self
    }

    pub fn revision(mut self, revision: [u8; 4]) -> Self {
        self.revision = revision;
        self
    }

    pub fn header_size(mut self, size: u32) -> Self {
        self.header_size = size;
        self
    }

    /// Filler byte for the stride padding past each decoded entry
    pub fn entry_pad_fill(mut self, fill: u8) -> Self {
        self.entry_pad_fill = fill;
        self
    }

    pub fn partition(mut self, partition: PartitionSpec) -> Self {
        self.partitions.push(partition);
        self
    }

    pub fn build(self) -> Vec<u8> {
        const SECTOR_SIZE: usize = 512;
        let entry_start_lba = 1u64;

        let mut out = vec![0xeeu8; self.prefix];

        out.extend_from_slice(b"EFI PART");
        out.extend_from_slice(&self.revision);
        out.write_u32::<LittleEndian>(self.header_size).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap(); // header CRC, unverified
        out.write_u32::<LittleEndian>(0).unwrap(); // reserved
        out.write_u64::<LittleEndian>(1).unwrap(); // current LBA
        out.write_u64::<LittleEndian>(self.backup_lba).unwrap();
        out.write_u64::<LittleEndian>(34).unwrap(); // first usable LBA
        out.write_u64::<LittleEndian>(self.backup_lba.saturating_sub(33)).unwrap();
        out.extend_from_slice(&BASIC_DATA_GUID); // disk GUID
        out.write_u64::<LittleEndian>(entry_start_lba).unwrap();
        out.write_u32::<LittleEndian>(self.slots).unwrap();
        out.write_u32::<LittleEndian>(self.entry_size).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap(); // entry array CRC, unverified

        // Entry array sits entry_start_lba sectors past the header start
        let array_offset = self.prefix + entry_start_lba as usize * SECTOR_SIZE;
        out.resize(array_offset, 0);

        for i in 0..self.slots as usize {
            match self.partitions.get(i) {
                Some(partition) => {
                    out.extend_from_slice(&partition.type_guid);
                    out.extend_from_slice(&partition.unique_guid);
                    out.write_u64::<LittleEndian>(partition.first_lba).unwrap();
                    out.write_u64::<LittleEndian>(partition.last_lba).unwrap();
                    out.write_u64::<LittleEndian>(partition.flags).unwrap();
                    let mut raw_name = [0u8; 72];
                    for (j, unit) in partition.name.encode_utf16().enumerate() {
                        raw_name[j * 2..j * 2 + 2].copy_from_slice(&unit.to_le_bytes());
                    }
                    out.extend_from_slice(&raw_name);
                    out.extend(std::iter::repeat_n(
                        self.entry_pad_fill,
                        self.entry_size as usize - 128,
                    ));
                }
                None => out.extend(std::iter::repeat_n(0u8, self.entry_size as usize)),
            }
        }

        out
    }
}

fn pad_to(out: &mut Vec<u8>, chunk: usize) {
    let rem = out.len() % chunk;
    if rem != 0 {
        out.resize(out.len() + chunk - rem, 0);
    }
}
