use crate::classify::{RESOURCE_ID_INTEGER_FLAG, ResourceType};
use crate::err::{IoStage, Result};
use crate::ne_header::NeHeader;
use crate::ne_parser::{NameInfoPolicy, ParserSettings, ReadSeek, ResourceTableBase};
use crate::utils::ReadExt;

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, trace};
use serde::Serialize;
use std::io::{self, Write};

/// Type identifier that ends the resource type list.
pub const RESOURCE_TYPE_TERMINATOR: u16 = 0;
/// Size of one name-info record (offset, length, flags, id, handle, usage).
pub const RESOURCE_NAME_INFO_SIZE: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceTypeMetadata {
    pub resource_count: u16,
    pub reserved: u32,
}

/// One resource type present in the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceTypeEntry {
    pub type_id: u16,
    pub metadata: ResourceTypeMetadata,
}

impl ResourceTypeEntry {
    /// When unset, `type_id` is an offset into the resource name table instead.
    pub fn is_integer_id(&self) -> bool {
        self.type_id & RESOURCE_ID_INTEGER_FLAG != 0
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::from(self.type_id)
    }

    pub fn resource_count(&self) -> u16 {
        self.metadata.resource_count
    }
}

/// The resource type list, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceTable {
    pub alignment_shift: u16,
    pub types: Vec<ResourceTypeEntry>,
}

impl ResourceTable {
    /// Resolves the file offset of the resource table for `header` located at `header_offset`.
    pub fn file_offset(header: &NeHeader, header_offset: u64, settings: &ParserSettings) -> u64 {
        let table_offset = u64::from(header.resource_table_offset);
        match settings.get_resource_table_base() {
            ResourceTableBase::FileAbsolute => table_offset,
            ResourceTableBase::HeaderRelative => header_offset + table_offset,
        }
    }

    pub fn from_stream<T: ReadSeek>(
        stream: &mut T,
        header: &NeHeader,
        header_offset: u64,
        settings: &ParserSettings,
    ) -> Result<ResourceTable> {
        let offset = ResourceTable::file_offset(header, header_offset, settings);
        debug!("Resource table at offset {:#x}", offset);

        stream.try_seek_abs_named(offset, IoStage::SeekResourceTable)?;
        let alignment_shift =
            stream.try_u16_named(IoStage::ReadResourceTable, "resource alignment shift")?;

        let mut types = Vec::new();

        loop {
            let type_id = stream.try_u16_named(IoStage::ReadResourceTable, "resource type id")?;
            if type_id == RESOURCE_TYPE_TERMINATOR {
                break;
            }

            let resource_count =
                stream.try_u16_named(IoStage::ReadResourceTable, "resource count")?;
            let reserved = stream.try_u32_named(IoStage::ReadResourceTable, "resource reserved")?;

            let entry = ResourceTypeEntry {
                type_id,
                metadata: ResourceTypeMetadata {
                    resource_count,
                    reserved,
                },
            };
            trace!("Resource type entry {}: {:?}", types.len(), entry);

            if settings.get_name_info() == NameInfoPolicy::Skip {
                stream.try_seek_rel_named(
                    i64::from(resource_count) * RESOURCE_NAME_INFO_SIZE,
                    IoStage::SkipNameInfo,
                )?;
            }

            types.push(entry);
        }

        Ok(ResourceTable {
            alignment_shift,
            types,
        })
    }

    /// Writes the alignment shift, every type entry and the terminator.
    ///
    /// Name-info records are not part of the decoded table and are not written.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.alignment_shift)?;
        for entry in &self.types {
            w.write_u16::<LittleEndian>(entry.type_id)?;
            w.write_u16::<LittleEndian>(entry.metadata.resource_count)?;
            w.write_u32::<LittleEndian>(entry.metadata.reserved)?;
        }
        w.write_u16::<LittleEndian>(RESOURCE_TYPE_TERMINATOR)
    }

    /// Multiplier that converts stored resource offsets into byte offsets, `None` if the shift
    /// does not fit in 64 bits.
    pub fn alignment_bytes(&self) -> Option<u64> {
        1_u64.checked_shl(u32::from(self.alignment_shift))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceTypeEntry> {
        self.types.iter()
    }
}

impl<'a> IntoIterator for &'a ResourceTable {
    type Item = &'a ResourceTypeEntry;
    type IntoIter = std::slice::Iter<'a, ResourceTypeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}
