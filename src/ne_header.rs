use crate::classify::TargetOs;
use crate::err::{IoStage, NeError, Result};
use crate::ne_parser::ReadSeek;
use crate::utils::ReadExt;

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use log::debug;
use serde::Serialize;
use std::io::{self, Read, Write};

pub const MZ_SIGNATURE: [u8; 2] = *b"MZ";
pub const NE_SIGNATURE: [u8; 2] = *b"NE";
/// Location of the NE header pointer inside the MS-DOS stub.
pub const NE_POINTER_OFFSET: u64 = 0x3C;
pub const NE_HEADER_SIZE: usize = 64;

bitflags! {
    /// The header flag word. The low byte describes the program, the high byte the application.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct ModuleFlags: u16 {
        const SINGLE_DATA = 0x0001;
        const MULTIPLE_DATA = 0x0002;
        const GLOBAL_INIT = 0x0004;
        const PROTECTED_MODE_ONLY = 0x0008;
        const INSTRUCTIONS_8086 = 0x0010;
        const INSTRUCTIONS_286 = 0x0020;
        const INSTRUCTIONS_386 = 0x0040;
        const INSTRUCTIONS_X87 = 0x0080;
        // Module cannot be loaded.
        const LINK_ERROR = 0x2000;
        // DLL: `initial_stack` is meaningless and CS:IP points at the load procedure.
        const LIBRARY_MODULE = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct Os2Flags: u8 {
        const LONG_FILE_NAMES = 0x01;
        const PROTECTED_MODE = 0x02;
        const PROPORTIONAL_FONTS = 0x04;
        const GANGLOAD_AREA = 0x08;
    }
}

const APPLICATION_TYPE_MASK: u16 = 0x0700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApplicationType {
    None,
    /// Not aware of the Windows/PM API.
    Fullscreen,
    WindowsPmCompatible,
    UsesWindowsPm,
    Unknown(u8),
}

impl From<u16> for ApplicationType {
    fn from(flags: u16) -> Self {
        match ((flags & APPLICATION_TYPE_MASK) >> 8) as u8 {
            0 => ApplicationType::None,
            1 => ApplicationType::Fullscreen,
            2 => ApplicationType::WindowsPmCompatible,
            3 => ApplicationType::UsesWindowsPm,
            other => ApplicationType::Unknown(other),
        }
    }
}

impl ApplicationType {
    pub fn name(&self) -> &'static str {
        match self {
            ApplicationType::None => "None",
            ApplicationType::Fullscreen => "Fullscreen",
            ApplicationType::WindowsPmCompatible => "Compatible with Windows/PM API",
            ApplicationType::UsesWindowsPm => "Uses Windows/PM API",
            ApplicationType::Unknown(_) => "Unknown",
        }
    }
}

/// The fixed 64-byte NE header.
///
/// Table offsets are relative to the start of the NE header, except `non_resident_names_offset`
/// which is relative to the start of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeHeader {
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub entry_table_offset: u16,
    pub entry_table_length: u16,
    pub file_load_crc: u32,
    pub flags: u16,
    pub auto_data_segment_index: u16,
    pub initial_heap_size: u16,
    pub initial_stack_size: u16,
    /// CS:IP, CS is an index into the segment table.
    pub entry_point: u32,
    /// SS:SP, SS is an index into the segment table.
    pub initial_stack: u32,
    pub segment_count: u16,
    pub module_reference_count: u16,
    pub non_resident_names_size: u16,
    pub segment_table_offset: u16,
    pub resource_table_offset: u16,
    pub resident_names_offset: u16,
    pub module_reference_offset: u16,
    pub imported_names_offset: u16,
    pub non_resident_names_offset: u32,
    pub movable_entry_count: u16,
    /// Shift count for segment sector offsets, 0 means 9 (512 byte pages).
    pub file_alignment_shift: u16,
    pub resource_entry_count: u16,
    pub target_os: u8,

    // The remaining fields are not defined by Windows 3.0 and are OS/2 specific.
    pub os2_flags: u8,
    pub return_thunks_offset: u16,
    pub segment_reference_thunks_offset: u16,
    pub min_code_swap_size: u16,
    /// Minor version first.
    pub expected_windows_version: [u8; 2],
}

impl NeHeader {
    /// Validates the MS-DOS stub and returns the file offset of the NE header it points at.
    pub fn locate<T: ReadSeek>(stream: &mut T) -> Result<u64> {
        stream.try_seek_abs_named(0, IoStage::SeekStub)?;

        let mut magic = [0_u8; 2];
        match stream.read_exact(&mut magic) {
            Ok(()) => {}
            // Too short to carry a stub at all.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(NeError::NotAnExecutable { magic });
            }
            Err(source) => return Err(NeError::UnreadableStream { source }),
        }

        if magic != MZ_SIGNATURE {
            return Err(NeError::NotAnExecutable { magic });
        }

        stream.try_seek_abs_named(NE_POINTER_OFFSET, IoStage::SeekNePointer)?;
        let ne_ptr = stream.try_u16_named(IoStage::ReadNePointer, "NE pointer")?;
        debug!("NE header pointer: {:#06x}", ne_ptr);

        Ok(u64::from(ne_ptr))
    }

    /// Reads the whole header at `offset` in one contiguous read.
    pub fn from_stream<T: ReadSeek>(stream: &mut T, offset: u64) -> Result<NeHeader> {
        stream.try_seek_abs_named(offset, IoStage::SeekHeader)?;
        let buf = stream.try_array_named::<NE_HEADER_SIZE>(IoStage::ReadHeader, "NE header")?;

        let header = NeHeader::from_bytes(&buf, offset)?;
        debug!("NE Header: {:#?}", header);

        Ok(header)
    }

    pub fn from_bytes(buf: &[u8; NE_HEADER_SIZE], offset: u64) -> Result<NeHeader> {
        let magic = [buf[0], buf[1]];
        if magic != NE_SIGNATURE {
            return Err(NeError::NotNewExecutable { magic, offset });
        }

        Ok(NeHeader {
            major_linker_version: buf[0x02],
            minor_linker_version: buf[0x03],
            entry_table_offset: LittleEndian::read_u16(&buf[0x04..]),
            entry_table_length: LittleEndian::read_u16(&buf[0x06..]),
            file_load_crc: LittleEndian::read_u32(&buf[0x08..]),
            flags: LittleEndian::read_u16(&buf[0x0C..]),
            auto_data_segment_index: LittleEndian::read_u16(&buf[0x0E..]),
            initial_heap_size: LittleEndian::read_u16(&buf[0x10..]),
            initial_stack_size: LittleEndian::read_u16(&buf[0x12..]),
            entry_point: LittleEndian::read_u32(&buf[0x14..]),
            initial_stack: LittleEndian::read_u32(&buf[0x18..]),
            segment_count: LittleEndian::read_u16(&buf[0x1C..]),
            module_reference_count: LittleEndian::read_u16(&buf[0x1E..]),
            non_resident_names_size: LittleEndian::read_u16(&buf[0x20..]),
            segment_table_offset: LittleEndian::read_u16(&buf[0x22..]),
            resource_table_offset: LittleEndian::read_u16(&buf[0x24..]),
            resident_names_offset: LittleEndian::read_u16(&buf[0x26..]),
            module_reference_offset: LittleEndian::read_u16(&buf[0x28..]),
            imported_names_offset: LittleEndian::read_u16(&buf[0x2A..]),
            non_resident_names_offset: LittleEndian::read_u32(&buf[0x2C..]),
            movable_entry_count: LittleEndian::read_u16(&buf[0x30..]),
            file_alignment_shift: LittleEndian::read_u16(&buf[0x32..]),
            resource_entry_count: LittleEndian::read_u16(&buf[0x34..]),
            target_os: buf[0x36],
            os2_flags: buf[0x37],
            return_thunks_offset: LittleEndian::read_u16(&buf[0x38..]),
            segment_reference_thunks_offset: LittleEndian::read_u16(&buf[0x3A..]),
            min_code_swap_size: LittleEndian::read_u16(&buf[0x3C..]),
            expected_windows_version: [buf[0x3E], buf[0x3F]],
        })
    }

    /// Writes the header back in its on-disk layout, signature included.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&NE_SIGNATURE)?;
        w.write_u8(self.major_linker_version)?;
        w.write_u8(self.minor_linker_version)?;
        w.write_u16::<LittleEndian>(self.entry_table_offset)?;
        w.write_u16::<LittleEndian>(self.entry_table_length)?;
        w.write_u32::<LittleEndian>(self.file_load_crc)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.auto_data_segment_index)?;
        w.write_u16::<LittleEndian>(self.initial_heap_size)?;
        w.write_u16::<LittleEndian>(self.initial_stack_size)?;
        w.write_u32::<LittleEndian>(self.entry_point)?;
        w.write_u32::<LittleEndian>(self.initial_stack)?;
        w.write_u16::<LittleEndian>(self.segment_count)?;
        w.write_u16::<LittleEndian>(self.module_reference_count)?;
        w.write_u16::<LittleEndian>(self.non_resident_names_size)?;
        w.write_u16::<LittleEndian>(self.segment_table_offset)?;
        w.write_u16::<LittleEndian>(self.resource_table_offset)?;
        w.write_u16::<LittleEndian>(self.resident_names_offset)?;
        w.write_u16::<LittleEndian>(self.module_reference_offset)?;
        w.write_u16::<LittleEndian>(self.imported_names_offset)?;
        w.write_u32::<LittleEndian>(self.non_resident_names_offset)?;
        w.write_u16::<LittleEndian>(self.movable_entry_count)?;
        w.write_u16::<LittleEndian>(self.file_alignment_shift)?;
        w.write_u16::<LittleEndian>(self.resource_entry_count)?;
        w.write_u8(self.target_os)?;
        w.write_u8(self.os2_flags)?;
        w.write_u16::<LittleEndian>(self.return_thunks_offset)?;
        w.write_u16::<LittleEndian>(self.segment_reference_thunks_offset)?;
        w.write_u16::<LittleEndian>(self.min_code_swap_size)?;
        w.write_all(&self.expected_windows_version)
    }

    pub fn module_flags(&self) -> ModuleFlags {
        ModuleFlags::from_bits_truncate(self.flags)
    }

    pub fn application_type(&self) -> ApplicationType {
        ApplicationType::from(self.flags)
    }

    pub fn is_library(&self) -> bool {
        self.module_flags().contains(ModuleFlags::LIBRARY_MODULE)
    }

    pub fn os2_flags(&self) -> Os2Flags {
        Os2Flags::from_bits_truncate(self.os2_flags)
    }

    pub fn target_os(&self) -> TargetOs {
        TargetOs::from(self.target_os)
    }

    /// `(major, minor)`
    pub fn expected_windows_version(&self) -> (u8, u8) {
        (
            self.expected_windows_version[1],
            self.expected_windows_version[0],
        )
    }
}
