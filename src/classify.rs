//! Display names for the numeric codes found in an NE header.
//!
//! Every lookup is total: codes without a known meaning map to `"Unknown"`.

use serde::Serialize;

/// Set on a resource type identifier when it is an integer type rather than a name offset.
pub const RESOURCE_ID_INTEGER_FLAG: u16 = 0x8000;

/// Operating system a module was linked for (header offset `0x36`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetOs {
    Unknown(u8),
    Os2,
    Windows,
    EuropeanDos4,
    Windows386,
    Boss,
}

impl From<u8> for TargetOs {
    fn from(code: u8) -> Self {
        match code {
            1 => TargetOs::Os2,
            2 => TargetOs::Windows,
            3 => TargetOs::EuropeanDos4,
            4 => TargetOs::Windows386,
            5 => TargetOs::Boss,
            other => TargetOs::Unknown(other),
        }
    }
}

impl TargetOs {
    pub fn name(&self) -> &'static str {
        match self {
            TargetOs::Os2 => "OS/2",
            TargetOs::Windows => "Windows (16-bit)",
            TargetOs::EuropeanDos4 => "MS-DOS 4.0 (Europe)",
            TargetOs::Windows386 => "Windows (32-bit)",
            TargetOs::Boss => "Borland Operating System Services",
            TargetOs::Unknown(_) => "Unknown",
        }
    }
}

/// Predefined resource types. Identifiers are compared with the integer flag masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceType {
    Unknown(u16),
    Cursor,
    Bitmap,
    Icon,
    Menu,
    Dialog,
    StringTable,
    FontDirectory,
    Font,
    Accelerator,
    RcData,
    GroupCursor,
    GroupIcon,
    NameTable,
    Version,
}

impl From<u16> for ResourceType {
    fn from(code: u16) -> Self {
        match code & !RESOURCE_ID_INTEGER_FLAG {
            1 => ResourceType::Cursor,
            2 => ResourceType::Bitmap,
            3 => ResourceType::Icon,
            4 => ResourceType::Menu,
            5 => ResourceType::Dialog,
            6 => ResourceType::StringTable,
            7 => ResourceType::FontDirectory,
            8 => ResourceType::Font,
            9 => ResourceType::Accelerator,
            10 => ResourceType::RcData,
            12 => ResourceType::GroupCursor,
            14 => ResourceType::GroupIcon,
            15 => ResourceType::NameTable,
            16 => ResourceType::Version,
            _ => ResourceType::Unknown(code),
        }
    }
}

impl ResourceType {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceType::Cursor => "Cursor",
            ResourceType::Bitmap => "Bitmap",
            ResourceType::Icon => "Icon",
            ResourceType::Menu => "Menu",
            ResourceType::Dialog => "Dialog box",
            ResourceType::StringTable => "String table",
            ResourceType::FontDirectory => "Font directory",
            ResourceType::Font => "Font",
            ResourceType::Accelerator => "Accelerator table",
            ResourceType::RcData => "Resource data",
            ResourceType::GroupCursor => "Group cursor",
            ResourceType::GroupIcon => "Group icon",
            ResourceType::NameTable => "Name table",
            ResourceType::Version => "Version",
            ResourceType::Unknown(_) => "Unknown",
        }
    }
}

pub fn classify_target_os(code: u8) -> &'static str {
    TargetOs::from(code).name()
}

pub fn classify_resource_type(code: u16) -> &'static str {
    ResourceType::from(code).name()
}
