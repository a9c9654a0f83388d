//! Human readable and JSON renderings of a decoded module.

use crate::classify::classify_target_os;
use crate::err::{NeError, Result};
use crate::ne_header::{ApplicationType, ModuleFlags, NeHeader, Os2Flags};
use crate::ne_parser::NeExecutable;
use crate::ne_resource_table::ResourceTable;

use serde::Serialize;
use std::io::Write;

fn output_err(source: std::io::Error) -> NeError {
    NeError::FailedToWriteOutput { source }
}

fn flag_names<B>(flags: &B) -> String
where
    B: bitflags::Flags,
    B::Bits: bitflags::parser::WriteHex,
{
    if flags.is_empty() {
        return "none".to_owned();
    }
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = bitflags::parser::to_writer(flags, &mut out);
    out
}

fn segmented(address: u32) -> String {
    format!("{:04X}:{:04X}", address >> 16, address & 0xFFFF)
}

/// Writes the summary printed by `ned_dump`.
///
/// The resource section is left out when only the header was decoded.
pub fn write_text<W: Write>(exe: &NeExecutable, out: &mut W) -> Result<()> {
    let header = exe.header()?;

    writeln!(
        out,
        "Linker version: {}.{}",
        header.major_linker_version, header.minor_linker_version
    )
    .map_err(output_err)?;
    writeln!(
        out,
        "Target OS: {} [#{}]",
        classify_target_os(header.target_os),
        header.target_os
    )
    .map_err(output_err)?;
    writeln!(out, "NE header offset: {:#06x}", exe.header_offset()?).map_err(output_err)?;
    writeln!(
        out,
        "Flags: {} [{:#06x}]",
        flag_names(&header.module_flags()),
        header.flags
    )
    .map_err(output_err)?;
    writeln!(out, "Application type: {}", header.application_type().name())
        .map_err(output_err)?;
    if header.os2_flags != 0 {
        writeln!(out, "OS/2 flags: {}", flag_names(&header.os2_flags())).map_err(output_err)?;
    }
    writeln!(out, "Entry point: {}", segmented(header.entry_point)).map_err(output_err)?;
    if !header.is_library() {
        writeln!(out, "Initial stack: {}", segmented(header.initial_stack))
            .map_err(output_err)?;
    }
    writeln!(out, "Segments: {}", header.segment_count).map_err(output_err)?;
    writeln!(out, "Module references: {}", header.module_reference_count)
        .map_err(output_err)?;
    let (major, minor) = header.expected_windows_version();
    writeln!(out, "Expected Windows version: {}.{}", major, minor).map_err(output_err)?;

    if !exe.has_resources() {
        return Ok(());
    }
    let resources = exe.resources()?;

    writeln!(out, "Resource alignment shift: {}", resources.alignment_shift)
        .map_err(output_err)?;
    writeln!(out, "Resource types: {}", resources.len()).map_err(output_err)?;
    for entry in resources {
        writeln!(
            out,
            "  {} [{:#06x}]: {} resource(s)",
            entry.resource_type().name(),
            entry.type_id,
            entry.resource_count()
        )
        .map_err(output_err)?;
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct ResourceTypeJson {
    type_id: u16,
    name: &'static str,
    integer_id: bool,
    resource_count: u16,
    reserved: u32,
}

#[derive(Debug, Serialize)]
struct ResourceTableJson {
    alignment_shift: u16,
    types: Vec<ResourceTypeJson>,
}

impl From<&ResourceTable> for ResourceTableJson {
    fn from(table: &ResourceTable) -> Self {
        ResourceTableJson {
            alignment_shift: table.alignment_shift,
            types: table
                .iter()
                .map(|entry| ResourceTypeJson {
                    type_id: entry.type_id,
                    name: entry.resource_type().name(),
                    integer_id: entry.is_integer_id(),
                    resource_count: entry.metadata.resource_count,
                    reserved: entry.metadata.reserved,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExecutableJson<'a> {
    header_offset: u64,
    target_os_name: &'static str,
    module_flags: ModuleFlags,
    application_type: ApplicationType,
    os2_flags: Os2Flags,
    header: &'a NeHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    resources: Option<ResourceTableJson>,
}

pub fn write_json<W: Write>(exe: &NeExecutable, out: &mut W, indent: bool) -> Result<()> {
    let header = exe.header()?;
    let doc = ExecutableJson {
        header_offset: exe.header_offset()?,
        target_os_name: classify_target_os(header.target_os),
        module_flags: header.module_flags(),
        application_type: header.application_type(),
        os2_flags: header.os2_flags(),
        header,
        resources: if exe.has_resources() {
            Some(ResourceTableJson::from(exe.resources()?))
        } else {
            None
        },
    };

    let written = if indent {
        serde_json::to_writer_pretty(&mut *out, &doc)
    } else {
        serde_json::to_writer(&mut *out, &doc)
    };
    written.map_err(|e| output_err(e.into()))?;
    writeln!(out).map_err(output_err)
}
