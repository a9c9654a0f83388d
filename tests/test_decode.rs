
use fixtures::*;

use ned::err::{IoStage, NeError};
use ned::{
    NameInfoPolicy, NeExecutable, NeParser, ParserSettings, ResourceTableBase, ResourceType,
    TargetOs, decode_executable, decode_executable_with,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use tempfile::tempdir;

#[test]
fn test_rejects_non_mz_input() {
    ensure_env_logger_initialized();
    for input in [&b""[..], b"ZM", b"\x7fELF\x02\x01\x01", &[0_u8; 256]] {
        let err = decode_executable(&mut Cursor::new(input.to_vec())).unwrap_err();
        assert!(
            matches!(err, NeError::NotAnExecutable { .. }),
            "unexpected error {err:?} for {input:02X?}"
        );
    }
}

#[test]
fn test_rejects_stub_pointing_at_non_ne_header() {
    let image = NeImageBuilder::new().set_u16(0, u16::from_le_bytes(*b"PE")).build();

    let mut exe = NeExecutable::new();
    let err = exe.read_header(&mut Cursor::new(image)).unwrap_err();

    assert!(matches!(
        err,
        NeError::NotNewExecutable {
            magic: [b'P', b'E'],
            offset: 0x80
        }
    ));
    assert!(!exe.is_ready());
    assert!(exe.last_error().contains("Not an NE file"));
}

#[test]
fn test_pointer_past_end_of_file_is_io_failure() {
    let mut image = NeImageBuilder::new().build();
    image[0x3C..0x3E].copy_from_slice(&0xFFF0_u16.to_le_bytes());

    let err = decode_executable(&mut Cursor::new(image)).unwrap_err();
    assert_eq!(err.stage(), Some(IoStage::ReadHeader));
}

#[test]
fn test_minimal_well_formed_file() {
    let image = NeImageBuilder::new().build();
    let exe = decode_executable(&mut Cursor::new(image)).unwrap();

    assert!(exe.is_ready());
    assert_eq!(exe.last_error(), "Success");

    let header = exe.header().unwrap();
    assert_eq!(header.target_os(), TargetOs::Windows);
    assert_eq!(
        (header.major_linker_version, header.minor_linker_version),
        (5, 10)
    );
    assert!(exe.resources().unwrap().is_empty());
    assert_eq!(exe.resources().unwrap().alignment_shift, 4);
}

#[test]
fn test_entries_decode_in_file_order() {
    let builder = NeImageBuilder::new()
        .resource_type(0x8002, 3, 0)
        .resource_type(0x8004, 1, 0xAABB_CCDD)
        .resource_type(0x8002, 1, 0)
        .resource_type(0x0120, 2, 0)
        .resource_type(0x8010, 1, 0);
    let exe = decode_executable(&mut Cursor::new(builder.build())).unwrap();

    let decoded: Vec<(u16, u16, u32)> = exe
        .resources()
        .unwrap()
        .iter()
        .map(|e| (e.type_id, e.metadata.resource_count, e.metadata.reserved))
        .collect();
    assert_eq!(decoded, builder.types);

    let kinds: Vec<ResourceType> = exe
        .resources()
        .unwrap()
        .iter()
        .map(|e| e.resource_type())
        .collect();
    assert_eq!(
        kinds,
        vec![
            ResourceType::Bitmap,
            ResourceType::Menu,
            ResourceType::Bitmap,
            ResourceType::Unknown(0x0120),
            ResourceType::Version,
        ]
    );
}

#[test]
fn test_reserialization_reproduces_original_bytes() {
    let builder = NeImageBuilder::new()
        .set_u32(0x08, 0x1234_5678)
        .set_u16(0x0C, 0x0302)
        .set_u32(0x14, 0x0001_0042)
        .set_u16(0x1C, 3)
        .set_u8(0x37, 0x0A)
        .resource_type(0x8003, 2, 0)
        .resource_type(0x800E, 2, 7);
    let image = builder.build();

    let exe = decode_executable(&mut Cursor::new(image.clone())).unwrap();
    let (header, resources) = exe.into_parts().unwrap();

    let mut header_bytes = vec![];
    header.write_to(&mut header_bytes).unwrap();
    assert_eq!(header_bytes, image[0x80..0x80 + NE_HEADER_SIZE].to_vec());

    let mut list_bytes = vec![];
    resources.unwrap().write_to(&mut list_bytes).unwrap();
    assert_eq!(list_bytes, image[builder.table_offset()..].to_vec());
}

#[test]
fn test_truncated_between_entries_is_unexpected_eof() {
    let builder = NeImageBuilder::new()
        .resource_type(0x8001, 1, 0)
        .resource_type(0x8003, 1, 0)
        .resource_type(0x8005, 1, 0);
    let mut image = builder.build();
    // Keep the alignment shift and the first two entries.
    image.truncate(builder.table_offset() + 2 + 2 * 8);

    let mut exe = NeExecutable::new();
    let mut cursor = Cursor::new(image);
    exe.read_header(&mut cursor).unwrap();
    let err = exe
        .read_resources(&mut cursor, &ParserSettings::new())
        .unwrap_err();

    assert!(matches!(err, NeError::UnexpectedEof { .. }), "{err:?}");
    assert!(!exe.is_ready());
    assert!(exe.resources().is_err());
}

#[test]
fn test_header_relative_resource_table() {
    let builder = NeImageBuilder::new()
        .table_gap(0x20)
        .resource_type(0x8006, 4, 0);
    let image = builder.build_header_relative();

    let settings = ParserSettings::new().resource_table_base(ResourceTableBase::HeaderRelative);
    let exe = decode_executable_with(&mut Cursor::new(image), &settings).unwrap();

    let resources = exe.resources().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources.types[0].resource_type(), ResourceType::StringTable);
}

#[test]
fn test_name_info_policies() {
    let builder = NeImageBuilder::new()
        .with_name_info()
        .resource_type(0x8003, 2, 0)
        .resource_type(0x800E, 1, 0);
    let image = builder.build();

    let skip = ParserSettings::new().name_info(NameInfoPolicy::Skip);
    let exe = decode_executable_with(&mut Cursor::new(image.clone()), &skip).unwrap();
    let ids: Vec<u16> = exe.resources().unwrap().iter().map(|e| e.type_id).collect();
    assert_eq!(ids, vec![0x8003, 0x800E]);

    // Without skipping, the first name-info record is misread as the next type entry.
    let exe = decode_executable(&mut Cursor::new(image)).unwrap();
    let ids: Vec<u16> = exe.resources().unwrap().iter().map(|e| e.type_id).collect();
    assert_eq!(ids[0], 0x8003);
    assert_eq!(ids[1], 0x0100);
}

#[test]
fn test_parser_from_path() {
    let d = tempdir().unwrap();
    let path = write_sample(
        d.path(),
        "sample.exe",
        &NeImageBuilder::new()
            .ne_offset(0x40)
            .resource_type(0x8009, 1, 0)
            .build(),
    );

    let mut parser = NeParser::from_path(&path).unwrap();
    let exe = parser.try_parse().unwrap();

    assert_eq!(exe.header_offset().unwrap(), 0x40);
    assert_eq!(
        exe.resources().unwrap().types[0].resource_type(),
        ResourceType::Accelerator
    );
}

#[test]
fn test_parser_keeps_degraded_executable() {
    let mut image = NeImageBuilder::new().resource_type(0x8001, 1, 0).build();
    image.truncate(image.len() - 1);

    let mut parser = NeParser::from_buffer(image);
    let exe = parser.parse();

    assert!(!exe.is_ready());
    assert!(exe.last_error().contains("Reached EOF"));
    assert!(matches!(exe.header(), Err(NeError::NotReady)));
}

#[test]
fn test_header_only_decode_does_not_report_resources() {
    let image = NeImageBuilder::new().resource_type(0x8003, 5, 0).build();

    let header_only = ParserSettings::new().read_resources(false);
    let exe = decode_executable_with(&mut Cursor::new(image), &header_only).unwrap();

    assert!(exe.is_ready());
    assert_eq!(exe.header().unwrap().resource_entry_count, 1);
    assert!(!exe.has_resources());
    assert!(matches!(exe.resources(), Err(NeError::ResourcesNotDecoded)));
}
