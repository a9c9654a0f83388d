use crate::err::{NeError, Result};
use crate::ne_header::NeHeader;
use crate::ne_resource_table::ResourceTable;

use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::Path;

// Inspired by https://github.com/mitsuhiko/unbox/src/formats/cab.rs
pub trait ReadSeek: Read + Seek {
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
}

impl<T: Read + Seek> ReadSeek for T {}

/// What `resource_table_offset` is measured from.
///
/// Documentation of the format disagrees on this; the default treats it as a file offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceTableBase {
    #[default]
    FileAbsolute,
    HeaderRelative,
}

/// What to do with the name-info records that follow each resource type entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameInfoPolicy {
    /// Leave them unread, the next type entry is read directly after the metadata.
    #[default]
    Ignore,
    /// Seek past `resource_count` records without decoding them.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    resource_table_base: ResourceTableBase,
    name_info: NameInfoPolicy,
    read_resources: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            resource_table_base: ResourceTableBase::default(),
            name_info: NameInfoPolicy::default(),
            read_resources: true,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    pub fn resource_table_base(mut self, base: ResourceTableBase) -> Self {
        self.resource_table_base = base;
        self
    }

    pub fn name_info(mut self, policy: NameInfoPolicy) -> Self {
        self.name_info = policy;
        self
    }

    /// When unset, only the header is decoded.
    pub fn read_resources(mut self, read_resources: bool) -> Self {
        self.read_resources = read_resources;
        self
    }

    pub fn get_resource_table_base(&self) -> ResourceTableBase {
        self.resource_table_base
    }

    pub fn get_name_info(&self) -> NameInfoPolicy {
        self.name_info
    }

    pub fn should_read_resources(&self) -> bool {
        self.read_resources
    }
}

/// A decoded NE module.
///
/// Starts out empty and not ready. Header and resource accessors refuse to hand out anything
/// until the header has been decoded successfully. The resource table is only handed out once
/// it has been decoded too.
#[derive(Debug)]
pub struct NeExecutable {
    ready: bool,
    error: String,
    header_offset: u64,
    header: Option<NeHeader>,
    resources: Option<ResourceTable>,
}

impl Default for NeExecutable {
    fn default() -> Self {
        NeExecutable::new()
    }
}

impl NeExecutable {
    pub fn new() -> Self {
        NeExecutable {
            ready: false,
            error: "Unknown".to_owned(),
            header_offset: 0,
            header: None,
            resources: None,
        }
    }

    /// Locates and decodes the NE header. On failure the executable stays not ready and
    /// `last_error` carries the cause.
    pub fn read_header<T: ReadSeek>(&mut self, stream: &mut T) -> Result<()> {
        self.ready = false;
        self.header = None;
        self.resources = None;

        let decoded = NeHeader::locate(stream)
            .and_then(|offset| NeHeader::from_stream(stream, offset).map(|h| (offset, h)));

        match decoded {
            Ok((offset, header)) => {
                info!("Decoded NE header at offset {:#x}", offset);
                self.header_offset = offset;
                self.header = Some(header);
                self.ready = true;
                self.error = "Success".to_owned();
                Ok(())
            }
            Err(e) => {
                self.error = e.to_string();
                Err(e)
            }
        }
    }

    /// Decodes the resource type list. Fails with `NotReady`, without touching the stream, if
    /// the header has not been decoded.
    pub fn read_resources<T: ReadSeek>(
        &mut self,
        stream: &mut T,
        settings: &ParserSettings,
    ) -> Result<()> {
        let header = match (&self.header, self.ready) {
            (Some(header), true) => header,
            _ => {
                let e = NeError::NotReady;
                self.error = e.to_string();
                return Err(e);
            }
        };

        match ResourceTable::from_stream(stream, header, self.header_offset, settings) {
            Ok(table) => {
                info!("Decoded {} resource types", table.len());
                if table.is_empty() && header.resource_entry_count != 0 {
                    warn!(
                        "Header declares {} resource entries, but the resource table is empty",
                        header.resource_entry_count
                    );
                }
                self.resources = Some(table);
                Ok(())
            }
            Err(e) => {
                // A broken resource table leaves the whole module undecoded.
                self.ready = false;
                self.error = e.to_string();
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// `"Success"` once decoded, otherwise the cause of the last failure.
    pub fn last_error(&self) -> &str {
        &self.error
    }

    pub fn header(&self) -> Result<&NeHeader> {
        match (&self.header, self.ready) {
            (Some(header), true) => Ok(header),
            _ => Err(NeError::NotReady),
        }
    }

    /// File offset of the NE header.
    pub fn header_offset(&self) -> Result<u64> {
        self.header().map(|_| self.header_offset)
    }

    /// Fails with `ResourcesNotDecoded` when only the header was decoded.
    pub fn resources(&self) -> Result<&ResourceTable> {
        self.header()?;
        self.resources.as_ref().ok_or(NeError::ResourcesNotDecoded)
    }

    pub fn has_resources(&self) -> bool {
        self.ready && self.resources.is_some()
    }

    /// The resource table is `None` when only the header was decoded.
    pub fn into_parts(self) -> Result<(NeHeader, Option<ResourceTable>)> {
        match (self.header, self.ready) {
            (Some(header), true) => Ok((header, self.resources)),
            _ => Err(NeError::NotReady),
        }
    }
}

/// Decodes the header and the resource type list with default settings.
pub fn decode_executable<T: ReadSeek>(stream: &mut T) -> Result<NeExecutable> {
    decode_executable_with(stream, &ParserSettings::new())
}

pub fn decode_executable_with<T: ReadSeek>(
    stream: &mut T,
    settings: &ParserSettings,
) -> Result<NeExecutable> {
    let mut exe = NeExecutable::new();
    exe.read_header(stream)?;
    if settings.should_read_resources() {
        exe.read_resources(stream, settings)?;
    }
    Ok(exe)
}

pub struct NeParser {
    data: Box<dyn ReadSeek>,
    config: ParserSettings,
}

impl std::fmt::Debug for NeParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeParser")
            .field("config", &self.config)
            .finish()
    }
}

impl NeParser {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| NeError::FailedToOpenFile {
            source,
            path: path.to_path_buf(),
        })?;
        debug!("Opened {}", path.display());

        Ok(NeParser::from_read_seek(BufReader::new(f)))
    }

    pub fn from_buffer(buffer: Vec<u8>) -> Self {
        NeParser::from_read_seek(Cursor::new(buffer))
    }

    pub fn from_read_seek<T: ReadSeek + 'static>(read_seek: T) -> Self {
        NeParser {
            data: Box::new(read_seek),
            config: ParserSettings::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.config = configuration;
        self
    }

    pub fn config(&self) -> &ParserSettings {
        &self.config
    }

    /// Runs the decode pipeline.
    ///
    /// Unlike [`decode_executable`], a failure still yields the (not ready) executable, so the
    /// caller can decide whether to carry on with it.
    pub fn parse(&mut self) -> NeExecutable {
        let mut exe = NeExecutable::new();
        if exe.read_header(&mut self.data).is_ok() && self.config.should_read_resources() {
            let _ = exe.read_resources(&mut self.data, &self.config);
        }
        exe
    }

    /// Runs the decode pipeline, stopping at the first failure.
    pub fn try_parse(&mut self) -> Result<NeExecutable> {
        decode_executable_with(&mut self.data, &self.config)
    }
}
