use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NeError>;

/// The step of the decode pipeline at which an I/O operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStage {
    SeekStub,
    SeekNePointer,
    ReadNePointer,
    SeekHeader,
    ReadHeader,
    SeekResourceTable,
    ReadResourceTable,
    SkipNameInfo,
}

impl IoStage {
    pub fn is_seek(self) -> bool {
        matches!(
            self,
            IoStage::SeekStub
                | IoStage::SeekNePointer
                | IoStage::SeekHeader
                | IoStage::SeekResourceTable
                | IoStage::SkipNameInfo
        )
    }
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoStage::SeekStub => "seek to MZ stub",
            IoStage::SeekNePointer => "seek to NE pointer offset",
            IoStage::ReadNePointer => "read NE pointer offset",
            IoStage::SeekHeader => "seek to NE header",
            IoStage::ReadHeader => "read NE header",
            IoStage::SeekResourceTable => "seek to resource table",
            IoStage::ReadResourceTable => "read resource table",
            IoStage::SkipNameInfo => "skip resource name info",
        };
        f.write_str(s)
    }
}

fn offset_prefix(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!("Offset {offset}: "),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum NeError {
    #[error("Stream cannot be read: {source}")]
    UnreadableStream { source: io::Error },

    #[error("Not an EXE file, expected `MZ` header, found `{magic:02X?}`")]
    NotAnExecutable { magic: [u8; 2] },

    #[error("{}Failed to {stage}: {source}", offset_prefix(.offset))]
    Io {
        stage: IoStage,
        /// `None` when the stream could not report its position.
        offset: Option<u64>,
        source: io::Error,
    },

    #[error("Offset {offset}: Not an NE file, expected `NE` header, found `{magic:02X?}`")]
    NotNewExecutable { magic: [u8; 2], offset: u64 },

    #[error("NE header has not been decoded")]
    NotReady,

    #[error("Resource table was not decoded")]
    ResourcesNotDecoded,

    #[error("{}Reached EOF while reading {what}", offset_prefix(.offset))]
    UnexpectedEof {
        what: &'static str,
        offset: Option<u64>,
    },

    #[error("Failed to open file {}: {}", path.display(), source)]
    FailedToOpenFile { source: io::Error, path: PathBuf },

    #[error("Failed to write output: {source}")]
    FailedToWriteOutput { source: io::Error },
}

impl NeError {
    pub(crate) fn io(stage: IoStage, offset: Option<u64>, source: io::Error) -> Self {
        NeError::Io {
            stage,
            offset,
            source,
        }
    }

    /// A short read inside the resource table means the type list was cut off, which is a format
    /// error rather than a plain I/O failure. Everywhere else it is attributed to `stage`.
    pub(crate) fn from_read(
        stage: IoStage,
        what: &'static str,
        offset: Option<u64>,
        source: io::Error,
    ) -> Self {
        match (stage, source.kind()) {
            (IoStage::ReadResourceTable, io::ErrorKind::UnexpectedEof) => {
                NeError::UnexpectedEof { what, offset }
            }
            _ => NeError::io(stage, offset, source),
        }
    }

    pub fn stage(&self) -> Option<IoStage> {
        match self {
            NeError::Io { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_known_offsets_only() {
        let known = NeError::UnexpectedEof {
            what: "resource count",
            offset: Some(0x92),
        };
        assert_eq!(
            known.to_string(),
            "Offset 146: Reached EOF while reading resource count"
        );

        let unknown = NeError::io(
            IoStage::SeekResourceTable,
            None,
            io::Error::other("boom"),
        );
        assert_eq!(unknown.to_string(), "Failed to seek to resource table: boom");
        assert!(unknown.stage().is_some_and(IoStage::is_seek));
    }
}
