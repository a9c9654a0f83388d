use std::io::SeekFrom;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::err::{IoStage, NeError, Result};
use crate::ne_parser::ReadSeek;

/// Reads little-endian primitives off a seekable stream, attributing failures to a pipeline stage.
pub(crate) trait ReadExt: ReadSeek + Sized {
    #[inline]
    fn try_seek_abs_named(&mut self, offset: u64, stage: IoStage) -> Result<u64> {
        self.seek(SeekFrom::Start(offset))
            .map_err(|e| NeError::io(stage, Some(offset), e))
    }

    #[inline]
    fn try_seek_rel_named(&mut self, delta: i64, stage: IoStage) -> Result<u64> {
        let offset = self.tell().ok();
        self.seek(SeekFrom::Current(delta))
            .map_err(|e| NeError::io(stage, offset, e))
    }

    #[inline]
    fn try_u16_named(&mut self, stage: IoStage, what: &'static str) -> Result<u16> {
        let offset = self.tell().ok();
        self.read_u16::<LittleEndian>()
            .map_err(|e| NeError::from_read(stage, what, offset, e))
    }

    #[inline]
    fn try_u32_named(&mut self, stage: IoStage, what: &'static str) -> Result<u32> {
        let offset = self.tell().ok();
        self.read_u32::<LittleEndian>()
            .map_err(|e| NeError::from_read(stage, what, offset, e))
    }

    /// Reads exactly `N` bytes in a single `read_exact` call.
    #[inline]
    fn try_array_named<const N: usize>(
        &mut self,
        stage: IoStage,
        what: &'static str,
    ) -> Result<[u8; N]> {
        let offset = self.tell().ok();
        let mut buf = [0_u8; N];
        self.read_exact(&mut buf)
            .map_err(|e| NeError::from_read(stage, what, offset, e))?;
        Ok(buf)
    }
}

impl<T: ReadSeek> ReadExt for T {}
