use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Range;

use super::{padded_len, FitsError, Header, Result};

/// Appends HDUs to a FITS stream.
///
/// HDUs are written strictly in order. Only the data unit of the most
/// recently appended HDU may be patched with [`FitsWriter::write_at`];
/// once another HDU follows, earlier ones are sealed.
pub struct FitsWriter<W> {
    inner: W,
    end: u64,
    hdus: usize,
    open_data: Range<u64>,
}

impl<W: Write + Seek> FitsWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            end: 0,
            hdus: 0,
            open_data: 0..0,
        }
    }

    /// Number of HDUs written so far.
    pub fn hdu_count(&self) -> usize {
        self.hdus
    }

    /// Append a header followed by `data`, zero-padded to a block boundary.
    pub fn append_hdu(&mut self, header: &Header, data: &[u8]) -> Result<u64> {
        let data_offset = self.begin_hdu(header, data.len() as u64)?;
        self.inner.write_all(data)?;
        self.close_hdu(data_offset, data.len() as u64, data.len() as u64)?;
        Ok(data_offset)
    }

    /// Append a header and reserve `data_len` zeroed bytes for its data
    /// unit, to be filled later with [`FitsWriter::write_at`].
    pub fn allocate_hdu(&mut self, header: &Header, data_len: u64) -> Result<u64> {
        let data_offset = self.begin_hdu(header, data_len)?;
        self.close_hdu(data_offset, data_len, 0)?;
        Ok(data_offset)
    }

    /// Overwrite bytes inside the open data unit.
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let len = bytes.len() as u64;
        let inside = offset >= self.open_data.start
            && offset
                .checked_add(len)
                .is_some_and(|stop| stop <= self.open_data.end);
        if !inside {
            return Err(FitsError::OutOfBounds { offset, len });
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Flush and hand back the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn begin_hdu(&mut self, header: &Header, data_len: u64) -> Result<u64> {
        let expected = if self.hdus == 0 { "SIMPLE" } else { "XTENSION" };
        match header.cards().first() {
            Some(card) if card.keyword == expected => {}
            _ => {
                return Err(FitsError::Header(format!(
                    "HDU {} must start with {expected}",
                    self.hdus + 1
                )))
            }
        }
        let declared = header.data_len()?;
        if declared != data_len {
            return Err(FitsError::Header(format!(
                "header declares {declared} data bytes but {data_len} were supplied"
            )));
        }

        let encoded = header.encode();
        self.inner.seek(SeekFrom::Start(self.end))?;
        self.inner.write_all(&encoded)?;
        Ok(self.end + encoded.len() as u64)
    }

    /// Zero-fill from `written` to the padded end and make this HDU the
    /// open one.
    fn close_hdu(&mut self, data_offset: u64, data_len: u64, written: u64) -> Result<()> {
        let padded = padded_len(data_len);
        io::copy(&mut io::repeat(0).take(padded - written), &mut self.inner)?;
        self.open_data = data_offset..data_offset + data_len;
        self.end = data_offset + padded;
        self.hdus += 1;
        Ok(())
    }
}
