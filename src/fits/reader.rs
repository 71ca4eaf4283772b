use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::{padded_len, FitsError, Header, Result};

/// What kind of HDU a header describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HduKind {
    Primary,
    Image,
    BinTable,
    AsciiTable,
    Other(String),
}

/// A header plus the location of its data unit within the file.
#[derive(Debug, Clone)]
pub struct Hdu {
    /// 1-based position in the file.
    pub number: usize,
    pub header: Header,
    pub data_offset: u64,
    pub data_len: u64,
}

impl Hdu {
    pub fn kind(&self) -> HduKind {
        if self.number == 1 {
            return HduKind::Primary;
        }
        match self.header.text("XTENSION").map(str::trim) {
            Some("IMAGE") => HduKind::Image,
            Some("BINTABLE") | Some("A3DTABLE") => HduKind::BinTable,
            Some("TABLE") => HduKind::AsciiTable,
            Some(other) => HduKind::Other(other.to_string()),
            None => HduKind::Other(String::new()),
        }
    }

    /// Value of `EXTNAME`, if present.
    pub fn name(&self) -> Option<&str> {
        self.header.text("EXTNAME")
    }
}

/// Random-access reader over a FITS stream.
pub struct FitsReader<R> {
    inner: R,
}

impl FitsReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> FitsReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Locate HDU `number` (1-based), skipping over the data of earlier ones.
    ///
    /// Every header walked must describe a data unit that ends within the
    /// stream; a larger declared size is reported as [`FitsError::Truncated`].
    pub fn hdu(&mut self, number: usize) -> Result<Hdu> {
        if number == 0 {
            return Err(FitsError::MissingHdu(0));
        }
        let stream_len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(0))?;
        let mut offset: u64 = 0;
        let mut current = 1;

        loop {
            let (header, header_len) =
                Header::read_from(&mut self.inner)?.ok_or(FitsError::MissingHdu(number))?;
            if current == 1 && header.get("SIMPLE").is_none() {
                return Err(FitsError::Header("file does not start with SIMPLE".into()));
            }
            let data_offset = offset + header_len;
            let data_len = header.data_len()?;
            let data_end = data_offset.checked_add(data_len).unwrap_or(u64::MAX);
            if data_end > stream_len {
                return Err(FitsError::Truncated {
                    expected: data_end,
                    found: stream_len,
                });
            }

            if current == number {
                return Ok(Hdu {
                    number,
                    header,
                    data_offset,
                    data_len,
                });
            }
            offset = data_offset + padded_len(data_len);
            self.inner.seek(SeekFrom::Start(offset))?;
            current += 1;
        }
    }

    /// Every HDU in the file, in order.
    pub fn hdus(&mut self) -> Result<Vec<Hdu>> {
        let mut out = Vec::new();
        loop {
            match self.hdu(out.len() + 1) {
                Ok(hdu) => out.push(hdu),
                Err(FitsError::MissingHdu(_)) => return Ok(out),
                Err(e) => return Err(e),
            }
        }
    }

    /// Read the (unpadded) data unit of `hdu`.
    pub fn read_data(&mut self, hdu: &Hdu) -> Result<Vec<u8>> {
        self.inner.seek(SeekFrom::Start(hdu.data_offset))?;
        let mut data = Vec::new();
        let found = (&mut self.inner).take(hdu.data_len).read_to_end(&mut data)? as u64;
        if found < hdu.data_len {
            return Err(FitsError::Truncated {
                expected: hdu.data_len,
                found,
            });
        }
        Ok(data)
    }
}
