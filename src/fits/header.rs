use std::fmt;
use std::io::Read;

use super::{BLOCK_LEN, CARD_LEN, FitsError, Result};

// ---------------------------------------------------------------------------
// Value – the typed right-hand side of a keyword card
// ---------------------------------------------------------------------------

/// A keyword value as it appears in a header card.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Real(f64),
    /// Quoted character string, trailing blanks removed.
    Text(String),
    /// Anything else (complex numbers, malformed tokens) kept verbatim.
    Other(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{}", format_real(*r)),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Rust's shortest round-trip form, with the exponent letter FITS expects.
fn format_real(v: f64) -> String {
    format!("{v:?}").to_uppercase()
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// One 80-column header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<Value>,
    pub comment: Option<String>,
}

impl Card {
    fn encode(&self) -> [u8; CARD_LEN] {
        let mut line = format!("{:<8}", self.keyword);
        match &self.value {
            Some(value) => {
                line.push_str("= ");
                let field = match value {
                    Value::Text(s) => format!("'{:<8}'", s.replace('\'', "''")),
                    other => format!("{:>20}", other.to_string()),
                };
                line.push_str(&field);
                if let Some(comment) = &self.comment {
                    line.push_str(" / ");
                    line.push_str(comment);
                }
            }
            None => {
                if let Some(comment) = &self.comment {
                    line.push_str("  ");
                    line.push_str(comment);
                }
            }
        }

        let mut out = [b' '; CARD_LEN];
        for (slot, byte) in out.iter_mut().zip(line.bytes()) {
            *slot = byte;
        }
        out
    }

    fn decode(raw: &[u8]) -> Result<Self> {
        if !raw.is_ascii() {
            return Err(FitsError::Header("card contains non-ASCII bytes".into()));
        }
        // ASCII was checked above, so this cannot fail.
        let text = std::str::from_utf8(raw).map_err(|e| FitsError::Header(e.to_string()))?;
        let keyword = text[..8].trim_end().to_string();

        if &text[8..10] != "= " {
            let comment = text[8..].trim();
            return Ok(Card {
                keyword,
                value: None,
                comment: (!comment.is_empty()).then(|| comment.to_string()),
            });
        }

        let (value, comment) = parse_value_field(&text[10..])
            .map_err(|msg| FitsError::Header(format!("keyword {keyword}: {msg}")))?;
        Ok(Card {
            keyword,
            value,
            comment,
        })
    }
}

/// Parse columns 11–80 of a value card into (value, comment).
fn parse_value_field(field: &str) -> std::result::Result<(Option<Value>, Option<String>), String> {
    let field = field.trim_start();

    if let Some(rest) = field.strip_prefix('\'') {
        let mut text = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    text.push('\'');
                    chars.next();
                } else {
                    end = Some(i + 1);
                    break;
                }
            } else {
                text.push(c);
            }
        }
        let end = end.ok_or_else(|| "unterminated string value".to_string())?;
        let comment = split_comment(&rest[end..]);
        return Ok((Some(Value::Text(text.trim_end().to_string())), comment));
    }

    let (token, comment) = match field.find('/') {
        Some(i) => (&field[..i], split_comment(&field[i..])),
        None => (field, None),
    };
    let token = token.trim();
    let value = if token.is_empty() {
        None
    } else if token == "T" {
        Some(Value::Logical(true))
    } else if token == "F" {
        Some(Value::Logical(false))
    } else if let Ok(i) = token.parse::<i64>() {
        Some(Value::Integer(i))
    } else if let Ok(r) = token.replace('D', "E").parse::<f64>() {
        Some(Value::Real(r))
    } else {
        Some(Value::Other(token.to_string()))
    };
    Ok((value, comment))
}

fn split_comment(rest: &str) -> Option<String> {
    rest.trim_start()
        .strip_prefix('/')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// An ordered list of cards. `END` is implicit and never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a keyword card.
    pub fn push(&mut self, keyword: impl Into<String>, value: Value) -> &mut Self {
        self.cards.push(Card {
            keyword: keyword.into(),
            value: Some(value),
            comment: None,
        });
        self
    }

    /// Append a keyword card with a trailing comment.
    pub fn push_commented(
        &mut self,
        keyword: impl Into<String>,
        value: Value,
        comment: impl Into<String>,
    ) -> &mut Self {
        self.cards.push(Card {
            keyword: keyword.into(),
            value: Some(value),
            comment: Some(comment.into()),
        });
        self
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Value of the first card named `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .and_then(|c| c.value.as_ref())
    }

    pub fn integer(&self, keyword: &str) -> Option<i64> {
        match self.get(keyword) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Real value; integer cards are accepted too.
    pub fn real(&self, keyword: &str) -> Option<f64> {
        match self.get(keyword) {
            Some(Value::Real(r)) => Some(*r),
            Some(Value::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn text(&self, keyword: &str) -> Option<&str> {
        match self.get(keyword) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn require_integer(&self, keyword: &str) -> Result<i64> {
        self.integer(keyword)
            .ok_or_else(|| FitsError::MissingKeyword(keyword.to_string()))
    }

    /// A non-negative integer keyword, as a size.
    pub fn require_size(&self, keyword: &str) -> Result<u64> {
        let v = self.require_integer(keyword)?;
        u64::try_from(v).map_err(|_| FitsError::Header(format!("{keyword} is negative ({v})")))
    }

    /// Size in bytes of the data unit described by this header (unpadded).
    pub fn data_len(&self) -> Result<u64> {
        let bitpix = self.require_integer("BITPIX")?;
        let naxis = self.require_size("NAXIS")?;
        if naxis == 0 {
            return Ok(0);
        }

        let mut elements: u64 = 1;
        for axis in 1..=naxis {
            let n = self.require_size(&format!("NAXIS{axis}"))?;
            elements = elements
                .checked_mul(n)
                .ok_or_else(|| FitsError::Header("data size overflows".into()))?;
        }
        let pcount = self.integer("PCOUNT").unwrap_or(0).max(0) as u64;
        let gcount = self.integer("GCOUNT").unwrap_or(1).max(0) as u64;

        (bitpix.unsigned_abs() / 8)
            .checked_mul(gcount)
            .and_then(|n| n.checked_mul(pcount.checked_add(elements)?))
            .ok_or_else(|| FitsError::Header("data size overflows".into()))
    }

    /// Serialise to whole blocks, including the `END` card.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.cards.len() + 1) * CARD_LEN);
        for card in &self.cards {
            out.extend_from_slice(&card.encode());
        }
        let mut end = [b' '; CARD_LEN];
        end[..3].copy_from_slice(b"END");
        out.extend_from_slice(&end);
        out.resize(out.len().div_ceil(BLOCK_LEN) * BLOCK_LEN, b' ');
        out
    }

    /// Read one header from `reader`, consuming whole blocks up to and
    /// including the one holding `END`.
    ///
    /// Returns `Ok(None)` on a clean end of file before any byte was read.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<(Header, u64)>> {
        let mut header = Header::new();
        let mut block = vec![0u8; BLOCK_LEN];
        let mut consumed: u64 = 0;

        loop {
            let n = read_block(reader, &mut block)?;
            if n == 0 && consumed == 0 {
                return Ok(None);
            }
            if n < BLOCK_LEN {
                return Err(FitsError::Header("file ends inside a header".into()));
            }
            consumed += BLOCK_LEN as u64;

            for raw in block.chunks_exact(CARD_LEN) {
                if raw.starts_with(b"END") && raw[3..].iter().all(|b| *b == b' ') {
                    return Ok(Some((header, consumed)));
                }
                if raw.iter().all(|b| *b == b' ') {
                    continue;
                }
                header.cards.push(Card::decode(raw)?);
            }
        }
    }
}

/// Fill `buf` as far as the stream allows; returns bytes read.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_header_is_block_aligned_and_ends_with_end() {
        let mut h = Header::new();
        h.push("SIMPLE", Value::Logical(true))
            .push("BITPIX", Value::Integer(8))
            .push("NAXIS", Value::Integer(0));
        let bytes = h.encode();
        assert_eq!(bytes.len(), BLOCK_LEN);
        assert_eq!(&bytes[..30], b"SIMPLE  =                    T");
        assert_eq!(&bytes[240..243], b"END");
    }

    #[test]
    fn cards_survive_encode_and_read() {
        let mut h = Header::new();
        h.push("XTENSION", Value::Text("BINTABLE".into()))
            .push("NAXIS1", Value::Integer(24))
            .push_commented("TZERO1", Value::Real(32768.0), "offset")
            .push("OBJECT", Value::Text("O'Brien".into()));

        let bytes = h.encode();
        let (back, consumed) = Header::read_from(&mut bytes.as_slice()).unwrap().unwrap();
        assert_eq!(consumed, BLOCK_LEN as u64);
        assert_eq!(back.text("XTENSION"), Some("BINTABLE"));
        assert_eq!(back.integer("NAXIS1"), Some(24));
        assert_eq!(back.real("TZERO1"), Some(32768.0));
        assert_eq!(back.text("OBJECT"), Some("O'Brien"));
        assert_eq!(back.cards()[2].comment.as_deref(), Some("offset"));
    }

    #[test]
    fn fortran_exponents_and_padding_in_strings() {
        let (v, c) = parse_value_field("             1.5D2 / scaled").unwrap();
        assert_eq!(v, Some(Value::Real(150.0)));
        assert_eq!(c.as_deref(), Some("scaled"));

        let (v, _) = parse_value_field("'IMAGE   '").unwrap();
        assert_eq!(v, Some(Value::Text("IMAGE".into())));

        assert!(parse_value_field("'never closed").is_err());
    }

    #[test]
    fn empty_stream_has_no_header_but_short_block_is_an_error() {
        assert!(Header::read_from(&mut [].as_slice()).unwrap().is_none());
        let short = vec![b' '; 100];
        assert!(matches!(
            Header::read_from(&mut short.as_slice()),
            Err(FitsError::Header(_))
        ));
    }

    #[test]
    fn data_len_multiplies_axes() {
        let mut h = Header::new();
        h.push("BITPIX", Value::Integer(-64))
            .push("NAXIS", Value::Integer(2))
            .push("NAXIS1", Value::Integer(5))
            .push("NAXIS2", Value::Integer(3));
        assert_eq!(h.data_len().unwrap(), 8 * 15);

        let mut empty = Header::new();
        empty.push("BITPIX", Value::Integer(8)).push("NAXIS", Value::Integer(0));
        assert_eq!(empty.data_len().unwrap(), 0);
    }
}
