//! Record reader for the BIFF8 stream of Excel 97-2003 workbooks.
//! A logical record may be split across trailing `CONTINUE` records; reads walk the
//! chunks transparently.

use crate::error::SheetSummaryError;
use crate::helpers::bytes::to_f64;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u32;
use crate::helpers::bytes::to_u64;
use crate::helpers::bytes::to_usize;
use encoding_rs::Encoding;
use thiserror::Error;

const CONTINUE: u16 = 0x003C;

#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining in record")]
    NoEnoughDataError(usize),
}

pub(crate) struct Biff8Reader {
    /// Encoding of compressed strings; replaced once the CODEPAGE record is seen
    pub(crate) encoding: &'static Encoding,
    buffer: Vec<u8>,
    pointer: usize,
    chunks: Vec<(usize, usize)>,
    chunk: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(data: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: encoding_rs::WINDOWS_1252,
            buffer: data,
            pointer: 0,
            chunks: Vec::new(),
            chunk: 0,
            offset: 0,
        }
    }

    /// Moves to the next record and returns its type, or `None` past the last one.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, SheetSummaryError> {
        if self.pointer + 4 > self.buffer.len() {
            return Ok(None);
        }
        self.chunk = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.get_u16_at(self.pointer)?;
        self.push_chunk()?;
        while self.pointer + 4 <= self.buffer.len() && self.get_u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    fn push_chunk(&mut self) -> Result<(), SheetSummaryError> {
        let size = self.get_u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + 4;
        let upper = self.buffer.len().min(lower + size);
        self.pointer = lower + size;
        self.chunks.push((lower, upper));
        Ok(())
    }

    /// Jumps to an absolute stream position, typically a BOUNDSHEET offset.
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
        self.chunks.clear();
    }

    /// Bytes left unread in the current record, continuations included.
    pub(crate) fn remaining(&self) -> usize {
        self.chunks
            .iter()
            .enumerate()
            .skip(self.chunk)
            .map(|(index, (lower, upper))| {
                let lower = if index == self.chunk { (*upper).min(lower + self.offset) } else { *lower };
                upper - lower
            })
            .sum()
    }

    /// Reads up to `length` bytes without crossing into the next chunk.
    fn read(&mut self, length: usize) -> &[u8] {
        let Some(&(lower, upper)) = self.chunks.get(self.chunk) else {
            return &[];
        };
        let source = upper.min(lower + self.offset);
        let target = upper.min(source + length);
        if target == upper {
            self.chunk += 1;
            self.offset = 0;
        } else {
            self.offset += target - source;
        }
        &self.buffer[source..target]
    }

    fn read_exact(&mut self, length: usize) -> Result<&[u8], SheetSummaryError> {
        let data = self.read(length);
        if data.len() == length {
            Ok(data)
        } else {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
    }

    /// Skips `length` bytes, crossing into continuation chunks as needed.
    pub(crate) fn skip(&mut self, length: usize) -> Result<(), SheetSummaryError> {
        let mut remaining = length;
        while remaining > 0 {
            let read = self.read(remaining).len();
            if read == 0 {
                Err(Biff8Error::NoEnoughDataError(length))?
            }
            remaining -= read;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, SheetSummaryError> {
        self.read_exact(1).map(|data| data[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, SheetSummaryError> {
        self.read_exact(2).map(to_u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, SheetSummaryError> {
        self.read_exact(4).map(to_u32)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, SheetSummaryError> {
        self.read_exact(4).map(to_usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, SheetSummaryError> {
        self.read_exact(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, SheetSummaryError> {
        self.read_exact(8).map(to_f64)
    }

    fn get_u16_at(&self, index: usize) -> Result<u16, SheetSummaryError> {
        match self.buffer.get(index..index + 2) {
            Some(bytes) => Ok(to_u16(bytes)),
            None => Err(Biff8Error::NoEnoughDataError(2))?,
        }
    }

    /// Decodes an RK value: a 30-bit integer or the high 30 bits of a double,
    /// optionally divided by 100.
    pub(crate) fn read_rk_number(&mut self) -> Result<f64, SheetSummaryError> {
        let raw = self.read_u32()?;
        let value = if raw & 0x02 != 0 {
            ((raw as i32) >> 2) as f64
        } else {
            f64::from_bits(((raw & 0xFFFF_FFFC) as u64) << 32)
        };
        Ok(if raw & 0x01 != 0 { value / 100.0 } else { value })
    }

    /// ShortXLUnicodeString: 1-byte character count.
    pub(crate) fn read_short_xl_unicode_string(&mut self) -> Result<String, SheetSummaryError> {
        let chars = self.read_u8()? as usize;
        let wide = self.read_u8()? & 0x01 != 0;
        let mut string = String::with_capacity(chars);
        self.read_characters(chars, wide, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeString: 2-byte character count.
    pub(crate) fn read_xl_unicode_string(&mut self) -> Result<String, SheetSummaryError> {
        let chars = self.read_u16()? as usize;
        let wide = self.read_u8()? & 0x01 != 0;
        let mut string = String::with_capacity(chars);
        self.read_characters(chars, wide, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeRichExtendedString, as stored in the shared string table.
    pub(crate) fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, SheetSummaryError> {
        let chars = self.read_u16()? as usize;
        let options = self.read_u8()?;
        let runs = if options & 0x08 != 0 { self.read_u16()? as usize } else { 0 };
        let phonetic = if options & 0x04 != 0 { self.read_usize()? } else { 0 };
        let mut string = String::with_capacity(chars);
        self.read_characters(chars, options & 0x01 != 0, &mut string)?;
        // Formatting runs and the phonetic block follow the characters
        self.skip(4 * runs)?;
        self.skip(phonetic)?;
        Ok(string)
    }

    /// Decodes `chars` characters. Characters continuing into the next chunk restart
    /// with a fresh option byte that says whether they are compressed.
    fn read_characters(&mut self, chars: usize, wide: bool, content: &mut String) -> Result<(), SheetSummaryError> {
        let mut remaining = chars;
        let mut wide = wide;
        loop {
            let encoding = if wide { encoding_rs::UTF_16LE } else { self.encoding };
            let bytes = self.read(if wide { remaining * 2 } else { remaining });
            let read = if wide { bytes.len() / 2 } else { bytes.len() };
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            content.push_str(&text);

            remaining -= read;
            if remaining == 0 {
                return Ok(());
            }
            if self.remaining() == 0 {
                Err(Biff8Error::NoEnoughDataError(remaining))?
            }
            wide = self.read_u8()? & 0x01 != 0;
        }
    }
}

/// Iterates the records of a [`Biff8Reader`], dispatching on record type.
/// Unmatched types are skipped; `break` stops early.
#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(kind: u16, body: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(body.len() + 4);
        bytes.extend_from_slice(&kind.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u16).to_le_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn iterates_records_and_joins_continuations() -> Result<(), SheetSummaryError> {
        let mut stream = record(0x0809, &[1, 2]);
        stream.extend(record(0x00FC, &[0xAA, 0xBB]));
        stream.extend(record(CONTINUE, &[0xCC, 0xDD]));
        stream.extend(record(0x000A, &[]));

        let mut reader = Biff8Reader::new(stream);
        let mut kinds = Vec::new();
        match_biff8_record!(reader => {
            0x00FC => {
                kinds.push(0x00FC);
                assert_eq!(reader.remaining(), 4);
                assert_eq!(reader.read_u8()?, 0xAA);
                assert_eq!(reader.remaining(), 3);
                assert_eq!(reader.read_u8()?, 0xBB);
                assert_eq!(reader.read_u16()?, 0xDDCC);
                assert_eq!(reader.remaining(), 0);
            }
            kind => kinds.push(kind),
        });
        assert_eq!(kinds, vec![0x0809, 0x00FC, 0x000A]);
        Ok(())
    }

    #[test]
    fn decodes_rk_numbers() -> Result<(), SheetSummaryError> {
        let integer = (42u32 << 2) | 0x02;
        let percent = (12345u32 << 2) | 0x03;
        let double = ((1.5f64.to_bits() >> 32) as u32) & 0xFFFF_FFFC;
        let mut body = Vec::new();
        for raw in [integer, percent, double] {
            body.extend_from_slice(&raw.to_le_bytes());
        }

        let mut reader = Biff8Reader::new(record(0x027E, &body));
        reader.next()?;
        assert_eq!(reader.read_rk_number()?, 42.0);
        assert_eq!(reader.read_rk_number()?, 123.45);
        assert_eq!(reader.read_rk_number()?, 1.5);
        Ok(())
    }

    #[test]
    fn reads_compressed_and_wide_strings() -> Result<(), SheetSummaryError> {
        let mut body = vec![3, 0, 0];
        body.extend_from_slice(b"Qty");
        body.extend_from_slice(&[2, 0, 1]);
        body.extend("€1".encode_utf16().flat_map(|unit| unit.to_le_bytes()));

        let mut reader = Biff8Reader::new(record(0x00FD, &body));
        reader.next()?;
        assert_eq!(reader.read_xl_unicode_string()?, "Qty");
        assert_eq!(reader.read_xl_unicode_string()?, "€1");
        assert!(reader.read_u8().is_err());
        Ok(())
    }

    #[test]
    fn rich_string_continues_across_chunks() -> Result<(), SheetSummaryError> {
        let mut stream = record(0x00FC, &[4, 0, 0x08, 1, 0, b'A', b'B']);
        stream.extend(record(CONTINUE, &[0x01, b'C', 0, b'D', 0, 9, 9, 9, 9]));

        let mut reader = Biff8Reader::new(stream);
        reader.next()?;
        assert_eq!(reader.read_xl_unicode_rich_extended_string()?, "ABCD");
        assert_eq!(reader.remaining(), 0);
        Ok(())
    }
}
