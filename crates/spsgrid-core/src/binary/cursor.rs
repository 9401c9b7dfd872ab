use crate::domain::{ByteOrder, DecodeError};

/// Width of the length marker that brackets every unformatted record.
pub const RECORD_MARKER_BYTES: usize = 4;

const WORD_BYTES: usize = 4;

/// Sequential, bounds-checked reader over one template file.
///
/// All offset arithmetic for the unformatted record stream lives here: callers
/// ask for typed fields and explicitly consume the record markers between
/// them.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    byte_order: ByteOrder,
}

impl<'a> BinaryCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_byte_order(bytes, ByteOrder::Little)
    }

    pub fn with_byte_order(bytes: &'a [u8], byte_order: ByteOrder) -> Self {
        Self {
            bytes,
            offset: 0,
            byte_order,
        }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_int32(&mut self) -> Result<i32, DecodeError> {
        let word = self.take_word()?;
        Ok(match self.byte_order {
            ByteOrder::Little => i32::from_le_bytes(word),
            ByteOrder::Big => i32::from_be_bytes(word),
        })
    }

    pub fn read_float32(&mut self) -> Result<f32, DecodeError> {
        let word = self.take_word()?;
        Ok(match self.byte_order {
            ByteOrder::Little => f32::from_le_bytes(word),
            ByteOrder::Big => f32::from_be_bytes(word),
        })
    }

    /// Reads `count` consecutive floats. The whole span is bounds-checked
    /// before anything is consumed.
    pub fn read_float32_array(&mut self, count: usize) -> Result<Vec<f32>, DecodeError> {
        let byte_order = self.byte_order;
        let span = self.take(count.saturating_mul(WORD_BYTES))?;
        let values = span
            .chunks_exact(WORD_BYTES)
            .map(|chunk| {
                let word = [chunk[0], chunk[1], chunk[2], chunk[3]];
                match byte_order {
                    ByteOrder::Little => f32::from_le_bytes(word),
                    ByteOrder::Big => f32::from_be_bytes(word),
                }
            })
            .collect();
        Ok(values)
    }

    /// Reads an int32 element count, rejecting negative values.
    pub fn read_count(&mut self, field: &'static str) -> Result<usize, DecodeError> {
        let offset = self.offset;
        let value = self.read_int32()?;
        usize::try_from(value).map_err(|_| DecodeError::NegativeCount {
            field,
            value,
            offset,
        })
    }

    pub fn skip(&mut self, n_bytes: usize) -> Result<(), DecodeError> {
        self.take(n_bytes).map(|_| ())
    }

    /// Consumes a single 4-byte record length marker.
    pub fn skip_marker(&mut self) -> Result<(), DecodeError> {
        self.skip(RECORD_MARKER_BYTES)
    }

    /// Consumes a record boundary: the trailing marker of the current record
    /// followed by the leading marker of the next one.
    pub fn skip_record_markers(&mut self) -> Result<(), DecodeError> {
        self.skip(2 * RECORD_MARKER_BYTES)
    }

    fn take_word(&mut self) -> Result<[u8; WORD_BYTES], DecodeError> {
        let span = self.take(WORD_BYTES)?;
        Ok([span[0], span[1], span[2], span[3]])
    }

    fn take(&mut self, n_bytes: usize) -> Result<&'a [u8], DecodeError> {
        let bytes: &'a [u8] = self.bytes;
        let truncated = || DecodeError::TruncatedRecord {
            offset: self.offset,
            requested: n_bytes,
            available: self.remaining(),
        };
        let end = self.offset.checked_add(n_bytes).ok_or_else(truncated)?;
        let span = bytes.get(self.offset..end).ok_or_else(truncated)?;
        self.offset = end;
        Ok(span)
    }
}
