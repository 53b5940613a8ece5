// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Length-prefixed field framing shared by the envelope and the inner message.

use bytes::BufMut;

use super::{ControlDecodeError, ControlEncodeError};

/// Size of a field's length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest field a length prefix can describe.
pub const MAX_FIELD_LENGTH: usize = u16::MAX as usize;

/// Cursor over a sequence of length-prefixed fields.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    remaining: &'a [u8],
}

impl<'a> FieldReader<'a> {
    /// Creates a reader positioned at the first field of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { remaining: data }
    }

    /// Returns the length of the next field without consuming it.
    pub fn peek_length(&self) -> Result<usize, ControlDecodeError> {
        match self.remaining {
            [hi, lo, ..] => Ok(usize::from(u16::from_be_bytes([*hi, *lo]))),
            _ => {
                Err(ControlDecodeError::TruncatedMessage {
                    declared: LENGTH_PREFIX_SIZE,
                    remaining: self.remaining.len(),
                })
            }
        }
    }

    /// Consumes the next field and returns its contents.
    ///
    /// The cursor is only advanced if the whole field is present.
    pub fn unpack(&mut self) -> Result<&'a [u8], ControlDecodeError> {
        let length = self.peek_length()?;
        let body = &self.remaining[LENGTH_PREFIX_SIZE..];
        if length > body.len() {
            return Err(ControlDecodeError::TruncatedMessage {
                declared: length,
                remaining: body.len(),
            });
        }
        let (field, rest) = body.split_at(length);
        self.remaining = rest;
        Ok(field)
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

/// Appends `field` with its length prefix to `buffer`.
pub fn pack(buffer: &mut impl BufMut, field: &[u8]) -> Result<(), ControlEncodeError> {
    let length =
        u16::try_from(field.len()).map_err(|_| ControlEncodeError::FieldTooLong(field.len()))?;
    buffer.put_u16(length);
    buffer.put_slice(field);
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn unpack_consumes_fields_in_order() {
        let mut buffer = Vec::new();
        pack(&mut buffer, b"first").unwrap();
        pack(&mut buffer, b"").unwrap();
        pack(&mut buffer, b"third field").unwrap();

        let mut reader = FieldReader::new(&buffer);
        assert_eq!(reader.peek_length(), Ok(5));
        assert_eq!(reader.peek_length(), Ok(5));
        assert_eq!(reader.unpack(), Ok(&b"first"[..]));
        assert_eq!(reader.unpack(), Ok(&b""[..]));
        assert_eq!(reader.unpack(), Ok(&b"third field"[..]));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn declared_length_beyond_buffer() {
        let buffer = [0x00, 0x09, b'a', b'b', b'c'];
        let mut reader = FieldReader::new(&buffer);
        assert_eq!(
            reader.unpack(),
            Err(ControlDecodeError::TruncatedMessage {
                declared: 9,
                remaining: 3
            })
        );
        // A failed unpack leaves the cursor in place.
        assert_eq!(reader.remaining(), buffer.len());
    }

    #[test]
    fn missing_length_prefix() {
        let reader = FieldReader::new(&[0x01]);
        assert_eq!(
            reader.peek_length(),
            Err(ControlDecodeError::TruncatedMessage {
                declared: LENGTH_PREFIX_SIZE,
                remaining: 1
            })
        );
        assert!(FieldReader::new(&[]).peek_length().is_err());
    }

    #[test]
    fn oversized_field_is_rejected() {
        let field = vec![0u8; MAX_FIELD_LENGTH + 1];
        let mut buffer = Vec::new();
        assert_eq!(
            pack(&mut buffer, &field),
            Err(ControlEncodeError::FieldTooLong(MAX_FIELD_LENGTH + 1))
        );
        assert!(buffer.is_empty());
    }
}
