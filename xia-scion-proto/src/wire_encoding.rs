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

//! Encoding of wire types into byte buffers.

use bytes::{BufMut, Bytes, BytesMut};

/// Raised if the buffer does not have sufficient capacity for encoding a value.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy, Default)]
#[error("the provided buffer did not have sufficient size")]
pub struct InadequateBufferSize;

/// A type that can be written to the wire.
pub trait WireEncode {
    /// Error returned when encoding fails.
    type Error: From<InadequateBufferSize>;

    /// The number of bytes [`Self::encode_to_unchecked`] writes.
    fn encoded_length(&self) -> usize;

    /// Encodes `self` into `buffer` without checking the remaining capacity.
    ///
    /// # Panics
    ///
    /// May panic if `buffer` cannot hold [`Self::encoded_length`] more bytes.
    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T);

    /// Encodes `self` into `buffer`, failing if the buffer is too small.
    fn encode_to<T: BufMut>(&self, buffer: &mut T) -> Result<(), Self::Error> {
        if buffer.remaining_mut() < self.encoded_length() {
            return Err(InadequateBufferSize.into());
        }
        self.encode_to_unchecked(buffer);
        Ok(())
    }

    /// Encodes `self` into a freshly allocated [`Bytes`].
    fn encode_to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.encoded_length());
        self.encode_to_unchecked(&mut buffer);
        buffer.freeze()
    }
}
