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

//! The complete SCION routing header block.

use bytes::{Buf, BufMut};

use super::{AddressHeader, AddressType, CommonHeader, InfoField, IsdAd, L4_UDP, RoutingPath};
use crate::wire_encoding::{InadequateBufferSize, WireEncode};

/// Errors raised when building a [`RoutingHeader`].
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum EncodeError {
    /// The headers do not fit in the 8-bit header length field.
    #[error("routing header of {0} bytes exceeds the 255 byte header length field")]
    HeaderTooLarge(usize),
    /// Headers plus payload do not fit in the 16-bit total length field.
    #[error("routing header plus payload of {0} bytes exceeds the total length field")]
    PayloadTooLarge(usize),
}

/// SCION common header, address header, and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingHeader {
    /// Metadata about the remaining headers and payload.
    pub common: CommonHeader,
    /// Source and destination domains.
    pub address: AddressHeader,
    /// The forwarding path.
    pub path: RoutingPath,
}

impl RoutingHeader {
    /// Builds the header block for a path between `source` and `destination` that is followed
    /// by `payload_length` bytes.
    pub fn new(
        source: IsdAd,
        destination: IsdAd,
        path: RoutingPath,
        payload_length: usize,
    ) -> Result<Self, EncodeError> {
        let address = AddressHeader {
            source,
            destination,
        };
        let header_length = CommonHeader::LENGTH + AddressHeader::LENGTH + path.encoded_length();
        let total_length = header_length + payload_length;

        let first_info = CommonHeader::LENGTH + AddressHeader::LENGTH;
        let first_hop = first_info + InfoField::ENCODED_SIZE;

        let common = CommonHeader {
            version: 0,
            src_addr_type: AddressType::IPV4,
            dst_addr_type: AddressType::IPV4,
            total_length: total_length
                .try_into()
                .map_err(|_| EncodeError::PayloadTooLarge(total_length))?,
            current_info_offset: first_info as u8,
            current_hop_offset: first_hop as u8,
            next_header: L4_UDP,
            header_length: header_length
                .try_into()
                .map_err(|_| EncodeError::HeaderTooLarge(header_length))?,
        };

        Ok(Self {
            common,
            address,
            path,
        })
    }

    /// Decodes a header block, returning `None` if it is truncated or inconsistent.
    pub fn decode(data: &mut impl Buf) -> Option<Self> {
        let common = CommonHeader::decode(data)?;
        let address = AddressHeader::decode(data)?;
        let path_length = usize::from(common.header_length)
            .checked_sub(CommonHeader::LENGTH + AddressHeader::LENGTH)?;
        let path = RoutingPath::decode(data, path_length)?;
        Some(Self {
            common,
            address,
            path,
        })
    }
}

impl WireEncode for RoutingHeader {
    type Error = InadequateBufferSize;

    #[inline]
    fn encoded_length(&self) -> usize {
        CommonHeader::LENGTH + self.address.encoded_length() + self.path.encoded_length()
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        self.common.encode_to_unchecked(buffer);
        self.address.encode_to_unchecked(buffer);
        self.path.encode_to_unchecked(buffer);
    }
}
