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

//! The SCION common header.

use bytes::{Buf, BufMut};

use crate::wire_encoding::{InadequateBufferSize, WireEncode};

/// Type of a SCION host address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressType(pub u8);

impl AddressType {
    /// No host address.
    pub const NONE: Self = Self(0);
    /// IPv4 host address.
    pub const IPV4: Self = Self(1);
    /// IPv6 host address.
    pub const IPV6: Self = Self(2);
    /// Service address.
    pub const SVC: Self = Self(3);
}

/// The SCION common header.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Version|  SrcType  |  DstType  |            TotalLen           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  CurrInfoOff  |  CurrHopOff   |    NextHdr    |    HdrLen     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    /// Header version, 4 bits.
    pub version: u8,
    /// Source host address type, 6 bits.
    pub src_addr_type: AddressType,
    /// Destination host address type, 6 bits.
    pub dst_addr_type: AddressType,
    /// Length of the headers plus the payload that follows them.
    pub total_length: u16,
    /// Offset of the current info field from the start of this header.
    pub current_info_offset: u8,
    /// Offset of the current hop field from the start of this header.
    pub current_hop_offset: u8,
    /// Protocol of the payload.
    pub next_header: u8,
    /// Length of common header, address header, and path.
    pub header_length: u8,
}

impl CommonHeader {
    /// The encoded size of the common header.
    pub const LENGTH: usize = 8;

    const VERSION_SHIFT: u16 = 12;
    const SRC_TYPE_SHIFT: u16 = 6;
    const TYPE_MASK: u16 = 0x3f;
    const VERSION_MASK: u16 = 0x0f;

    fn version_src_dst(&self) -> u16 {
        (u16::from(self.version) & Self::VERSION_MASK) << Self::VERSION_SHIFT
            | (u16::from(self.src_addr_type.0) & Self::TYPE_MASK) << Self::SRC_TYPE_SHIFT
            | u16::from(self.dst_addr_type.0) & Self::TYPE_MASK
    }

    /// Decodes a common header, returning `None` if `data` is too short.
    pub fn decode(data: &mut impl Buf) -> Option<Self> {
        if data.remaining() < Self::LENGTH {
            return None;
        }
        let vsd = data.get_u16();
        Some(Self {
            version: (vsd >> Self::VERSION_SHIFT) as u8,
            src_addr_type: AddressType(((vsd >> Self::SRC_TYPE_SHIFT) & Self::TYPE_MASK) as u8),
            dst_addr_type: AddressType((vsd & Self::TYPE_MASK) as u8),
            total_length: data.get_u16(),
            current_info_offset: data.get_u8(),
            current_hop_offset: data.get_u8(),
            next_header: data.get_u8(),
            header_length: data.get_u8(),
        })
    }
}

impl WireEncode for CommonHeader {
    type Error = InadequateBufferSize;

    #[inline]
    fn encoded_length(&self) -> usize {
        Self::LENGTH
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        buffer.put_u16(self.version_src_dst());
        buffer.put_u16(self.total_length);
        buffer.put_u8(self.current_info_offset);
        buffer.put_u8(self.current_hop_offset);
        buffer.put_u8(self.next_header);
        buffer.put_u8(self.header_length);
    }
}
