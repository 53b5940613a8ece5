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

//! The SCION address header.

use std::{fmt, str::FromStr};

use bytes::{Buf, BufMut};

use crate::wire_encoding::{InadequateBufferSize, WireEncode};

/// An isolation domain and attachment domain pair, packed into 32 bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IsdAd {
    /// Isolation domain, 12 bits.
    pub isd: u16,
    /// Attachment domain, 20 bits.
    pub ad: u32,
}

impl IsdAd {
    /// Largest representable ISD.
    pub const MAX_ISD: u16 = 0x0fff;
    /// Largest representable AD.
    pub const MAX_AD: u32 = 0x000f_ffff;

    const AD_BITS: u32 = 20;

    /// Creates a new ISD-AD pair. Bits above the field widths are dropped when encoding.
    pub const fn new(isd: u16, ad: u32) -> Self {
        Self { isd, ad }
    }

    /// Returns the packed wire representation.
    pub fn to_u32(self) -> u32 {
        (u32::from(self.isd & Self::MAX_ISD) << Self::AD_BITS) | (self.ad & Self::MAX_AD)
    }

    /// Unpacks the wire representation.
    pub fn from_u32(value: u32) -> Self {
        Self {
            isd: (value >> Self::AD_BITS) as u16,
            ad: value & Self::MAX_AD,
        }
    }
}

impl fmt::Display for IsdAd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.isd, self.ad)
    }
}

/// Error parsing an [`IsdAd`] from `<isd>-<ad>` text.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum IsdAdParseError {
    /// The text is not two numbers separated by `-`.
    #[error("expected <isd>-<ad>, got {0:?}")]
    InvalidFormat(String),
    /// The ISD does not fit in 12 bits.
    #[error("ISD {0} exceeds {max}", max = IsdAd::MAX_ISD)]
    IsdOutOfRange(u64),
    /// The AD does not fit in 20 bits.
    #[error("AD {0} exceeds {max}", max = IsdAd::MAX_AD)]
    AdOutOfRange(u64),
}

impl FromStr for IsdAd {
    type Err = IsdAdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IsdAdParseError::InvalidFormat(s.to_string());
        let (isd, ad) = s.split_once('-').ok_or_else(invalid)?;
        let isd: u64 = isd.parse().map_err(|_| invalid())?;
        let ad: u64 = ad.parse().map_err(|_| invalid())?;
        if isd > u64::from(Self::MAX_ISD) {
            return Err(IsdAdParseError::IsdOutOfRange(isd));
        }
        if ad > u64::from(Self::MAX_AD) {
            return Err(IsdAdParseError::AdOutOfRange(ad));
        }
        Ok(Self::new(isd as u16, ad as u32))
    }
}

/// The SCION address header.
///
/// Only the ISD-AD of both endpoints is carried; the gateway does not route on host addresses.
/// The header is zero padded to a multiple of [`AddressHeader::ALIGNMENT`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressHeader {
    /// The source domain.
    pub source: IsdAd,
    /// The destination domain.
    pub destination: IsdAd,
}

impl AddressHeader {
    /// Alignment of the address header.
    pub const ALIGNMENT: usize = 8;
    const UNPADDED_LENGTH: usize = 8;
    const PADDING: usize =
        (Self::ALIGNMENT - Self::UNPADDED_LENGTH % Self::ALIGNMENT) % Self::ALIGNMENT;
    /// The encoded size of the address header, padding included.
    pub const LENGTH: usize = Self::UNPADDED_LENGTH + Self::PADDING;

    /// Decodes an address header, returning `None` if `data` is too short.
    pub fn decode(data: &mut impl Buf) -> Option<Self> {
        if data.remaining() < Self::LENGTH {
            return None;
        }
        let source = IsdAd::from_u32(data.get_u32());
        let destination = IsdAd::from_u32(data.get_u32());
        data.advance(Self::PADDING);
        Some(Self {
            source,
            destination,
        })
    }
}

impl WireEncode for AddressHeader {
    type Error = InadequateBufferSize;

    #[inline]
    fn encoded_length(&self) -> usize {
        Self::LENGTH
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        buffer.put_u32(self.source.to_u32());
        buffer.put_u32(self.destination.to_u32());
        buffer.put_bytes(0, Self::PADDING);
    }
}
