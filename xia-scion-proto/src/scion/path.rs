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

//! SCION forwarding paths made of info and hop opaque fields.

use bytes::{Buf, BufMut};

use super::IsdAd;
use crate::wire_encoding::{InadequateBufferSize, WireEncode};

const INTERFACE_MASK: u32 = 0x0fff;
const INTERFACE_BITS: u32 = 12;

/// Packs an ingress/egress interface pair into the low 24 bits of a 32-bit field.
///
/// Each interface is truncated to 12 bits; the egress interface occupies the upper half.
pub fn pack_interfaces(ingress: u16, egress: u16) -> u32 {
    ((u32::from(egress) & INTERFACE_MASK) << INTERFACE_BITS) | (u32::from(ingress) & INTERFACE_MASK)
}

/// Splits a packed interface field into `(ingress, egress)`.
pub fn unpack_interfaces(packed: u32) -> (u16, u16) {
    (
        (packed & INTERFACE_MASK) as u16,
        ((packed >> INTERFACE_BITS) & INTERFACE_MASK) as u16,
    )
}

/// InfoField opens a path segment.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |                   Timestamp                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   (cont.)     |              TTL              |     Hops      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoField {
    /// Segment type.
    pub info_type: u8,
    /// Creation time of the segment in Unix seconds.
    pub timestamp: u32,
    /// Time to live of the segment.
    pub ttl: u16,
    /// Number of hop fields in the segment.
    pub hops: u8,
}

impl InfoField {
    /// The encoded size of an InfoField.
    pub const ENCODED_SIZE: usize = 8;
    /// Regular up or down segment.
    pub const TYPE_NORMAL: u8 = 0x00;
    /// Core segment.
    pub const TYPE_CORE: u8 = 0x80;

    /// Decodes an info field, returning `None` if `data` is too short.
    pub fn decode(data: &mut impl Buf) -> Option<Self> {
        if data.remaining() < Self::ENCODED_SIZE {
            return None;
        }
        Some(Self {
            info_type: data.get_u8(),
            timestamp: data.get_u32(),
            ttl: data.get_u16(),
            hops: data.get_u8(),
        })
    }
}

impl WireEncode for InfoField {
    type Error = InadequateBufferSize;

    fn encoded_length(&self) -> usize {
        Self::ENCODED_SIZE
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        buffer.put_u8(self.info_type);
        buffer.put_u32(self.timestamp);
        buffer.put_u16(self.ttl);
        buffer.put_u8(self.hops);
    }
}

/// HopField describes the traversal of one AS.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    ExpTime    |    0 (8)      |  Egress (hi)  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Egr(lo)|      Ingress          |    0 (8)      |   MAC (hi)    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            MAC (lo)           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HopField {
    /// Hop type.
    pub hop_type: u8,
    /// Relative expiry time.
    pub expiry: u8,
    /// Ingress interface ID, 12 bits.
    pub ingress: u16,
    /// Egress interface ID, 12 bits.
    pub egress: u16,
    /// Message authentication code, 24 bits.
    pub mac: u32,
}

impl HopField {
    /// The encoded size of a HopField.
    pub const ENCODED_SIZE: usize = 10;
    /// Regular hop.
    pub const TYPE_NORMAL: u8 = 0x00;
    const MAC_MASK: u32 = 0x00ff_ffff;

    /// Decodes a hop field, returning `None` if `data` is too short.
    pub fn decode(data: &mut impl Buf) -> Option<Self> {
        if data.remaining() < Self::ENCODED_SIZE {
            return None;
        }
        let hop_type = data.get_u8();
        let expiry = data.get_u8();
        let (ingress, egress) = unpack_interfaces(data.get_u32());
        let mac = data.get_u32() & Self::MAC_MASK;
        Some(Self {
            hop_type,
            expiry,
            ingress,
            egress,
            mac,
        })
    }
}

impl WireEncode for HopField {
    type Error = InadequateBufferSize;

    fn encoded_length(&self) -> usize {
        Self::ENCODED_SIZE
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        buffer.put_u8(self.hop_type);
        buffer.put_u8(self.expiry);
        buffer.put_u32(pack_interfaces(self.ingress, self.egress));
        buffer.put_u32(self.mac & Self::MAC_MASK);
    }
}

/// One segment of a path: an info field followed by its hop fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// The info field. Its hop count matches [`Self::hops`].
    pub info: InfoField,
    /// The hop fields in traversal order.
    pub hops: Vec<HopField>,
}

impl PathSegment {
    /// Creates a segment, setting the info field's hop count from `hops`.
    pub fn new(info_type: u8, timestamp: u32, ttl: u16, hops: Vec<HopField>) -> Self {
        let info = InfoField {
            info_type,
            timestamp,
            ttl,
            hops: u8::try_from(hops.len()).unwrap_or(u8::MAX),
        };
        Self { info, hops }
    }
}

impl WireEncode for PathSegment {
    type Error = InadequateBufferSize;

    fn encoded_length(&self) -> usize {
        InfoField::ENCODED_SIZE + self.hops.len() * HopField::ENCODED_SIZE
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        self.info.encode_to_unchecked(buffer);
        for hop in &self.hops {
            hop.encode_to_unchecked(buffer);
        }
    }
}

/// An ordered sequence of path segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutingPath {
    /// Segments in traversal order.
    pub segments: Vec<PathSegment>,
}

impl RoutingPath {
    /// Creates a path from its segments.
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Decodes `length` bytes of segments.
    ///
    /// Returns `None` if a segment is truncated or overruns `length`.
    pub fn decode(data: &mut impl Buf, length: usize) -> Option<Self> {
        if data.remaining() < length {
            return None;
        }
        let mut data = data.take(length);
        let mut segments = Vec::new();
        while data.has_remaining() {
            let info = InfoField::decode(&mut data)?;
            let hops = (0..info.hops)
                .map(|_| HopField::decode(&mut data))
                .collect::<Option<Vec<_>>>()?;
            segments.push(PathSegment { info, hops });
        }
        Some(Self { segments })
    }
}

impl WireEncode for RoutingPath {
    type Error = InadequateBufferSize;

    fn encoded_length(&self) -> usize {
        self.segments.iter().map(WireEncode::encoded_length).sum()
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        for segment in &self.segments {
            segment.encode_to_unchecked(buffer);
        }
    }
}

/// Error returned by a [`PathBuilder`].
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum PathBuildError {
    /// No path is known between the two domains.
    #[error("no path from {from} to {to}")]
    NoPath {
        /// The source domain.
        from: IsdAd,
        /// The destination domain.
        to: IsdAd,
    },
}

/// Supplies forwarding paths between two domains.
pub trait PathBuilder {
    /// Returns the path from `source` to `destination`.
    fn build(&self, source: IsdAd, destination: IsdAd) -> Result<RoutingPath, PathBuildError>;
}

/// A [`PathBuilder`] that returns the same path for every domain pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPathBuilder {
    path: RoutingPath,
}

impl StaticPathBuilder {
    /// Creates a builder that always returns `path`.
    pub fn new(path: RoutingPath) -> Self {
        Self { path }
    }

    /// A fixed up/core/down path with two hops per segment.
    pub fn reference() -> Self {
        const EXPIRY: u8 = 111;
        const MAC: u32 = 0x0001_0203;
        let hop = |egress, ingress| {
            HopField {
                hop_type: HopField::TYPE_NORMAL,
                expiry: EXPIRY,
                ingress,
                egress,
                mac: MAC,
            }
        };

        Self::new(RoutingPath::new(vec![
            PathSegment::new(InfoField::TYPE_CORE, 1111, 1, vec![hop(12, 45), hop(78, 98)]),
            PathSegment::new(InfoField::TYPE_CORE, 2222, 1, vec![hop(11, 22), hop(33, 44)]),
            PathSegment::new(InfoField::TYPE_CORE, 3333, 1, vec![hop(12, 45), hop(78, 78)]),
        ]))
    }
}

impl PathBuilder for StaticPathBuilder {
    fn build(&self, _source: IsdAd, _destination: IsdAd) -> Result<RoutingPath, PathBuildError> {
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn no_path_names_both_domains() {
        let err = PathBuildError::NoPath {
            from: IsdAd::new(1, 10),
            to: IsdAd::new(2, 20),
        };
        assert_eq!(err.to_string(), "no path from 1-10 to 2-20");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn interface_pair_layout() {
        assert_eq!(pack_interfaces(45, 12), 0x0000_c02d);
        assert_eq!(pack_interfaces(0xffff, 0xffff), 0x00ff_ffff);
        assert_eq!(unpack_interfaces(0x0000_c02d), (45, 12));
    }

    #[test]
    fn hop_field_is_network_byte_order() {
        let hop = HopField {
            hop_type: HopField::TYPE_NORMAL,
            expiry: 111,
            ingress: 45,
            egress: 12,
            mac: 0x0001_0203,
        };
        let encoded = hop.encode_to_bytes();
        assert_eq!(
            encoded.as_ref(),
            &[0x00, 111, 0x00, 0x00, 0xc0, 0x2d, 0x00, 0x01, 0x02, 0x03]
        );
        assert_eq!(HopField::decode(&mut encoded.clone()), Some(hop));
    }

    #[test]
    fn reference_path_layout() {
        let path = StaticPathBuilder::reference()
            .build(IsdAd::new(0, 0), IsdAd::new(1, 1))
            .unwrap();
        assert_eq!(path.segments.len(), 3);
        assert!(path.segments.iter().all(|s| s.info.hops == 2));
        assert_eq!(
            path.encoded_length(),
            3 * (InfoField::ENCODED_SIZE + 2 * HopField::ENCODED_SIZE)
        );

        let encoded = path.encode_to_bytes();
        assert_eq!(
            RoutingPath::decode(&mut encoded.clone(), encoded.len()),
            Some(path)
        );
    }

    #[test]
    fn decode_rejects_truncated_segment() {
        let path = StaticPathBuilder::reference()
            .build(IsdAd::default(), IsdAd::default())
            .unwrap();
        let encoded = path.encode_to_bytes();
        let short = encoded.len() - 3;
        assert_eq!(RoutingPath::decode(&mut encoded.slice(..short), short), None);
    }
}
