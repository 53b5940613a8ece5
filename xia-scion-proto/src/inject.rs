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

//! Splicing a SCION routing header into an XIA packet.
//!
//! The routing header is framed as an XIA extension record of type [`NextHeader::SCION`] and
//! inserted into the extension chain:
//!
//! ```text
//! before: | base (nxt=A) | ext (nxt=NO_NEXT) |            payload |
//! after:  | base (nxt=A) | ext (nxt=SCION)   | scion (nxt=NO_NEXT) | payload |
//! ```
//!
//! The pointer that previously terminated (or continued) the chain at the splice point is
//! redirected to the new record, and the new record inherits its old value, so the chain stays
//! walkable end to end. All size limits are checked before the packet is modified.

use bytes::{BufMut, BytesMut};

use crate::{
    scion::{EncodeError, IsdAd, PathBuildError, PathBuilder, RoutingHeader},
    wire_encoding::WireEncode,
    xia::{
        ExtensionChainEnd, ExtensionRecord, MalformedHeaderChain, NextHeader, XiaDecodeError,
        XiaHeader, XiaHeaderLayout, XidType, walk_extension_chain,
    },
};

/// Largest data packet the gateway handles.
pub const MAX_DATA_PACKET_SIZE: usize = 16384;

/// Largest extension record, bounded by its 8-bit length field.
pub const MAX_EXTENSION_LENGTH: usize = u8::MAX as usize;

/// Reasons an injection would exceed a protocol or buffer limit.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum PacketTooLarge {
    /// The framed routing header does not fit the 8-bit extension length.
    #[error("routing extension of {length} bytes exceeds {MAX_EXTENSION_LENGTH} bytes")]
    ExtensionTooLong {
        /// Length of the framed routing header.
        length: usize,
    },
    /// The rewritten packet does not fit the buffer.
    #[error("rewritten packet of {required} bytes exceeds the {capacity} byte buffer")]
    ExceedsCapacity {
        /// Length of the rewritten packet.
        required: usize,
        /// Capacity of the packet buffer.
        capacity: usize,
    },
    /// A 16-bit length field would overflow.
    #[error("length {length} overflows a 16-bit length field")]
    LengthOverflow {
        /// The length that does not fit.
        length: usize,
    },
}

impl From<EncodeError> for PacketTooLarge {
    fn from(value: EncodeError) -> Self {
        match value {
            EncodeError::HeaderTooLarge(length) => Self::ExtensionTooLong {
                length: length + ExtensionRecord::FRAMING_LENGTH,
            },
            EncodeError::PayloadTooLarge(length) => Self::LengthOverflow { length },
        }
    }
}

/// Errors raised while injecting a routing header. The packet is left unmodified.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum InjectError {
    /// The base header cannot be decoded.
    #[error("invalid base header: {0}")]
    InvalidBaseHeader(#[from] XiaDecodeError),
    /// The extension chain or the length accounting is inconsistent.
    #[error("malformed header chain: {0}")]
    MalformedHeaderChain(#[from] MalformedHeaderChain),
    /// The rewritten packet would exceed a size limit.
    #[error("packet too large: {0}")]
    PacketTooLarge(#[from] PacketTooLarge),
    /// No path is available for the configured domains.
    #[error(transparent)]
    NoPath(#[from] PathBuildError),
}

/// Where the routing header is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplicePosition {
    /// After the last extension record.
    #[default]
    ChainEnd,
    /// Directly after the base header, ahead of every existing extension record.
    AfterBaseHeader,
}

/// Outcome of a successful injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// Offset of the new extension record.
    pub offset: usize,
    /// Length of the new extension record.
    pub length: u8,
    /// Next-header code carried by the new record.
    pub next_header: NextHeader,
    /// Payload length written into the base header.
    pub payload_length: u16,
    /// Whether the first DAG node was relabelled as [`XidType::SCION`].
    pub relabelled: bool,
}

/// Builds SCION routing headers and splices them into XIA packets.
#[derive(Debug, Clone)]
pub struct ScionHeaderInjector<P> {
    path_builder: P,
    source: IsdAd,
    destination: IsdAd,
    position: SplicePosition,
    capacity: usize,
}

impl<P: PathBuilder> ScionHeaderInjector<P> {
    /// Creates an injector for paths from `source` to `destination`.
    pub fn new(path_builder: P, source: IsdAd, destination: IsdAd) -> Self {
        Self {
            path_builder,
            source,
            destination,
            position: SplicePosition::default(),
            capacity: MAX_DATA_PACKET_SIZE,
        }
    }

    /// Sets where the routing header is inserted.
    pub fn with_position(mut self, position: SplicePosition) -> Self {
        self.position = position;
        self
    }

    /// Sets the largest packet the injector may produce.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// The configured splice position.
    pub fn position(&self) -> SplicePosition {
        self.position
    }

    /// Validates `packet`, walks its extension chain, and injects the routing header.
    pub fn process(&self, packet: &mut BytesMut) -> Result<Injection, InjectError> {
        let header = Self::validated_header(packet)?;
        let chain = walk_extension_chain(&packet[..], header.header_length(), header.next_header)?;
        self.splice(packet, &header, &chain)
    }

    /// Injects the routing header into `packet`, whose chain ends as described by `chain`.
    ///
    /// The base header, its length accounting, and the chain are validated again. A `chain` that
    /// differs from the chain found in `packet` is rejected.
    pub fn inject(
        &self,
        packet: &mut BytesMut,
        chain: &ExtensionChainEnd,
    ) -> Result<Injection, InjectError> {
        let header = Self::validated_header(packet)?;
        let walked = walk_extension_chain(&packet[..], header.header_length(), header.next_header)?;
        if walked != *chain {
            return Err(MalformedHeaderChain::InconsistentChainEnd {
                supplied: chain.offset,
                walked: walked.offset,
            }
            .into());
        }
        self.splice(packet, &header, &walked)
    }

    fn splice(
        &self,
        packet: &mut BytesMut,
        header: &XiaHeader,
        chain: &ExtensionChainEnd,
    ) -> Result<Injection, InjectError> {
        let packet_end = header.total_length();
        let (splice_at, pointer) = match self.position {
            SplicePosition::ChainEnd => (chain.offset, chain.terminal_pointer()),
            SplicePosition::AfterBaseHeader => {
                (header.header_length(), XiaHeaderLayout::NEXT_HEADER)
            }
        };
        let remaining = packet_end.checked_sub(splice_at).ok_or(
            MalformedHeaderChain::NegativeRemainder {
                chain_end: splice_at,
                packet_end,
            },
        )?;

        let path = self.path_builder.build(self.source, self.destination)?;
        let routing = RoutingHeader::new(self.source, self.destination, path, remaining)
            .map_err(PacketTooLarge::from)?;

        let extension_length = ExtensionRecord::FRAMING_LENGTH + routing.encoded_length();
        if extension_length > MAX_EXTENSION_LENGTH {
            return Err(PacketTooLarge::ExtensionTooLong {
                length: extension_length,
            }
            .into());
        }
        let required = packet_end + extension_length;
        if required > self.capacity {
            return Err(PacketTooLarge::ExceedsCapacity {
                required,
                capacity: self.capacity,
            }
            .into());
        }
        let payload_length = usize::from(header.payload_length) + extension_length;
        let payload_length = u16::try_from(payload_length).map_err(|_| {
            PacketTooLarge::LengthOverflow {
                length: payload_length,
            }
        })?;

        let next_header = NextHeader(packet[pointer]);
        let trailing = packet.split_off(splice_at);
        packet[pointer] = NextHeader::SCION.0;
        packet.put_u8(next_header.0);
        packet.put_u8(extension_length as u8);
        routing.encode_to_unchecked(packet);
        packet.unsplit(trailing);

        packet[XiaHeaderLayout::PAYLOAD_LENGTH..XiaHeaderLayout::PAYLOAD_LENGTH + 2]
            .copy_from_slice(&payload_length.to_be_bytes());
        let relabelled = relabel_first_node(packet, header);

        Ok(Injection {
            offset: splice_at,
            length: extension_length as u8,
            next_header,
            payload_length,
            relabelled,
        })
    }

    fn validated_header(packet: &[u8]) -> Result<XiaHeader, InjectError> {
        let header = XiaHeader::decode(packet)?;
        if header.total_length() != packet.len() {
            return Err(MalformedHeaderChain::PayloadLengthMismatch {
                declared: header.total_length(),
                received: packet.len(),
            }
            .into());
        }
        Ok(header)
    }
}

/// Marks the packet as carrying an explicit path for downstream forwarding.
fn relabel_first_node(packet: &mut [u8], header: &XiaHeader) -> bool {
    if header.nodes.is_empty() {
        return false;
    }
    let offset = XiaHeaderLayout::node_type(0);
    packet[offset..offset + 4].copy_from_slice(&XidType::SCION.0.to_be_bytes());
    true
}

#[cfg(test)]
mod tests {
    use bytes::Buf;
    use test_log::test;

    use super::*;
    use crate::{
        scion::{HopField, InfoField, PathSegment, RoutingPath, StaticPathBuilder},
        test_utils::build_packet,
        xia::extension::ExtensionChain,
    };

    const BASE: usize = 8 + 2 * 28;
    /// Framing, common header, address header, and the reference path.
    const REFERENCE_LENGTH: usize = 2 + 8 + 8 + 84;

    fn injector() -> ScionHeaderInjector<StaticPathBuilder> {
        ScionHeaderInjector::new(
            StaticPathBuilder::reference(),
            IsdAd::new(0, 0),
            IsdAd::new(1, 1),
        )
    }

    fn walk(packet: &[u8]) -> ExtensionChainEnd {
        let header = XiaHeader::decode(packet).unwrap();
        walk_extension_chain(packet, header.header_length(), header.next_header).unwrap()
    }

    fn records(packet: &[u8]) -> Vec<ExtensionRecord> {
        let header = XiaHeader::decode(packet).unwrap();
        ExtensionChain::new(packet, header.header_length(), header.next_header)
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn splices_after_single_extension() {
        let payload = b"original trailing payload";
        let mut packet =
            BytesMut::from(&build_packet(NextHeader::DATA, &[(NextHeader::NO_NEXT, 8)], payload)[..]);
        let before = XiaHeader::decode(&packet).unwrap();

        let chain = walk(&packet);
        assert_eq!(chain.offset, BASE + 8);

        let injection = injector().inject(&mut packet, &chain).unwrap();
        assert_eq!(usize::from(injection.length), REFERENCE_LENGTH);
        assert_eq!(injection.offset, BASE + 8);
        assert_eq!(injection.next_header, NextHeader::NO_NEXT);

        let after = XiaHeader::decode(&packet).unwrap();
        assert_eq!(
            usize::from(after.payload_length),
            usize::from(before.payload_length) + REFERENCE_LENGTH
        );
        assert_eq!(after.total_length(), packet.len());

        let found = records(&packet);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].next_header, NextHeader::SCION);
        assert_eq!(found[1].header_type, NextHeader::SCION);
        assert_eq!(found[1].next_header, NextHeader::NO_NEXT);
        assert_eq!(usize::from(found[1].length), REFERENCE_LENGTH);

        assert_eq!(walk(&packet).offset, BASE + 8 + REFERENCE_LENGTH);
        assert_eq!(&packet[BASE + 8 + REFERENCE_LENGTH..], payload);
    }

    #[test]
    fn routing_header_accounts_for_trailing_payload() {
        let payload = [0x42u8; 30];
        let mut packet =
            BytesMut::from(&build_packet(NextHeader::DATA, &[(NextHeader::NO_NEXT, 4)], &payload)[..]);
        injector().process(&mut packet).unwrap();

        let mut block = &packet[BASE + 4 + 2..];
        let routing = RoutingHeader::decode(&mut block).unwrap();
        assert_eq!(usize::from(routing.common.header_length), REFERENCE_LENGTH - 2);
        assert_eq!(
            usize::from(routing.common.total_length),
            REFERENCE_LENGTH - 2 + payload.len()
        );
        assert_eq!(routing.address.destination, IsdAd::new(1, 1));
        assert_eq!(routing.path.segments.len(), 3);
        assert_eq!(block.remaining(), payload.len());
    }

    #[test]
    fn empty_chain_redirects_base_header() {
        let mut packet = BytesMut::from(&build_packet(NextHeader::NO_NEXT, &[], b"data")[..]);
        let injection = injector().process(&mut packet).unwrap();

        assert_eq!(injection.offset, BASE);
        assert_eq!(packet[XiaHeaderLayout::NEXT_HEADER], NextHeader::SCION.0);
        let found = records(&packet);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].next_header, NextHeader::NO_NEXT);
        assert_eq!(&packet[BASE + REFERENCE_LENGTH..], b"data");
    }

    #[test]
    fn after_base_header_keeps_existing_chain() {
        let records_before = [(NextHeader::TRANSPORT, 6), (NextHeader::NO_NEXT, 10)];
        let original = build_packet(NextHeader::XCMP, &records_before, b"xyz");
        let mut packet = BytesMut::from(&original[..]);

        let injection = injector()
            .with_position(SplicePosition::AfterBaseHeader)
            .process(&mut packet)
            .unwrap();
        assert_eq!(injection.offset, BASE);
        assert_eq!(injection.next_header, NextHeader::XCMP);

        let found = records(&packet);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].header_type, NextHeader::SCION);
        assert_eq!(found[0].next_header, NextHeader::XCMP);
        assert_eq!(found[1].header_type, NextHeader::XCMP);
        assert_eq!(found[2].next_header, NextHeader::NO_NEXT);
        assert_eq!(&packet[BASE + REFERENCE_LENGTH..], &original[BASE..]);
    }

    #[test]
    fn first_node_is_relabelled() {
        let mut packet = BytesMut::from(&build_packet(NextHeader::NO_NEXT, &[], b"")[..]);
        let injection = injector().process(&mut packet).unwrap();
        assert!(injection.relabelled);

        let header = XiaHeader::decode(&packet).unwrap();
        assert_eq!(header.nodes[0].xid.xid_type, XidType::SCION);
        assert_eq!(header.nodes[1].xid.xid_type, XidType::HID);
    }

    #[test]
    fn oversized_path_is_rejected_before_modification() {
        let hops = vec![HopField::default(); 24];
        let path = RoutingPath::new(vec![PathSegment::new(InfoField::TYPE_NORMAL, 0, 0, hops)]);
        let injector =
            ScionHeaderInjector::new(StaticPathBuilder::new(path), IsdAd::new(0, 0), IsdAd::new(1, 1));
        let original = build_packet(NextHeader::DATA, &[(NextHeader::NO_NEXT, 8)], b"keep me");
        let mut packet = BytesMut::from(&original[..]);

        // 2 + 8 + 8 + 8 + 24 * 10 = 266
        assert_eq!(
            injector.process(&mut packet),
            Err(InjectError::PacketTooLarge(PacketTooLarge::ExtensionTooLong {
                length: 266
            }))
        );
        assert_eq!(&packet[..], &original[..]);
    }

    #[test]
    fn header_length_limit_is_inclusive() {
        // 2 + 8 + 8 + 8 + 22 * 10 = 246, one more hop gives 256.
        let fits = RoutingPath::new(vec![PathSegment::new(
            InfoField::TYPE_NORMAL,
            0,
            0,
            vec![HopField::default(); 22],
        )]);
        let injector =
            ScionHeaderInjector::new(StaticPathBuilder::new(fits), IsdAd::new(0, 0), IsdAd::new(1, 1));
        let mut packet = BytesMut::from(&build_packet(NextHeader::NO_NEXT, &[], b"")[..]);
        assert_eq!(injector.process(&mut packet).unwrap().length, 246);

        let too_long = RoutingPath::new(vec![PathSegment::new(
            InfoField::TYPE_NORMAL,
            0,
            0,
            vec![HopField::default(); 23],
        )]);
        let injector = ScionHeaderInjector::new(
            StaticPathBuilder::new(too_long),
            IsdAd::new(0, 0),
            IsdAd::new(1, 1),
        );
        let mut packet = BytesMut::from(&build_packet(NextHeader::NO_NEXT, &[], b"")[..]);
        assert_eq!(
            injector.process(&mut packet),
            Err(InjectError::PacketTooLarge(PacketTooLarge::ExtensionTooLong {
                length: 256
            }))
        );
    }

    #[test]
    fn capacity_is_checked_before_modification() {
        let original = build_packet(NextHeader::NO_NEXT, &[], &[0u8; 100]);
        let mut packet = BytesMut::from(&original[..]);
        let capacity = original.len() + REFERENCE_LENGTH - 1;

        assert_eq!(
            injector().with_capacity(capacity).process(&mut packet),
            Err(InjectError::PacketTooLarge(PacketTooLarge::ExceedsCapacity {
                required: capacity + 1,
                capacity
            }))
        );
        assert_eq!(&packet[..], &original[..]);

        let mut packet = BytesMut::from(&original[..]);
        assert!(injector().with_capacity(capacity + 1).process(&mut packet).is_ok());
    }

    #[test]
    fn inconsistent_payload_length_is_rejected() {
        let mut original = build_packet(NextHeader::NO_NEXT, &[], b"12345");
        original.push(0);
        let mut packet = BytesMut::from(&original[..]);
        assert_eq!(
            injector().process(&mut packet),
            Err(InjectError::MalformedHeaderChain(
                MalformedHeaderChain::PayloadLengthMismatch {
                    declared: original.len() - 1,
                    received: original.len()
                }
            ))
        );
    }

    #[test]
    fn chain_end_past_packet_is_rejected() {
        let original = build_packet(NextHeader::NO_NEXT, &[], b"12345");
        let mut packet = BytesMut::from(&original[..]);
        let past_end = ExtensionChainEnd {
            offset: original.len() + 1,
            last_record: None,
        };
        assert_eq!(
            injector().inject(&mut packet, &past_end),
            Err(InjectError::MalformedHeaderChain(
                MalformedHeaderChain::InconsistentChainEnd {
                    supplied: original.len() + 1,
                    walked: BASE
                }
            ))
        );
        assert_eq!(&packet[..], &original[..]);
    }

    #[test]
    fn chain_end_inside_record_is_rejected() {
        let original = build_packet(NextHeader::DATA, &[(NextHeader::NO_NEXT, 8)], b"payload");
        let mut packet = BytesMut::from(&original[..]);
        let inside_record = ExtensionChainEnd {
            offset: BASE + 4,
            last_record: None,
        };
        assert_eq!(
            injector().inject(&mut packet, &inside_record),
            Err(InjectError::MalformedHeaderChain(
                MalformedHeaderChain::InconsistentChainEnd {
                    supplied: BASE + 4,
                    walked: BASE + 8
                }
            ))
        );
        assert_eq!(&packet[..], &original[..]);
    }

    #[test]
    fn chain_end_without_last_record_is_rejected() {
        let original = build_packet(NextHeader::DATA, &[(NextHeader::NO_NEXT, 8)], b"payload");
        let mut packet = BytesMut::from(&original[..]);
        let mut chain = walk(&original);
        chain.last_record = None;
        assert!(matches!(
            injector().inject(&mut packet, &chain),
            Err(InjectError::MalformedHeaderChain(
                MalformedHeaderChain::InconsistentChainEnd { .. }
            ))
        ));
        assert_eq!(&packet[..], &original[..]);

        // The walked chain end is accepted and keeps the chain walkable.
        let chain = walk(&original);
        injector().inject(&mut packet, &chain).unwrap();
        let found = records(&packet);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].offset, BASE + 8);
        assert_eq!(found[1].header_type, NextHeader::SCION);
    }

    #[test]
    fn zero_length_record_is_rejected() {
        let original = build_packet(NextHeader::DATA, &[(NextHeader::XCMP, 0)], b"abc");
        let mut packet = BytesMut::from(&original[..]);
        assert!(matches!(
            injector().process(&mut packet),
            Err(InjectError::MalformedHeaderChain(
                MalformedHeaderChain::InvalidRecordLength { length: 0, .. }
            ))
        ));
    }

    #[test]
    fn truncated_base_header_is_rejected() {
        let mut packet = BytesMut::from(&[1u8, 2, 3][..]);
        assert!(matches!(
            injector().process(&mut packet),
            Err(InjectError::InvalidBaseHeader(_))
        ));
    }
}
