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

//! XIA extension headers and the walk along their chain.
//!
//! Every header whose type is not [`NextHeader::NO_NEXT`] is followed by an extension record:
//!
//! ```text
//! +--------+--------+--------+--------+-- ... --+
//! |  nxt   |  hlen  |         payload           |
//! +--------+--------+--------+--------+-- ... --+
//! ```
//!
//! `hlen` counts the whole record, framing included. The chain is attacker-controlled input, so
//! every record is checked against the buffer before it is read.

use super::NextHeader;

/// Errors raised when the extension header chain cannot be followed.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum MalformedHeaderChain {
    /// An extension record starts too close to the end of the packet to hold its framing.
    #[error("extension record at offset {offset} is truncated")]
    TruncatedRecord {
        /// Offset of the record.
        offset: usize,
    },
    /// An extension record declares a length that does not cover its own framing.
    #[error("extension record at offset {offset} has invalid length {length}")]
    InvalidRecordLength {
        /// Offset of the record.
        offset: usize,
        /// Declared record length.
        length: u8,
    },
    /// An extension record extends past the end of the packet.
    #[error("extension record at offset {offset} with length {length} exceeds packet end {limit}")]
    RecordOutOfBounds {
        /// Offset of the record.
        offset: usize,
        /// Declared record length.
        length: u8,
        /// End of the packet.
        limit: usize,
    },
    /// The declared payload length disagrees with the received bytes.
    #[error("declared packet length {declared} does not match received length {received}")]
    PayloadLengthMismatch {
        /// Length declared by the base header.
        declared: usize,
        /// Length of the received buffer.
        received: usize,
    },
    /// The chain ends beyond the declared end of the packet.
    #[error("extension chain ends at {chain_end}, past the packet end {packet_end}")]
    NegativeRemainder {
        /// End of the extension chain.
        chain_end: usize,
        /// Declared end of the packet.
        packet_end: usize,
    },
    /// A supplied chain end disagrees with the chain found in the packet.
    #[error("supplied chain end {supplied} does not match the walked chain end {walked}")]
    InconsistentChainEnd {
        /// Chain end offset supplied by the caller.
        supplied: usize,
        /// Chain end offset found by walking the packet.
        walked: usize,
    },
}

/// A single extension record found while walking the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionRecord {
    /// Offset of the record from the start of the packet.
    pub offset: usize,
    /// Type of this record, as announced by the preceding header.
    pub header_type: NextHeader,
    /// Type of the header following this record.
    pub next_header: NextHeader,
    /// Length of the record, framing included.
    pub length: u8,
}

impl ExtensionRecord {
    /// Length of the `{nxt, hlen}` framing.
    pub const FRAMING_LENGTH: usize = 2;
    /// Offset of the next-header code within a record.
    pub const NEXT_HEADER: usize = 0;
    /// Offset of the length within a record.
    pub const LENGTH: usize = 1;

    /// Offset of the first byte after this record.
    pub fn end(&self) -> usize {
        self.offset + usize::from(self.length)
    }
}

/// Where the extension header chain ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionChainEnd {
    /// Offset of the first byte after the chain.
    pub offset: usize,
    /// The last record of the chain, `None` if the chain is empty.
    pub last_record: Option<ExtensionRecord>,
}

impl ExtensionChainEnd {
    /// Offset of the next-header code that terminates the chain.
    ///
    /// This is the last record's code, or the base header's code for an empty chain.
    pub fn terminal_pointer(&self) -> usize {
        match self.last_record {
            Some(record) => record.offset + ExtensionRecord::NEXT_HEADER,
            None => super::XiaHeaderLayout::NEXT_HEADER,
        }
    }
}

/// Iterator over the records of an extension header chain.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct ExtensionChain<'a> {
    packet: &'a [u8],
    offset: usize,
    next_header: NextHeader,
    failed: bool,
}

impl<'a> ExtensionChain<'a> {
    /// Starts a walk at `offset`, where a header of type `next_header` is expected.
    pub fn new(packet: &'a [u8], offset: usize, next_header: NextHeader) -> Self {
        Self {
            packet,
            offset,
            next_header,
            failed: false,
        }
    }

    /// Offset at which the walk currently stands.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_record(&self) -> Result<ExtensionRecord, MalformedHeaderChain> {
        let offset = self.offset;
        let limit = self.packet.len();
        if offset + ExtensionRecord::FRAMING_LENGTH > limit {
            return Err(MalformedHeaderChain::TruncatedRecord { offset });
        }

        let next_header = NextHeader(self.packet[offset + ExtensionRecord::NEXT_HEADER]);
        let length = self.packet[offset + ExtensionRecord::LENGTH];
        if usize::from(length) < ExtensionRecord::FRAMING_LENGTH {
            return Err(MalformedHeaderChain::InvalidRecordLength { offset, length });
        }
        if offset + usize::from(length) > limit {
            return Err(MalformedHeaderChain::RecordOutOfBounds {
                offset,
                length,
                limit,
            });
        }

        Ok(ExtensionRecord {
            offset,
            header_type: self.next_header,
            next_header,
            length,
        })
    }
}

impl Iterator for ExtensionChain<'_> {
    type Item = Result<ExtensionRecord, MalformedHeaderChain>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_header.is_terminal() {
            return None;
        }
        match self.read_record() {
            Ok(record) => {
                self.offset = record.end();
                self.next_header = record.next_header;
                Some(Ok(record))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Walks the extension header chain of `packet`.
///
/// `start` is the end of the base header and `next_header` the base header's next-header code.
/// `packet` must end at the declared end of the packet; no record may extend beyond it.
///
/// Every record advances the walk by at least its framing, so the walk terminates after at most
/// `packet.len() / 2` records.
pub fn walk_extension_chain(
    packet: &[u8],
    start: usize,
    next_header: NextHeader,
) -> Result<ExtensionChainEnd, MalformedHeaderChain> {
    let mut chain = ExtensionChain::new(packet, start, next_header);
    let mut last_record = None;
    for record in chain.by_ref() {
        last_record = Some(record?);
    }
    Ok(ExtensionChainEnd {
        offset: chain.offset(),
        last_record,
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::test_utils::{build_packet, sample_header};

    const BASE: usize = 8 + 2 * 28;

    #[test]
    fn empty_chain_ends_at_base_header() {
        let packet = build_packet(NextHeader::NO_NEXT, &[], b"payload");
        let end = walk_extension_chain(&packet, BASE, NextHeader::NO_NEXT).unwrap();
        assert_eq!(end.offset, BASE);
        assert_eq!(end.last_record, None);
        assert_eq!(end.terminal_pointer(), 1);
    }

    #[test]
    fn offset_is_sum_of_record_lengths() {
        let records = [
            (NextHeader::XCMP, 8),
            (NextHeader::TRANSPORT, 4),
            (NextHeader::NO_NEXT, 12),
        ];
        let packet = build_packet(NextHeader::DATA, &records, b"data");
        let end = walk_extension_chain(&packet, BASE, NextHeader::DATA).unwrap();

        assert_eq!(end.offset, BASE + 8 + 4 + 12);
        let last = end.last_record.unwrap();
        assert_eq!(last.offset, BASE + 12);
        assert_eq!(last.header_type, NextHeader::TRANSPORT);
        assert_eq!(last.next_header, NextHeader::NO_NEXT);
        assert_eq!(end.terminal_pointer(), BASE + 12);
    }

    #[test]
    fn iterator_reports_every_record() {
        let records = [(NextHeader::TRANSPORT, 6), (NextHeader::NO_NEXT, 2)];
        let packet = build_packet(NextHeader::XCMP, &records, b"");
        let found: Vec<_> = ExtensionChain::new(&packet, BASE, NextHeader::XCMP)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            found,
            vec![
                ExtensionRecord {
                    offset: BASE,
                    header_type: NextHeader::XCMP,
                    next_header: NextHeader::TRANSPORT,
                    length: 6,
                },
                ExtensionRecord {
                    offset: BASE + 6,
                    header_type: NextHeader::TRANSPORT,
                    next_header: NextHeader::NO_NEXT,
                    length: 2,
                },
            ]
        );
    }

    #[test]
    fn zero_length_record_is_rejected() {
        let records = [(NextHeader::XCMP, 8), (NextHeader::XCMP, 0)];
        let packet = build_packet(NextHeader::DATA, &records, b"tail bytes");
        assert_eq!(
            walk_extension_chain(&packet, BASE, NextHeader::DATA),
            Err(MalformedHeaderChain::InvalidRecordLength {
                offset: BASE + 8,
                length: 0
            })
        );
    }

    #[test]
    fn record_past_packet_end_is_rejected() {
        let mut packet = build_packet(NextHeader::DATA, &[(NextHeader::NO_NEXT, 8)], b"");
        packet[BASE + 1] = 200;
        assert_eq!(
            walk_extension_chain(&packet, BASE, NextHeader::DATA),
            Err(MalformedHeaderChain::RecordOutOfBounds {
                offset: BASE,
                length: 200,
                limit: BASE + 8
            })
        );
    }

    #[test]
    fn chain_without_terminator_is_rejected() {
        // The record claims another header follows but the packet ends.
        let packet = build_packet(NextHeader::DATA, &[(NextHeader::XCMP, 8)], b"");
        assert_eq!(
            walk_extension_chain(&packet, BASE, NextHeader::DATA),
            Err(MalformedHeaderChain::TruncatedRecord { offset: BASE + 8 })
        );
    }

    #[test]
    fn header_without_room_for_records_is_rejected() {
        let packet = sample_header(NextHeader::DATA, 0);
        let encoded = crate::wire_encoding::WireEncode::encode_to_bytes(&packet);
        assert_eq!(
            walk_extension_chain(&encoded, BASE, NextHeader::DATA),
            Err(MalformedHeaderChain::TruncatedRecord { offset: BASE })
        );
    }
}
