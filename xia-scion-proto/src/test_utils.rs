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

//! Packet fixtures shared by the unit tests.

use bytes::BufMut;

use crate::{
    wire_encoding::WireEncode,
    xia::{NextHeader, Xid, XidNode, XidType, XiaHeader},
};

/// Filler written into the payload of test extension records.
pub const RECORD_FILLER: u8 = 0xee;

/// A base header with one destination (AD) and one source (HID) node.
pub fn sample_header(next_header: NextHeader, payload_length: u16) -> XiaHeader {
    XiaHeader {
        version: 1,
        next_header,
        payload_length,
        hop_limit: 250,
        destination_nodes: 1,
        source_nodes: 1,
        last: 0,
        nodes: vec![
            XidNode {
                xid: Xid::new(XidType::AD, [0x0a; Xid::ID_LENGTH]),
                edges: [0x7f; 4],
            },
            XidNode {
                xid: Xid::new(XidType::HID, [0x0b; Xid::ID_LENGTH]),
                edges: [0x7f; 4],
            },
        ],
    }
}

/// Builds a packet with [`sample_header`], the given extension records, and payload.
///
/// Records are `(nxt, hlen)` pairs. Each record is written with its framing followed by
/// `hlen - 2` filler bytes, so records with an invalid length occupy exactly two bytes.
pub fn build_packet(next_header: NextHeader, records: &[(NextHeader, u8)], payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    for (nxt, length) in records {
        body.put_u8(nxt.0);
        body.put_u8(*length);
        body.put_bytes(RECORD_FILLER, usize::from(*length).saturating_sub(2));
    }
    body.put_slice(payload);

    let header = sample_header(next_header, body.len() as u16);
    let mut packet = Vec::with_capacity(header.encoded_length() + body.len());
    header.encode_to_unchecked(&mut packet);
    packet.extend_from_slice(&body);
    packet
}
