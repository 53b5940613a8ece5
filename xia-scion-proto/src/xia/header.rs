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

//! The XIA base header.

use bytes::{Buf, BufMut};

use super::{NextHeader, Xid, XidType};
use crate::wire_encoding::{InadequateBufferSize, WireEncode};

/// Errors raised when decoding an [`XiaHeader`].
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum XiaDecodeError {
    /// The buffer ends before the base header does.
    #[error("packet of {received} bytes is shorter than its {required} byte base header")]
    TruncatedBaseHeader {
        /// Length required by the node counts.
        required: usize,
        /// Length of the received buffer.
        received: usize,
    },
}

/// A node of the XIA address DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XidNode {
    /// The identifier of the node.
    pub xid: Xid,
    /// Indices of the outgoing edges of the node.
    pub edges: [u8; 4],
}

impl XidNode {
    /// The encoded size of a node.
    pub const ENCODED_SIZE: usize = 28;
}

/// The XIA base header.
///
/// ```text
///  0        1        2        3        4        5        6        7
/// +--------+--------+--------+--------+--------+--------+--------+--------+
/// |  ver   |  nxt   |   payload len   |  hlim  | dnode  | snode  |  last  |
/// +--------+--------+--------+--------+--------+--------+--------+--------+
/// |                  nodes (dnode + snode) x 28 bytes                     |
/// +--------+--------+--------+--------+--------+--------+--------+--------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XiaHeader {
    /// Protocol version.
    pub version: u8,
    /// Type of the first header after the base header.
    pub next_header: NextHeader,
    /// Number of bytes after the base header, extension headers included.
    pub payload_length: u16,
    /// Hop limit.
    pub hop_limit: u8,
    /// Number of destination DAG nodes.
    pub destination_nodes: u8,
    /// Number of source DAG nodes.
    pub source_nodes: u8,
    /// Index of the last visited destination node, `-1` if none.
    pub last: i8,
    /// Destination nodes followed by source nodes.
    pub nodes: Vec<XidNode>,
}

impl XiaHeader {
    /// Length of the fixed part of the header.
    pub const FIXED_LENGTH: usize = 8;
    /// Value of [`Self::last`] before any node has been visited.
    pub const LAST_UNSET: i8 = -1;

    /// Decodes the base header at the start of `data`.
    ///
    /// The payload length is not checked against `data`, see [`Self::total_length`].
    pub fn decode(mut data: &[u8]) -> Result<Self, XiaDecodeError> {
        let received = data.len();
        if received < Self::FIXED_LENGTH {
            return Err(XiaDecodeError::TruncatedBaseHeader {
                required: Self::FIXED_LENGTH,
                received,
            });
        }

        let version = data.get_u8();
        let next_header = NextHeader(data.get_u8());
        let payload_length = data.get_u16();
        let hop_limit = data.get_u8();
        let destination_nodes = data.get_u8();
        let source_nodes = data.get_u8();
        let last = data.get_i8();

        let node_count = usize::from(destination_nodes) + usize::from(source_nodes);
        let required = XiaHeaderLayout::header_length(node_count);
        if received < required {
            return Err(XiaDecodeError::TruncatedBaseHeader { required, received });
        }

        let nodes = (0..node_count)
            .map(|_| {
                let xid_type = XidType(data.get_u32());
                let mut id = [0u8; Xid::ID_LENGTH];
                data.copy_to_slice(&mut id);
                let mut edges = [0u8; 4];
                data.copy_to_slice(&mut edges);
                XidNode {
                    xid: Xid::new(xid_type, id),
                    edges,
                }
            })
            .collect();

        Ok(Self {
            version,
            next_header,
            payload_length,
            hop_limit,
            destination_nodes,
            source_nodes,
            last,
            nodes,
        })
    }

    /// Length of the base header in bytes.
    pub fn header_length(&self) -> usize {
        XiaHeaderLayout::header_length(self.nodes.len())
    }

    /// Length of the whole packet as declared by the header.
    pub fn total_length(&self) -> usize {
        self.header_length() + usize::from(self.payload_length)
    }
}

impl WireEncode for XiaHeader {
    type Error = InadequateBufferSize;

    fn encoded_length(&self) -> usize {
        self.header_length()
    }

    fn encode_to_unchecked<T: BufMut>(&self, buffer: &mut T) {
        buffer.put_u8(self.version);
        buffer.put_u8(self.next_header.0);
        buffer.put_u16(self.payload_length);
        buffer.put_u8(self.hop_limit);
        buffer.put_u8(self.destination_nodes);
        buffer.put_u8(self.source_nodes);
        buffer.put_i8(self.last);
        for node in &self.nodes {
            buffer.put_u32(node.xid.xid_type.0);
            buffer.put_slice(&node.xid.id);
            buffer.put_slice(&node.edges);
        }
    }
}

/// Byte offsets of the XIA base header fields, used to rewrite a packet in place.
pub struct XiaHeaderLayout;

impl XiaHeaderLayout {
    /// Offset of the next-header code.
    pub const NEXT_HEADER: usize = 1;
    /// Offset of the 16-bit payload length.
    pub const PAYLOAD_LENGTH: usize = 2;
    /// Offset of the last-node pointer.
    pub const LAST: usize = 7;

    /// Length of a base header with `node_count` nodes.
    pub const fn header_length(node_count: usize) -> usize {
        XiaHeader::FIXED_LENGTH + node_count * XidNode::ENCODED_SIZE
    }

    /// Offset of the type tag of node `index`.
    pub const fn node_type(index: usize) -> usize {
        XiaHeader::FIXED_LENGTH + index * XidNode::ENCODED_SIZE
    }
}
