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

//! XIA packets as seen by the gateway.
//!
//! An XIA packet starts with a [base header][XiaHeader] holding the destination and source DAGs
//! as a list of typed identifier nodes. It is followed by a chain of
//! [extension headers][extension] whose types are linked through [`NextHeader`] codes.

mod header;
pub use header::{XiaDecodeError, XiaHeader, XiaHeaderLayout, XidNode};

mod xid;
pub use xid::{Xid, XidParseError, XidType};

pub mod extension;
pub use extension::{ExtensionChainEnd, ExtensionRecord, MalformedHeaderChain, walk_extension_chain};

/// Type code of the header that follows the base header or an extension header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NextHeader(pub u8);

impl NextHeader {
    /// Application data.
    pub const DATA: Self = Self(0x00);
    /// XIA transport header.
    pub const TRANSPORT: Self = Self(0x01);
    /// SCION routing header carried as an extension.
    pub const SCION: Self = Self(0x02);
    /// XIA control message protocol.
    pub const XCMP: Self = Self(0x3d);
    /// Terminates the extension header chain.
    pub const NO_NEXT: Self = Self(59);

    /// Returns true if no extension record follows.
    pub fn is_terminal(self) -> bool {
        self == Self::NO_NEXT
    }
}

impl From<u8> for NextHeader {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<NextHeader> for u8 {
    fn from(value: NextHeader) -> Self {
        value.0
    }
}

impl std::fmt::Display for NextHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::DATA => write!(f, "DATA"),
            Self::TRANSPORT => write!(f, "TRANSPORT"),
            Self::SCION => write!(f, "SCION"),
            Self::XCMP => write!(f, "XCMP"),
            Self::NO_NEXT => write!(f, "NO_NEXT"),
            Self(other) => write!(f, "{other}"),
        }
    }
}
