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

//! XIA identifiers.

use std::{fmt, str::FromStr};

use sha2::{Digest, Sha256};

/// The principal type of an [`Xid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XidType(pub u32);

impl XidType {
    /// Administrative domain.
    pub const AD: Self = Self(0x10);
    /// Host.
    pub const HID: Self = Self(0x11);
    /// Content.
    pub const CID: Self = Self(0x12);
    /// Service.
    pub const SID: Self = Self(0x13);
    /// IPv4 fallback.
    pub const IP: Self = Self(0x14);
    /// Node whose packet carries an explicit SCION path.
    pub const SCION: Self = Self(0x16);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::AD, "AD"),
        (Self::HID, "HID"),
        (Self::CID, "CID"),
        (Self::SID, "SID"),
        (Self::IP, "4ID"),
        (Self::SCION, "SCION"),
    ];

    /// Returns the textual prefix of this type, if it is a known type.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find_map(|(ty, name)| (*ty == self).then_some(*name))
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find_map(|(ty, known)| (*known == name).then_some(*ty))
    }
}

impl fmt::Display for XidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// A typed 160-bit XIA identifier, written as `TYPE:<40 hex digits>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Xid {
    /// The principal type.
    pub xid_type: XidType,
    /// The opaque identifier.
    pub id: [u8; Xid::ID_LENGTH],
}

impl Xid {
    /// Length of the opaque identifier in bytes.
    pub const ID_LENGTH: usize = 20;

    /// Creates a new identifier.
    pub const fn new(xid_type: XidType, id: [u8; Self::ID_LENGTH]) -> Self {
        Self { xid_type, id }
    }

    /// Derives the host identifier owned by `public_key`.
    ///
    /// The identifier is the first 20 bytes of the SHA-256 digest of the key bytes.
    pub fn host_from_public_key(public_key: &[u8]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut id = [0u8; Self::ID_LENGTH];
        id.copy_from_slice(&digest[..Self::ID_LENGTH]);
        Self::new(XidType::HID, id)
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.xid_type, hex::encode(self.id))
    }
}

/// Error parsing an [`Xid`] from text.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum XidParseError {
    /// The `TYPE:` prefix is missing.
    #[error("missing type prefix")]
    MissingPrefix,
    /// The type prefix is not a known XID type.
    #[error("unknown XID type {0:?}")]
    UnknownType(String),
    /// The identifier is not 40 hex digits.
    #[error("identifier is not {} hex digits", Xid::ID_LENGTH * 2)]
    InvalidIdentifier,
}

impl FromStr for Xid {
    type Err = XidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, digits) = s.split_once(':').ok_or(XidParseError::MissingPrefix)?;
        let xid_type = XidType::from_name(prefix)
            .ok_or_else(|| XidParseError::UnknownType(prefix.to_string()))?;
        let mut id = [0u8; Self::ID_LENGTH];
        hex::decode_to_slice(digits, &mut id).map_err(|_| XidParseError::InvalidIdentifier)?;
        Ok(Self::new(xid_type, id))
    }
}
