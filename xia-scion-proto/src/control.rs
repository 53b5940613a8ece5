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

//! Signed control messages announcing that a host moved to a new attachment point.
//!
//! A control datagram is an envelope of three length-prefixed fields:
//!
//! ```text
//! | len | inner message | len | signature | len | public key |
//! ```
//!
//! The inner message uses the same framing for the host identifier, the DAG of the new
//! attachment point, and a timestamp. Length prefixes are 16-bit big-endian; the timestamp is
//! an IEEE-754 double in big-endian order.

mod codec;
pub use codec::{FieldReader, LENGTH_PREFIX_SIZE, MAX_FIELD_LENGTH, pack};

mod message;
pub use message::{
    ATTACHMENT_DOMAIN_MARKER, ControlMessage, MAX_ATTACHMENT_DOMAIN_LENGTH, SignedControlMessage,
    attachment_domain,
};

/// Errors raised while decoding a control datagram.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ControlDecodeError {
    /// A length prefix declares more bytes than remain in the buffer.
    #[error("field declares {declared} bytes but only {remaining} remain")]
    TruncatedMessage {
        /// Bytes required by the length prefix or the prefix itself.
        declared: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },
    /// The timestamp field is not exactly 8 bytes.
    #[error("timestamp field has {0} bytes, expected 8")]
    InvalidTimestampLength(usize),
    /// The timestamp is NaN or infinite.
    #[error("timestamp is not a finite number")]
    InvalidTimestamp,
    /// A text field is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidText {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Errors raised while encoding a control datagram.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum ControlEncodeError {
    /// A field does not fit its 16-bit length prefix.
    #[error("field of {0} bytes exceeds the {MAX_FIELD_LENGTH} byte limit")]
    FieldTooLong(usize),
}
