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

//! The signed envelope and the announcement it carries.

use bytes::{BufMut, Bytes, BytesMut};
use ed25519_dalek::{Signer, SigningKey};

use super::{ControlDecodeError, ControlEncodeError, FieldReader, LENGTH_PREFIX_SIZE, pack};

/// Token that starts the attachment domain inside a DAG string.
pub const ATTACHMENT_DOMAIN_MARKER: &str = "AD:";

/// Longest attachment domain taken from a DAG string: the marker plus 40 hex digits.
pub const MAX_ATTACHMENT_DOMAIN_LENGTH: usize = ATTACHMENT_DOMAIN_MARKER.len() + 40;

const TIMESTAMP_SIZE: usize = size_of::<f64>();

/// Returns the attachment domain named in `dag`.
///
/// The domain is the substring starting at the first [`ATTACHMENT_DOMAIN_MARKER`], cut to at
/// most [`MAX_ATTACHMENT_DOMAIN_LENGTH`] bytes.
pub fn attachment_domain(dag: &str) -> Option<&str> {
    let start = dag.find(ATTACHMENT_DOMAIN_MARKER)?;
    let tail = &dag[start..];
    let mut end = tail.len().min(MAX_ATTACHMENT_DOMAIN_LENGTH);
    while !tail.is_char_boundary(end) {
        end -= 1;
    }
    Some(&tail[..end])
}

/// Announcement that a host is reachable through a new attachment point.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    /// Identifier of the announcing host, e.g. `HID:<40 hex digits>`.
    pub host_identifier: String,
    /// DAG of the host's new attachment point.
    pub attachment_dag: String,
    /// Time the announcement was issued. Must grow with every announcement of the same host.
    pub timestamp: f64,
}

impl ControlMessage {
    /// Decodes the inner message bytes of an envelope.
    pub fn decode(data: &[u8]) -> Result<Self, ControlDecodeError> {
        let mut reader = FieldReader::new(data);
        let host_identifier = text(reader.unpack()?, "host identifier")?;
        let attachment_dag = text(reader.unpack()?, "attachment DAG")?;

        let raw = reader.unpack()?;
        let raw: [u8; TIMESTAMP_SIZE] = raw
            .try_into()
            .map_err(|_| ControlDecodeError::InvalidTimestampLength(raw.len()))?;
        let timestamp = f64::from_be_bytes(raw);
        if !timestamp.is_finite() {
            return Err(ControlDecodeError::InvalidTimestamp);
        }

        Ok(Self {
            host_identifier,
            attachment_dag,
            timestamp,
        })
    }

    /// Encodes the message into the inner bytes of an envelope.
    pub fn encode(&self) -> Result<Bytes, ControlEncodeError> {
        let mut buffer = BytesMut::with_capacity(
            3 * LENGTH_PREFIX_SIZE
                + self.host_identifier.len()
                + self.attachment_dag.len()
                + TIMESTAMP_SIZE,
        );
        pack(&mut buffer, self.host_identifier.as_bytes())?;
        pack(&mut buffer, self.attachment_dag.as_bytes())?;
        buffer.put_u16(TIMESTAMP_SIZE as u16);
        buffer.put_f64(self.timestamp);
        Ok(buffer.freeze())
    }

    /// The attachment domain named in [`Self::attachment_dag`].
    pub fn attachment_domain(&self) -> Option<&str> {
        attachment_domain(&self.attachment_dag)
    }
}

fn text(field: &[u8], name: &'static str) -> Result<String, ControlDecodeError> {
    String::from_utf8(field.to_vec()).map_err(|_| ControlDecodeError::InvalidText { field: name })
}

/// Outer envelope of a control datagram.
///
/// The inner message is kept as raw bytes since the signature covers exactly those bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedControlMessage {
    /// Encoded [`ControlMessage`].
    pub message: Bytes,
    /// Signature over [`Self::message`].
    pub signature: Bytes,
    /// Public key of the announcing host.
    pub public_key: Bytes,
}

impl SignedControlMessage {
    /// Decodes the envelope fields of a datagram. Bytes after the third field are ignored.
    pub fn decode(datagram: &[u8]) -> Result<Self, ControlDecodeError> {
        let mut reader = FieldReader::new(datagram);
        let message = Bytes::copy_from_slice(reader.unpack()?);
        let signature = Bytes::copy_from_slice(reader.unpack()?);
        let public_key = Bytes::copy_from_slice(reader.unpack()?);
        Ok(Self {
            message,
            signature,
            public_key,
        })
    }

    /// Encodes the envelope into a datagram.
    pub fn encode(&self) -> Result<Bytes, ControlEncodeError> {
        let mut buffer = BytesMut::with_capacity(
            3 * LENGTH_PREFIX_SIZE + self.message.len() + self.signature.len() + self.public_key.len(),
        );
        pack(&mut buffer, &self.message)?;
        pack(&mut buffer, &self.signature)?;
        pack(&mut buffer, &self.public_key)?;
        Ok(buffer.freeze())
    }

    /// Encodes `message` and signs it with `key`.
    pub fn sign(message: &ControlMessage, key: &SigningKey) -> Result<Self, ControlEncodeError> {
        let message = message.encode()?;
        let signature = key.sign(&message);
        Ok(Self {
            message,
            signature: Bytes::copy_from_slice(&signature.to_bytes()),
            public_key: Bytes::copy_from_slice(key.verifying_key().as_bytes()),
        })
    }

    /// Decodes the inner message.
    pub fn inner(&self) -> Result<ControlMessage, ControlDecodeError> {
        ControlMessage::decode(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use test_log::test;

    use super::*;
    use crate::xia::Xid;

    const DAG: &str = "RE AD:1000000000000000000000000000000000000001 HID:2000000000000000000000000000000000000002";

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn announcement(key: &SigningKey, timestamp: f64) -> ControlMessage {
        ControlMessage {
            host_identifier: Xid::host_from_public_key(key.verifying_key().as_bytes()).to_string(),
            attachment_dag: DAG.to_string(),
            timestamp,
        }
    }

    #[test]
    fn inner_message_layout() {
        let message = ControlMessage {
            host_identifier: "HID:ab".into(),
            attachment_dag: "AD:cd".into(),
            timestamp: 1.5,
        };
        let encoded = message.encode().unwrap();

        let mut expected = vec![0x00, 0x06];
        expected.extend_from_slice(b"HID:ab");
        expected.extend_from_slice(&[0x00, 0x05]);
        expected.extend_from_slice(b"AD:cd");
        expected.extend_from_slice(&[0x00, 0x08]);
        expected.extend_from_slice(&1.5f64.to_be_bytes());
        assert_eq!(&encoded[..], &expected[..]);

        assert_eq!(ControlMessage::decode(&encoded), Ok(message));
    }

    #[test]
    fn signed_envelope_verifies() {
        let key = signing_key();
        let signed = SignedControlMessage::sign(&announcement(&key, 10.0), &key).unwrap();
        let datagram = signed.encode().unwrap();

        let decoded = SignedControlMessage::decode(&datagram).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.inner().unwrap(), announcement(&key, 10.0));

        let verifying_key = VerifyingKey::try_from(&decoded.public_key[..]).unwrap();
        let signature = Signature::from_slice(&decoded.signature).unwrap();
        assert!(verifying_key.verify(&decoded.message, &signature).is_ok());
    }

    #[test]
    fn truncated_envelope() {
        let key = signing_key();
        let datagram = SignedControlMessage::sign(&announcement(&key, 1.0), &key)
            .unwrap()
            .encode()
            .unwrap();
        let truncated = &datagram[..datagram.len() - 1];
        assert_eq!(
            SignedControlMessage::decode(truncated),
            Err(ControlDecodeError::TruncatedMessage {
                declared: 32,
                remaining: 31
            })
        );
    }

    #[test]
    fn timestamp_must_be_eight_bytes() {
        let mut inner = Vec::new();
        pack(&mut inner, b"HID:00").unwrap();
        pack(&mut inner, DAG.as_bytes()).unwrap();
        pack(&mut inner, &[0u8; 4]).unwrap();
        assert_eq!(
            ControlMessage::decode(&inner),
            Err(ControlDecodeError::InvalidTimestampLength(4))
        );
    }

    #[test]
    fn timestamp_must_be_finite() {
        let mut inner = Vec::new();
        pack(&mut inner, b"HID:00").unwrap();
        pack(&mut inner, DAG.as_bytes()).unwrap();
        pack(&mut inner, &f64::NAN.to_be_bytes()).unwrap();
        assert_eq!(
            ControlMessage::decode(&inner),
            Err(ControlDecodeError::InvalidTimestamp)
        );
    }

    #[test]
    fn host_identifier_must_be_text() {
        let mut inner = Vec::new();
        pack(&mut inner, &[0xff, 0xfe]).unwrap();
        pack(&mut inner, DAG.as_bytes()).unwrap();
        pack(&mut inner, &1.0f64.to_be_bytes()).unwrap();
        assert_eq!(
            ControlMessage::decode(&inner),
            Err(ControlDecodeError::InvalidText {
                field: "host identifier"
            })
        );
    }

    #[test]
    fn attachment_domain_extraction() {
        assert_eq!(
            attachment_domain(DAG),
            Some("AD:1000000000000000000000000000000000000001")
        );
        assert_eq!(attachment_domain("AD:short"), Some("AD:short"));
        assert_eq!(attachment_domain("HID:1234"), None);
        assert_eq!(attachment_domain(""), None);
    }
}
