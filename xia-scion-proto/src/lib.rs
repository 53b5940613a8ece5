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

//! Protocol-level types for a gateway between the XIA overlay and SCION
//!
//! [XIA][xia] packets carry a DAG of typed identifiers (XIDs) followed by a chain of
//! self-describing extension headers. A SCION-aware gateway rewrites such packets so that they
//! carry an explicit [SCION][scion-net] forwarding path as an additional extension header.
//!
//! This crate provides:
//!
//! - the [XIA base header and extension chain][xia], including a bounds-checked chain walker;
//! - the [SCION routing header block][scion] (common header, address header, and path) and the
//!   [`PathBuilder`][scion::PathBuilder] seam that supplies forwarding paths;
//! - the [header injector][inject] which splices the routing header into an XIA packet without
//!   breaking the extension chain; and
//! - the [control message codec][control] for signed "host identifier moved" announcements.
//!
//! This crate does not perform any I/O. See the `sciongateway` crate for the daemon that drives
//! these types from sockets.
//!
//! [xia]: https://www.cs.cmu.edu/~xia/
//! [scion-net]: https://scion-architecture.net/

pub mod control;
pub mod inject;
pub mod scion;
pub mod wire_encoding;
pub mod xia;

#[cfg(test)]
pub(crate) mod test_utils;
