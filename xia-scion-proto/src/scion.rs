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

//! The SCION routing header block carried inside XIA packets.
//!
//! The block consists of a [`CommonHeader`], an [`AddressHeader`] naming the source and
//! destination ISD-AD, and a [`RoutingPath`] of info and hop opaque fields. The path itself is
//! supplied by a [`PathBuilder`].

mod common_header;
pub use common_header::{AddressType, CommonHeader};

mod address_header;
pub use address_header::{AddressHeader, IsdAd, IsdAdParseError};

mod path;
pub use path::{
    HopField, InfoField, PathBuildError, PathBuilder, PathSegment, RoutingPath, StaticPathBuilder,
    pack_interfaces, unpack_interfaces,
};

mod headers;
pub use headers::{EncodeError, RoutingHeader};

/// SCION next-header value for UDP.
pub const L4_UDP: u8 = 17;
