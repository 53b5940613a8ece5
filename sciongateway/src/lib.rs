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
//! XIA to SCION gateway daemon.
//!
//! The gateway listens on two UDP endpoints. The data endpoint receives XIA packets, splices a
//! SCION routing header into each of them, and optionally forwards the result to a next hop.
//! The control endpoint receives signed announcements of hosts that moved to a new attachment
//! point and records them in a [host directory][directory::HostDirectory] after checking
//! identity, signature, and freshness.

pub mod auth;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod directory;
pub mod dispatcher;
pub mod metrics;
