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
//! Known hosts and their current attachment points.

use std::collections::HashMap;

use xia_scion_proto::xia::Xid;

/// Attachment point of a host and the timestamp of the announcement that set it.
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecord {
    /// Attachment domain, e.g. `AD:<40 hex digits>`.
    pub attachment_domain: String,
    /// Timestamp of the last accepted announcement.
    pub timestamp: f64,
}

/// Directory of hosts that announced their attachment point.
///
/// Owned by the dispatcher and never shared, so it needs no synchronization.
#[derive(Debug, Default)]
pub struct HostDirectory {
    hosts: HashMap<Xid, HostRecord>,
}

impl HostDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record of `host`.
    pub fn get(&self, host: &Xid) -> Option<&HostRecord> {
        self.hosts.get(host)
    }

    /// Timestamp of the last accepted announcement of `host`.
    pub fn last_timestamp(&self, host: &Xid) -> Option<f64> {
        self.hosts.get(host).map(|record| record.timestamp)
    }

    /// Inserts or replaces the record of `host`, returning the previous one.
    pub fn upsert(&mut self, host: Xid, record: HostRecord) -> Option<HostRecord> {
        self.hosts.insert(host, record)
    }

    /// Number of known hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if no host is known.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
