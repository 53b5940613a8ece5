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
//! Gateway metrics.

use observability::metrics::registry::MetricsRegistry;
use prometheus::{IntCounter, IntCounterVec, IntGauge};
use xia_scion_proto::inject::{InjectError, PacketTooLarge};

/// Gateway metrics.
#[derive(Debug, Clone)]
pub struct GatewayMetrics {
    // data plane:
    /// Total number of datagrams received on the data endpoint.
    pub data_packets_received: IntCounter,
    /// Total number of packets a routing header was injected into.
    pub data_packets_injected: IntCounter,
    /// Total number of rewritten packets sent to the next hop.
    pub data_packets_forwarded: IntCounter,
    /// Total number of dropped data packets by reason.
    pub data_packets_dropped: IntCounterVec,
    // control plane:
    /// Total number of accepted control messages.
    pub control_messages_accepted: IntCounter,
    /// Total number of rejected control messages by reason.
    pub control_messages_rejected: IntCounterVec,
    /// Number of hosts in the host directory.
    pub known_hosts: IntGauge,
}

impl GatewayMetrics {
    /// Create new gateway metrics instance with the given registry.
    pub fn new(metrics_registry: &MetricsRegistry) -> prometheus::Result<Self> {
        Ok(GatewayMetrics {
            data_packets_received: metrics_registry.int_counter(
                "xia_gw_data_packets_received_total",
                "Total number of datagrams received on the data endpoint.",
            )?,
            data_packets_injected: metrics_registry.int_counter(
                "xia_gw_data_packets_injected_total",
                "Total number of packets a SCION routing header was injected into.",
            )?,
            data_packets_forwarded: metrics_registry.int_counter(
                "xia_gw_data_packets_forwarded_total",
                "Total number of rewritten packets sent to the next hop.",
            )?,
            data_packets_dropped: metrics_registry.int_counter_vec(
                "xia_gw_data_packets_dropped_total",
                "Total number of dropped data packets.",
                &["reason"],
            )?,
            control_messages_accepted: metrics_registry.int_counter(
                "xia_gw_control_messages_accepted_total",
                "Total number of accepted control messages.",
            )?,
            control_messages_rejected: metrics_registry.int_counter_vec(
                "xia_gw_control_messages_rejected_total",
                "Total number of rejected control messages.",
                &["reason"],
            )?,
            known_hosts: metrics_registry.int_gauge(
                "xia_gw_known_hosts",
                "Number of hosts in the host directory.",
            )?,
        })
    }

    /// Counts a dropped data packet.
    pub fn drop_packet(&self, reason: &str) {
        self.data_packets_dropped.with_label_values(&[reason]).inc();
    }
}

/// Short label of an injection failure.
pub fn inject_error_reason(error: &InjectError) -> &'static str {
    match error {
        InjectError::InvalidBaseHeader(_) => "invalid_base_header",
        InjectError::MalformedHeaderChain(_) => "malformed_header_chain",
        InjectError::PacketTooLarge(PacketTooLarge::ExtensionTooLong { .. }) => {
            "extension_too_long"
        }
        InjectError::PacketTooLarge(_) => "packet_too_large",
        InjectError::NoPath(_) => "no_path",
    }
}
