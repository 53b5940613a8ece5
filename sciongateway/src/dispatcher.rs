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
//! Readiness loop over the data and control endpoints.
//!
//! Each iteration waits a bounded time for either endpoint to become readable. Afterwards at
//! most one control message and then at most one data packet are handled, so an attachment
//! point update received in the same iteration is applied before the data packet is forwarded.

use std::{
    io,
    net::SocketAddr,
    time::{Duration, Instant},
};

use bytes::BytesMut;
use observability::metrics::registry::MetricsRegistry;
use tokio::net::UdpSocket;
use tracing::{Level, debug, info, trace, warn};
use xia_scion_proto::{
    inject::{InjectError, Injection, MAX_DATA_PACKET_SIZE, ScionHeaderInjector},
    scion::{PathBuilder, StaticPathBuilder},
    xia::{XiaHeader, XiaHeaderLayout},
};

use crate::{
    auth::{AcceptedUpdate, AuthError, ControlMessageAuthenticator, Ed25519Verifier, SignatureVerifier},
    config::GatewayConfig,
    directory::HostDirectory,
    metrics::{GatewayMetrics, inject_error_reason},
};

/// Largest control datagram the gateway accepts.
pub const MAX_CONTROL_MESSAGE_SIZE: usize = u16::MAX as usize;

/// Errors that stop the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// An endpoint cannot be bound.
    #[error("failed to bind {plane} endpoint {address}: {source}")]
    Bind {
        /// `data` or `control`.
        plane: &'static str,
        /// The requested socket address.
        address: SocketAddr,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// Waiting for readiness failed.
    #[error("readiness wait failed: {0}")]
    Wait(#[source] io::Error),
}

/// What one iteration of the dispatcher handled.
#[derive(Debug, Default)]
pub struct Iteration {
    /// Outcome of the control message, if one was received.
    pub control: Option<Result<AcceptedUpdate, AuthError>>,
    /// Outcome of the data packet, if one was received.
    pub data: Option<Result<Injection, InjectError>>,
}

impl Iteration {
    /// Returns true if nothing was received.
    pub fn is_idle(&self) -> bool {
        self.control.is_none() && self.data.is_none()
    }
}

/// Drives the gateway from its two endpoints.
#[derive(Debug)]
pub struct Dispatcher<P = StaticPathBuilder, V = Ed25519Verifier> {
    control_socket: UdpSocket,
    data_socket: UdpSocket,
    injector: ScionHeaderInjector<P>,
    authenticator: ControlMessageAuthenticator<V>,
    directory: HostDirectory,
    control_buffer: Vec<u8>,
    data_buffer: BytesMut,
    forward_to: Option<SocketAddr>,
    poll_interval: Duration,
    metrics: GatewayMetrics,
    report: Option<MetricsReport>,
}

#[derive(Debug)]
struct MetricsReport {
    registry: MetricsRegistry,
    interval: Duration,
    last: Instant,
}

impl Dispatcher {
    /// Binds both endpoints of `config` and creates a dispatcher using the reference path and
    /// Ed25519 signatures.
    pub async fn bind(
        config: &GatewayConfig,
        metrics: GatewayMetrics,
    ) -> Result<Self, DispatchError> {
        let control_socket = bind_endpoint("control", config.control_bind).await?;
        let data_socket = bind_endpoint("data", config.data_bind).await?;
        let injector = ScionHeaderInjector::new(
            StaticPathBuilder::reference(),
            config.local_ia,
            config.remote_ia,
        )
        .with_position(config.splice);

        Ok(Self::new(
            control_socket,
            data_socket,
            injector,
            ControlMessageAuthenticator::new(Ed25519Verifier),
            metrics,
        )
        .with_forward_to(config.forward_to)
        .with_poll_interval(config.poll_interval))
    }
}

async fn bind_endpoint(plane: &'static str, address: SocketAddr) -> Result<UdpSocket, DispatchError> {
    UdpSocket::bind(address)
        .await
        .map_err(|source| {
            DispatchError::Bind {
                plane,
                address,
                source,
            }
        })
}

impl<P: PathBuilder, V: SignatureVerifier> Dispatcher<P, V> {
    /// Creates a dispatcher over already bound sockets.
    pub fn new(
        control_socket: UdpSocket,
        data_socket: UdpSocket,
        injector: ScionHeaderInjector<P>,
        authenticator: ControlMessageAuthenticator<V>,
        metrics: GatewayMetrics,
    ) -> Self {
        Self {
            control_socket,
            data_socket,
            injector,
            authenticator,
            directory: HostDirectory::new(),
            control_buffer: vec![0; MAX_CONTROL_MESSAGE_SIZE],
            data_buffer: BytesMut::zeroed(MAX_DATA_PACKET_SIZE),
            forward_to: None,
            poll_interval: Duration::from_millis(1),
            metrics,
            report: None,
        }
    }

    /// Sets the next hop of rewritten packets.
    pub fn with_forward_to(mut self, forward_to: Option<SocketAddr>) -> Self {
        self.forward_to = forward_to;
        self
    }

    /// Sets the upper bound of a single readiness wait.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Periodically logs the content of `registry` at debug level.
    pub fn with_metrics_report(mut self, registry: MetricsRegistry, interval: Duration) -> Self {
        self.report = Some(MetricsReport {
            registry,
            interval,
            last: Instant::now(),
        });
        self
    }

    /// Local address of the control endpoint.
    pub fn control_addr(&self) -> io::Result<SocketAddr> {
        self.control_socket.local_addr()
    }

    /// Local address of the data endpoint.
    pub fn data_addr(&self) -> io::Result<SocketAddr> {
        self.data_socket.local_addr()
    }

    /// The directory of accepted attachment point updates.
    pub fn directory(&self) -> &HostDirectory {
        &self.directory
    }

    /// Runs the dispatcher until waiting for readiness fails.
    pub async fn run(&mut self) -> Result<(), DispatchError> {
        info!(
            control = ?self.control_addr().ok(),
            data = ?self.data_addr().ok(),
            forward_to = ?self.forward_to,
            splice = ?self.injector.position(),
            "Dispatcher started"
        );
        loop {
            self.run_once().await?;
            self.report_metrics();
        }
    }

    /// Runs a single iteration: wait for readiness, then handle at most one control message
    /// followed by at most one data packet.
    pub async fn run_once(&mut self) -> Result<Iteration, DispatchError> {
        let ready = tokio::time::timeout(self.poll_interval, async {
            tokio::select! {
                biased;
                ready = self.control_socket.readable() => ready,
                ready = self.data_socket.readable() => ready,
            }
        })
        .await;
        match ready {
            Err(_elapsed) => return Ok(Iteration::default()),
            Ok(Err(e)) => return Err(DispatchError::Wait(e)),
            Ok(Ok(())) => {}
        }

        let control = self.poll_control();
        let data = self.poll_data();
        Ok(Iteration { control, data })
    }

    fn poll_control(&mut self) -> Option<Result<AcceptedUpdate, AuthError>> {
        let (length, peer) =
            try_receive(&self.control_socket, &mut self.control_buffer, "control")?;

        let outcome = self
            .authenticator
            .authenticate(&mut self.directory, &self.control_buffer[..length]);
        match &outcome {
            Ok(_) => {
                self.metrics.control_messages_accepted.inc();
                self.metrics
                    .known_hosts
                    .set(self.directory.len() as i64);
            }
            Err(err) => {
                self.metrics
                    .control_messages_rejected
                    .with_label_values(&[err.reason()])
                    .inc();
                warn!(%peer, %err, "Rejected control message");
            }
        }
        Some(outcome)
    }

    fn poll_data(&mut self) -> Option<Result<Injection, InjectError>> {
        // The buffer keeps its allocation; only the tail left by the previous packet is refilled.
        let packet = &mut self.data_buffer;
        packet.resize(MAX_DATA_PACKET_SIZE, 0);
        let (length, peer) = try_receive(&self.data_socket, packet, "data")?;
        packet.truncate(length);
        self.metrics.data_packets_received.inc();

        if tracing::enabled!(Level::DEBUG) {
            log_base_header(packet);
        }
        let injection = match self.injector.process(packet) {
            Ok(injection) => injection,
            Err(err) => {
                self.metrics.drop_packet(inject_error_reason(&err));
                debug!(%peer, %err, "Dropped data packet");
                return Some(Err(err));
            }
        };
        packet[XiaHeaderLayout::LAST] = XiaHeader::LAST_UNSET as u8;
        self.metrics.data_packets_injected.inc();

        let segment = injection.offset..injection.offset + usize::from(injection.length);
        trace!(
            %peer,
            offset = injection.offset,
            segment = %hex::encode(&packet[segment]),
            "Injected routing header"
        );
        if tracing::enabled!(Level::DEBUG) {
            log_base_header(packet);
        }

        if let Some(next_hop) = self.forward_to {
            match self.data_socket.try_send_to(packet, next_hop) {
                Ok(_) => self.metrics.data_packets_forwarded.inc(),
                Err(err) => {
                    self.metrics.drop_packet("send_failed");
                    warn!(%next_hop, %err, "Failed to forward packet");
                }
            }
        }
        Some(Ok(injection))
    }

    fn report_metrics(&mut self) {
        let Some(report) = &mut self.report else {
            return;
        };
        if report.last.elapsed() < report.interval {
            return;
        }
        report.last = Instant::now();
        match report.registry.render() {
            Ok(text) => debug!(metrics = %text, "Metrics report"),
            Err(err) => warn!(%err, "Failed to render metrics"),
        }
    }
}

/// Receives one datagram if one is pending.
fn try_receive(
    socket: &UdpSocket,
    buffer: &mut [u8],
    plane: &'static str,
) -> Option<(usize, SocketAddr)> {
    match socket.try_recv_from(buffer) {
        Ok(received) => Some(received),
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => None,
        Err(err) => {
            warn!(plane, %err, "Failed to receive datagram");
            None
        }
    }
}

fn log_base_header(packet: &[u8]) {
    match XiaHeader::decode(packet) {
        Ok(header) => {
            let nodes = header
                .nodes
                .iter()
                .map(|node| node.xid.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            debug!(
                version = header.version,
                next_header = %header.next_header,
                payload_length = header.payload_length,
                hop_limit = header.hop_limit,
                destination_nodes = header.destination_nodes,
                source_nodes = header.source_nodes,
                last = header.last,
                %nodes,
                "XIA base header"
            );
        }
        Err(err) => debug!(%err, length = packet.len(), "Undecodable XIA base header"),
    }
}
