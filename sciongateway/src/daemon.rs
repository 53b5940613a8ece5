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
//! Daemon startup and process exit codes.

use std::time::Duration;

use anyhow::Context;
use observability::metrics::registry::MetricsRegistry;
use tracing::info;

use crate::{
    cli::Opts,
    config::GatewayConfig,
    dispatcher::{DispatchError, Dispatcher},
    metrics::GatewayMetrics,
};

/// Exit code for configuration and endpoint binding failures.
pub const EXIT_SETUP: u8 = 1;
/// Exit code for a failed readiness wait.
pub const EXIT_WAIT: u8 = 2;

const METRICS_REPORT_INTERVAL: Duration = Duration::from_secs(60);

impl DispatchError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Bind { .. } => EXIT_SETUP,
            Self::Wait(_) => EXIT_WAIT,
        }
    }
}

/// Process exit code for a failure while starting or running the gateway.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<DispatchError>()
        .map_or(EXIT_SETUP, DispatchError::exit_code)
}

/// Resolves the configuration, registers metrics in `registry`, and binds both endpoints.
pub async fn start(opts: &Opts, registry: MetricsRegistry) -> anyhow::Result<Dispatcher> {
    let config = GatewayConfig::from_opts(opts).context("invalid configuration")?;
    info!(
        data_sid = %config.data_sid.sid,
        data_sid_source = %config.data_sid.source,
        control_sid = %config.control_sid.sid,
        control_sid_source = %config.control_sid.source,
        local_ia = %config.local_ia,
        remote_ia = %config.remote_ia,
        "Configuration resolved"
    );

    let metrics = GatewayMetrics::new(&registry).context("failed to register metrics")?;
    let dispatcher = Dispatcher::bind(&config, metrics)
        .await
        .context("failed to bind gateway endpoints")?
        .with_metrics_report(registry, METRICS_REPORT_INTERVAL);
    Ok(dispatcher)
}
