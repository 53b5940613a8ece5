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
//! Gateway configuration.

use std::{
    fmt,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use xia_scion_proto::{
    inject::SplicePosition,
    scion::IsdAd,
    xia::{Xid, XidType},
};

use crate::cli::Opts;

const SID_MARKER: &str = "SID:";

/// Published DAGs of the gateway services as stored in the resolver file.
#[derive(Default, Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// DAG of the data plane service.
    #[serde(default)]
    pub scion_dag: Option<String>,
    /// DAG of the control plane service.
    #[serde(default)]
    pub rendezvous_control_dag: Option<String>,
}

impl ResolverConfig {
    /// Reads the resolver file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read resolver config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid resolver config {}", path.display()))
    }
}

/// Origin of a service identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidSource {
    /// Given on the command line.
    CommandLine,
    /// Taken from the resolver file.
    ResolverConfig(PathBuf),
    /// Generated for the lifetime of the process.
    Generated,
}

impl fmt::Display for SidSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandLine => write!(f, "command line"),
            Self::ResolverConfig(path) => write!(f, "resolver config {}", path.display()),
            Self::Generated => write!(f, "generated"),
        }
    }
}

/// A service identifier and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceId {
    /// The `SID` identifier.
    pub sid: Xid,
    /// Origin of the identifier.
    pub source: SidSource,
}

impl ServiceId {
    /// Generates a random service identifier.
    pub fn generate() -> Self {
        Self {
            sid: Xid::new(XidType::SID, rand::random()),
            source: SidSource::Generated,
        }
    }
}

/// Parses a service identifier of the form `SID:<40 hex digits>`.
pub fn parse_sid(text: &str) -> anyhow::Result<Xid> {
    let xid: Xid = text
        .parse()
        .with_context(|| format!("invalid service identifier {text:?}"))?;
    if xid.xid_type != XidType::SID {
        bail!("{text:?} is not a service identifier");
    }
    Ok(xid)
}

/// Extracts the service identifier from a published DAG string.
pub fn sid_from_dag(dag: &str) -> anyhow::Result<Xid> {
    let start = dag
        .find(SID_MARKER)
        .with_context(|| format!("no service identifier in DAG {dag:?}"))?;
    let end = start + SID_MARKER.len() + 2 * Xid::ID_LENGTH;
    let sid = dag
        .get(start..end)
        .with_context(|| format!("truncated service identifier in DAG {dag:?}"))?;
    parse_sid(sid)
}

/// Fully resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Name of this gateway instance.
    pub hostname: String,
    /// Service identifier of the data plane.
    pub data_sid: ServiceId,
    /// Service identifier of the control plane.
    pub control_sid: ServiceId,
    /// Socket address of the data plane endpoint.
    pub data_bind: SocketAddr,
    /// Socket address of the control plane endpoint.
    pub control_bind: SocketAddr,
    /// Next hop for rewritten packets.
    pub forward_to: Option<SocketAddr>,
    /// Source domain of the routing header.
    pub local_ia: IsdAd,
    /// Destination domain of the routing header.
    pub remote_ia: IsdAd,
    /// Where the routing header is inserted.
    pub splice: SplicePosition,
    /// Upper bound of a single readiness wait.
    pub poll_interval: Duration,
}

impl GatewayConfig {
    /// Resolves the configuration from the command line and the optional resolver file.
    ///
    /// Each service identifier is taken from the command line, then from the resolver file, and
    /// is generated otherwise.
    pub fn from_opts(opts: &Opts) -> anyhow::Result<Self> {
        let resolver = opts
            .resolver_config
            .as_deref()
            .map(|path| ResolverConfig::load(path).map(|config| (path.to_path_buf(), config)))
            .transpose()?;

        let data_sid = resolve_sid(
            opts.data_sid.as_deref(),
            resolver
                .as_ref()
                .and_then(|(path, config)| Some((path, config.scion_dag.as_deref()?))),
        )
        .context("failed to resolve the data plane SID")?;
        let control_sid = resolve_sid(
            opts.control_sid.as_deref(),
            resolver.as_ref().and_then(|(path, config)| {
                Some((path, config.rendezvous_control_dag.as_deref()?))
            }),
        )
        .context("failed to resolve the control plane SID")?;

        Ok(Self {
            hostname: opts.hostname.clone(),
            data_sid,
            control_sid,
            data_bind: opts.data_bind,
            control_bind: opts.control_bind,
            forward_to: opts.forward_to,
            local_ia: opts.local_ia,
            remote_ia: opts.remote_ia,
            splice: opts.splice.into(),
            poll_interval: Duration::from_millis(opts.poll_interval_ms),
        })
    }
}

fn resolve_sid(
    command_line: Option<&str>,
    published: Option<(&PathBuf, &str)>,
) -> anyhow::Result<ServiceId> {
    if let Some(text) = command_line {
        return Ok(ServiceId {
            sid: parse_sid(text)?,
            source: SidSource::CommandLine,
        });
    }
    if let Some((path, dag)) = published {
        return Ok(ServiceId {
            sid: sid_from_dag(dag)?,
            source: SidSource::ResolverConfig(path.clone()),
        });
    }
    Ok(ServiceId::generate())
}
