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
//! Gateway CLI options.

use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, ValueEnum};
use observability::DEFAULT_SYSLOG_LEVEL;
use xia_scion_proto::{inject::SplicePosition, scion::IsdAd};

/// Default poll interval of the readiness wait in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;

/// XIA to SCION gateway
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Opts {
    /// Name of this gateway instance.
    #[arg(long, default_value = "host0")]
    pub hostname: String,

    /// Service identifier of the data plane (`SID:<40 hex digits>`).
    #[arg(short = 'd', long)]
    pub data_sid: Option<String>,

    /// Service identifier of the control plane (`SID:<40 hex digits>`).
    #[arg(short = 'c', long)]
    pub control_sid: Option<String>,

    /// JSON file holding the published DAGs of the gateway services.
    #[arg(long)]
    pub resolver_config: Option<PathBuf>,

    /// Socket address of the data plane endpoint.
    #[arg(long, default_value = "127.0.0.1:0")]
    pub data_bind: SocketAddr,

    /// Socket address of the control plane endpoint.
    #[arg(long, default_value = "127.0.0.1:0")]
    pub control_bind: SocketAddr,

    /// Next hop that receives rewritten packets. Packets are only logged if unset.
    #[arg(long)]
    pub forward_to: Option<SocketAddr>,

    /// ISD-AD of this gateway, used as source of the routing header.
    #[arg(long, default_value = "0-0")]
    pub local_ia: IsdAd,

    /// ISD-AD of the destination domain.
    #[arg(long, default_value = "1-1")]
    pub remote_ia: IsdAd,

    /// Where the routing header is inserted into the extension chain.
    #[arg(long, value_enum, default_value_t = Splice::ChainEnd)]
    pub splice: Splice,

    /// Upper bound of a single readiness wait in milliseconds.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// Logging options
    #[command(flatten)]
    pub logging: LoggingOptions,
}

/// Logging options.
#[derive(Debug, Args)]
pub struct LoggingOptions {
    /// Syslog severity to log at, from 0 (emergency) to 7 (debug).
    #[arg(short = 'l', long, default_value_t = DEFAULT_SYSLOG_LEVEL, value_parser = clap::value_parser!(u8).range(0..=7))]
    pub log_level: u8,

    /// Log to stderr at the chosen level. Without it only errors are printed.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Directory for the gateway log.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// Splice position as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Splice {
    /// After the last extension header.
    ChainEnd,
    /// Directly after the base header.
    AfterBaseHeader,
}

impl From<Splice> for SplicePosition {
    fn from(value: Splice) -> Self {
        match value {
            Splice::ChainEnd => SplicePosition::ChainEnd,
            Splice::AfterBaseHeader => SplicePosition::AfterBaseHeader,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use test_log::test;

    use super::*;

    #[test]
    fn command_is_consistent() {
        Opts::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let opts = Opts::try_parse_from(["sciongateway"]).unwrap();
        assert_eq!(opts.hostname, "host0");
        assert_eq!(opts.local_ia, IsdAd::new(0, 0));
        assert_eq!(opts.remote_ia, IsdAd::new(1, 1));
        assert_eq!(opts.splice, Splice::ChainEnd);
        assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(opts.logging.log_level, DEFAULT_SYSLOG_LEVEL);
        assert!(!opts.logging.verbose);
        assert!(opts.forward_to.is_none());
    }

    #[test]
    fn short_flags() {
        let opts = Opts::try_parse_from([
            "sciongateway",
            "-v",
            "-l",
            "7",
            "-d",
            "SID:0000000000000000000000000000000000000001",
            "--splice",
            "after-base-header",
            "--remote-ia",
            "2-42",
        ])
        .unwrap();
        assert!(opts.logging.verbose);
        assert_eq!(opts.logging.log_level, 7);
        assert_eq!(
            opts.data_sid.as_deref(),
            Some("SID:0000000000000000000000000000000000000001")
        );
        assert_eq!(opts.splice, Splice::AfterBaseHeader);
        assert_eq!(opts.remote_ia, IsdAd::new(2, 42));
    }

    #[test]
    fn log_level_is_bounded() {
        assert!(Opts::try_parse_from(["sciongateway", "-l", "8"]).is_err());
        assert!(Opts::try_parse_from(["sciongateway", "--poll-interval-ms", "0"]).is_err());
    }
}
