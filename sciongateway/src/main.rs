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

use std::process::ExitCode;

use clap::Parser;
use observability::{metrics::registry::MetricsRegistry, setup_tracing, syslog_level};
use sciongateway::{
    cli::Opts,
    daemon::{EXIT_SETUP, exit_code, start},
};
use tracing::{Instrument, error, info_span};

fn main() -> ExitCode {
    let opts = Opts::parse();

    let _guards = match setup_tracing(
        opts.logging.log_dir.as_deref(),
        opts.logging.verbose,
        syslog_level(opts.logging.log_level),
    ) {
        Ok(guards) => guards,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            return ExitCode::from(EXIT_SETUP);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "Failed to start runtime");
            return ExitCode::from(EXIT_SETUP);
        }
    };

    let span = info_span!("gateway", hostname = %opts.hostname);
    runtime.block_on(run(opts).instrument(span))
}

async fn run(opts: Opts) -> ExitCode {
    let mut dispatcher = match start(&opts, MetricsRegistry::new_global()).await {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::from(exit_code(&err));
        }
    };

    match dispatcher.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "Gateway stopped");
            ExitCode::from(err.exit_code())
        }
    }
}
