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
//! Prometheus metric registry.

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder, core::Collector,
};

/// Register and collect metrics of one or more components.
///
/// ## Designated use case
///
/// When initializing a component, the caller is responsible to build the component's metrics based
/// on the desired `MetricsRegistry`. The component specific metrics uses the provided
/// `MetricsRegistry` to register its metrics. This approach allows the caller to control the
/// metrics namespace and ensures consistent metric naming across the application.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    registry: prometheus::Registry,
}

impl MetricsRegistry {
    /// Use prometheus' default registry and register process metrics. As a
    /// result, this registry will 'point' to the global registry.
    pub fn new_global() -> Self {
        let registry = prometheus::default_registry().clone();

        #[cfg(target_os = "linux")]
        registry
            .register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))
            // As we are dealing with global state here, another instance of
            // `MetricsRegistry` might already have registered the process
            // collector => don't panic.
            .ok();

        Self::new_with_registry(registry)
    }

    /// Create a new metrics registry with the given prometheus registry.
    pub fn new_with_registry(registry: prometheus::Registry) -> Self {
        Self { registry }
    }

    /// Create a new metrics registry with no collectors pre-registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register an `IntGauge`.
    pub fn int_gauge<S: Into<String>>(&self, name: S, help: S) -> prometheus::Result<IntGauge> {
        self.register_collector(IntGauge::new(name, help)?)
    }

    /// Create and register an `IntCounter`.
    pub fn int_counter<S: Into<String>>(&self, name: S, help: S) -> prometheus::Result<IntCounter> {
        self.register_collector(IntCounter::new(name, help)?)
    }

    /// Create and register an `IntCounterVec`.
    pub fn int_counter_vec<S: Into<String>>(
        &self,
        name: S,
        help: S,
        label_names: &[&str],
    ) -> prometheus::Result<IntCounterVec> {
        self.register_collector(IntCounterVec::new(Opts::new(name, help), label_names)?)
    }

    /// Render all registered metrics in the prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn register_collector<C: 'static + Collector + Clone>(&self, c: C) -> prometheus::Result<C> {
        self.registry.register(Box::new(C::clone(&c)))?;
        Ok(c)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        let registry = prometheus::Registry::new();
        Self { registry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_metrics_are_rendered() {
        let registry = MetricsRegistry::new();
        let counter = registry
            .int_counter_vec("dropped_total", "Dropped things.", &["reason"])
            .unwrap();
        counter.with_label_values(&["too_large"]).inc_by(3);
        registry.int_gauge("entries", "Entries.").unwrap().set(2);

        let text = registry.render().unwrap();
        assert!(text.contains("dropped_total{reason=\"too_large\"} 3"));
        assert!(text.contains("entries 2"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = MetricsRegistry::new();
        registry.int_counter("packets_total", "Packets.").unwrap();
        assert!(registry.int_counter("packets_total", "Packets.").is_err());
    }
}
