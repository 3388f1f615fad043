//! Round-robin delivery scheduler.
//!
//! Endpoints are swept in configuration order, one attempt at a time. After
//! every attempt the scheduler waits the endpoint's throttle interval, then
//! checks whether the run target is reached. Failed attempts are logged and
//! counted, never retried, and never stop the run.

use std::sync::Arc;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DeliveryError;
use crate::naming;
use crate::profile::EndpointProfile;
use crate::transport::{self, Transport};

/// How many attempts to perform before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTarget {
    /// Stop after this many attempts. Zero or negative performs none.
    Count(i64),
    /// Keep sweeping until cancelled.
    Unbounded,
}

impl RunTarget {
    fn is_reached(&self, attempts: u64) -> bool {
        match *self {
            Self::Count(target) => target <= 0 || attempts >= target as u64,
            Self::Unbounded => false,
        }
    }
}

/// Successful and total attempt counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryCounters {
    pub successful: u64,
    pub total: u64,
}

impl DeliveryCounters {
    pub fn failed(&self) -> u64 {
        self.total - self.successful
    }

    fn record(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.successful += 1;
        }
    }
}

/// Counters for a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTally {
    pub name: String,
    pub counters: DeliveryCounters,
}

/// Result of a scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub counters: DeliveryCounters,
    /// Per-endpoint counters, in configuration order.
    pub endpoints: Vec<EndpointTally>,
    /// Whether the run stopped on cancellation rather than on its target.
    pub cancelled: bool,
}

impl DeliveryReport {
    fn new(endpoints: &[EndpointProfile]) -> Self {
        Self {
            counters: DeliveryCounters::default(),
            endpoints: endpoints
                .iter()
                .map(|p| EndpointTally {
                    name: p.name.clone(),
                    counters: DeliveryCounters::default(),
                })
                .collect(),
            cancelled: false,
        }
    }

    fn record(&mut self, index: usize, success: bool) {
        self.counters.record(success);
        self.endpoints[index].counters.record(success);
    }
}

/// Drives deliveries across all configured endpoints.
pub struct DeliveryScheduler {
    endpoints: Arc<[EndpointProfile]>,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl DeliveryScheduler {
    pub fn new(endpoints: Vec<EndpointProfile>, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoints: endpoints.into(),
            transport,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run once `token` is cancelled. An in-flight attempt always
    /// completes and is counted.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn endpoints(&self) -> &[EndpointProfile] {
        &self.endpoints
    }

    /// Sweep the endpoints until `target` is reached or the run is cancelled.
    pub async fn run(&self, target: RunTarget) -> DeliveryReport {
        let mut report = DeliveryReport::new(&self.endpoints);
        if self.endpoints.is_empty() {
            warn!("No endpoints configured, nothing to deliver");
            return report;
        }
        if target.is_reached(0) {
            return report;
        }

        'sweep: loop {
            for index in 0..self.endpoints.len() {
                if self.cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'sweep;
                }

                let success = self.attempt(index).await;
                report.record(index, success);

                let profile = &self.endpoints[index];
                let delay = profile.throttle.duration();
                debug!(endpoint = %profile.name, ?delay, "Throttling");
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        report.cancelled = true;
                        break 'sweep;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                if target.is_reached(report.counters.total) {
                    break 'sweep;
                }
            }
        }

        if report.cancelled {
            info!(
                successful = report.counters.successful,
                total = report.counters.total,
                "Run cancelled"
            );
        }
        report
    }

    async fn attempt(&self, index: usize) -> bool {
        let profile = &self.endpoints[index];
        let remote_path = naming::synthesize(profile, &Local::now());
        info!(endpoint = %profile.name, file = %remote_path, "Uploading target file");

        let endpoints = Arc::clone(&self.endpoints);
        let transport = Arc::clone(&self.transport);
        let path = remote_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            transport::deliver(transport.as_ref(), &endpoints[index], &path)
        })
        .await
        .unwrap_or_else(|e| {
            Err(DeliveryError::Aborted {
                reason: e.to_string(),
            })
        });

        match result {
            Ok(outcome) => {
                info!(
                    endpoint = %profile.name,
                    file = %outcome.remote_path,
                    size = outcome.bytes,
                    "Successfully uploaded file"
                );
                true
            }
            Err(e) => {
                error!(
                    endpoint = %profile.name,
                    host = %profile.address(),
                    file = %remote_path,
                    error = %e,
                    "Delivery failed"
                );
                false
            }
        }
    }
}
