//! Downstream consumers of translated metrics

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::error::ConsumerError;
use super::model::MetricsData;
use crate::domain::obsreport::ReceiverContext;

/// Next stage of the pipeline.
///
/// Called concurrently from every in-flight export; implementations must not
/// assume exclusive access.
#[async_trait]
pub trait MetricsConsumer: Send + Sync {
    async fn consume_metrics_data(
        &self,
        ctx: &ReceiverContext,
        data: MetricsData,
    ) -> Result<(), ConsumerError>;
}

/// How much the logging consumer writes per batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Basic,
    Detailed,
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Basic => write!(f, "basic"),
            Verbosity::Detailed => write!(f, "detailed"),
        }
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Verbosity::Basic),
            "detailed" => Ok(Verbosity::Detailed),
            _ => Err(format!(
                "Invalid verbosity '{}'. Valid options: basic, detailed",
                s
            )),
        }
    }
}

/// Writes a summary of every batch to the log
#[derive(Debug, Clone, Default)]
pub struct LoggingConsumer {
    verbosity: Verbosity,
}

impl LoggingConsumer {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

#[async_trait]
impl MetricsConsumer for LoggingConsumer {
    async fn consume_metrics_data(
        &self,
        ctx: &ReceiverContext,
        data: MetricsData,
    ) -> Result<(), ConsumerError> {
        let (series, points) = data.counts();
        let peer = ctx
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        tracing::info!(
            receiver = ctx.receiver(),
            signal = ctx.signal(),
            %peer,
            service = data.resource.service_name().unwrap_or("unknown"),
            metrics = data.metrics.len(),
            series,
            points,
            "Received metrics"
        );

        if self.verbosity == Verbosity::Detailed {
            for metric in &data.metrics {
                tracing::debug!(
                    name = %metric.descriptor.name,
                    kind = metric.descriptor.kind.as_str(),
                    temporality = metric
                        .descriptor
                        .kind
                        .temporality()
                        .map(|t| t.as_str())
                        .unwrap_or(""),
                    unit = metric.descriptor.unit.as_deref().unwrap_or(""),
                    scope = metric.scope.as_ref().map(|s| s.name.as_str()).unwrap_or(""),
                    series = metric.timeseries.len(),
                    "Metric"
                );
            }
        }
        Ok(())
    }
}

/// Hands batches to an embedding application over a bounded channel.
///
/// Waits for channel capacity; gives up when the request is cancelled.
#[derive(Debug, Clone)]
pub struct ChannelConsumer {
    tx: mpsc::Sender<MetricsData>,
}

impl ChannelConsumer {
    pub fn new(tx: mpsc::Sender<MetricsData>) -> Self {
        Self { tx }
    }

    /// Create a consumer together with the receiving end of its channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MetricsData>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl MetricsConsumer for ChannelConsumer {
    async fn consume_metrics_data(
        &self,
        ctx: &ReceiverContext,
        data: MetricsData,
    ) -> Result<(), ConsumerError> {
        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(ConsumerError::Cancelled),
            result = self.tx.send(data) => result.map_err(|_| ConsumerError::Closed),
        }
    }
}
