//! Error types for the metrics receiver

use thiserror::Error;

/// Error returned by [`MetricsReceiver`](super::MetricsReceiver) operations
#[derive(Error, Debug)]
pub enum ReceiverError {
    /// Receiver constructed without a downstream consumer
    #[error("configuration error: nil next consumer")]
    NilNextConsumer,

    /// A resource batch could not be translated
    #[error("translation error: {0}")]
    Translation(#[from] TranslationError),

    /// The downstream consumer refused a translated batch
    #[error("downstream consumer error: {0}")]
    Downstream(#[from] ConsumerError),
}

/// Error produced while translating OTLP metrics into the internal model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    #[error("metric without a name")]
    EmptyMetricName,

    #[error("metric '{metric}' has a number data point without a value")]
    MissingValue { metric: String },

    #[error(
        "metric '{metric}' has {bucket_counts} bucket counts for {explicit_bounds} explicit bounds"
    )]
    InvalidHistogram {
        metric: String,
        bucket_counts: usize,
        explicit_bounds: usize,
    },
}

/// Error returned by a downstream [`MetricsConsumer`](super::MetricsConsumer)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumerError {
    /// Consumer can no longer accept data
    #[error("consumer closed")]
    Closed,

    /// Caller cancelled the request while the consumer was waiting
    #[error("request cancelled")]
    Cancelled,

    /// Consumer rejected the batch
    #[error("consumer rejected data: {0}")]
    Rejected(String),
}
