//! Metrics ingestion
//!
//! Receives OTLP metrics, translates each resource batch into the internal
//! model and forwards it to the next consumer.

pub mod consumer;
pub mod error;
pub mod model;
pub mod receiver;
pub mod translate;

pub use consumer::{ChannelConsumer, LoggingConsumer, MetricsConsumer, Verbosity};
pub use error::{ConsumerError, ReceiverError, TranslationError};
pub use model::MetricsData;
pub use receiver::MetricsReceiver;
pub use translate::{OtlpTranslator, Translator};
