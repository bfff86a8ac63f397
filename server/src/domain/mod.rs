//! Domain logic for metrics ingestion
//!
//! - `metrics` - OTLP metrics receiver, translation and consumers
//! - `obsreport` - receiver self-instrumentation

pub mod metrics;
pub mod obsreport;

pub use metrics::MetricsReceiver;
pub use obsreport::{ReceiverContext, RequestContext};
