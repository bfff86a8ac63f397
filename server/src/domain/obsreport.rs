//! Receiver self-instrumentation
//!
//! Every forward to the downstream consumer is bounded by a receive
//! operation: a tracing span plus counters for accepted and refused points
//! and time series. Reporting is fire-and-forget; nothing here can fail the
//! operation being observed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use ::metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::Span;
use tracing::field::Empty;

use super::metrics::ConsumerError;

const ACCEPTED_POINTS: &str = "otelbridge_receiver_accepted_metric_points";
const REFUSED_POINTS: &str = "otelbridge_receiver_refused_metric_points";
const ACCEPTED_TIMESERIES: &str = "otelbridge_receiver_accepted_timeseries";
const REFUSED_TIMESERIES: &str = "otelbridge_receiver_refused_timeseries";
const RECEIVE_DURATION: &str = "otelbridge_receiver_receive_duration_seconds";

/// Per-request context handed in by the transport
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub peer_addr: Option<SocketAddr>,
    /// Cancelled when the caller gives up on the request
    pub cancellation: CancellationToken,
}

impl RequestContext {
    pub fn with_peer(peer_addr: Option<SocketAddr>) -> Self {
        Self {
            peer_addr,
            ..Default::default()
        }
    }
}

/// Request context tagged with the receiver identity.
///
/// Built once per export call and passed by reference down to the consumer.
#[derive(Debug, Clone)]
pub struct ReceiverContext {
    request: RequestContext,
    receiver: Arc<str>,
    transport: &'static str,
    signal: &'static str,
}

impl ReceiverContext {
    pub fn new(
        request: RequestContext,
        receiver: Arc<str>,
        transport: &'static str,
        signal: &'static str,
    ) -> Self {
        Self {
            request,
            receiver,
            transport,
            signal,
        }
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn transport(&self) -> &'static str {
        self.transport
    }

    pub fn signal(&self) -> &'static str {
        self.signal
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.request.peer_addr
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.request.cancellation
    }
}

/// An in-flight receive operation
#[derive(Debug)]
pub struct ReceiveOp {
    span: Span,
    receiver: Arc<str>,
    transport: &'static str,
    started: Instant,
}

impl ReceiveOp {
    /// Open the span for one forward to the next consumer
    pub fn begin(ctx: &ReceiverContext) -> Self {
        let span = tracing::info_span!(
            "receive_metrics",
            receiver = %ctx.receiver(),
            transport = ctx.transport(),
            format = Empty,
            points = Empty,
            series = Empty,
            outcome = Empty,
        );
        Self {
            span,
            receiver: ctx.receiver.clone(),
            transport: ctx.transport,
            started: Instant::now(),
        }
    }

    /// Span the downstream call runs in
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn transport(&self) -> &'static str {
        self.transport
    }
}

/// Start/end hooks around a downstream forward
pub trait ObsReporter: Send + Sync {
    fn start_metrics_receive_op(&self, ctx: &ReceiverContext) -> ReceiveOp;

    fn end_metrics_receive_op(
        &self,
        op: ReceiveOp,
        format: &'static str,
        num_points: usize,
        num_time_series: usize,
        err: Option<&ConsumerError>,
    );
}

/// Reports through `tracing` spans and the `metrics` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObsReporter;

impl ObsReporter for TracingObsReporter {
    fn start_metrics_receive_op(&self, ctx: &ReceiverContext) -> ReceiveOp {
        ReceiveOp::begin(ctx)
    }

    fn end_metrics_receive_op(
        &self,
        op: ReceiveOp,
        format: &'static str,
        num_points: usize,
        num_time_series: usize,
        err: Option<&ConsumerError>,
    ) {
        let ReceiveOp {
            span,
            receiver,
            transport,
            started,
        } = op;
        let labels = [
            ("receiver", receiver.to_string()),
            ("transport", transport.to_string()),
        ];

        let (points_counter, series_counter) = match err {
            None => (ACCEPTED_POINTS, ACCEPTED_TIMESERIES),
            Some(_) => (REFUSED_POINTS, REFUSED_TIMESERIES),
        };
        counter!(points_counter, &labels).increment(num_points as u64);
        counter!(series_counter, &labels).increment(num_time_series as u64);
        histogram!(RECEIVE_DURATION, &labels).record(started.elapsed().as_secs_f64());

        span.record("format", format);
        span.record("points", num_points);
        span.record("series", num_time_series);
        let _enter = span.enter();
        match err {
            None => {
                span.record("outcome", "success");
                tracing::debug!(
                    points = num_points,
                    series = num_time_series,
                    "Metrics accepted"
                );
            }
            Some(e) => {
                span.record("outcome", "failure");
                tracing::warn!(
                    error = %e,
                    points = num_points,
                    series = num_time_series,
                    "Metrics refused by next consumer"
                );
            }
        }
    }
}
