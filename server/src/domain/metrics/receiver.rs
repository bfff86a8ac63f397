//! OTLP metrics receiver
//!
//! Converts each `ResourceMetrics` of an export request into [`MetricsData`]
//! and forwards it to the next consumer. The first failure aborts the whole
//! request; entries after it are not processed.

use std::sync::Arc;

use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use tracing::Instrument;

use super::consumer::MetricsConsumer;
use super::error::{ConsumerError, ReceiverError};
use super::model::MetricsData;
use super::translate::{OtlpTranslator, Translator};
use crate::domain::obsreport::{ObsReporter, ReceiverContext, RequestContext, TracingObsReporter};

/// Data format tag recorded on every receive operation
const DATA_FORMAT_PROTOBUF: &str = "protobuf";

/// Signal tag attached to the receiver context
const RECEIVER_TAG_VALUE: &str = "otlp_metrics";

/// Transport tag attached to the receiver context
const RECEIVER_TRANSPORT: &str = "grpc";

pub struct MetricsReceiver {
    instance_name: Arc<str>,
    next_consumer: Arc<dyn MetricsConsumer>,
    translator: Arc<dyn Translator>,
    obsreport: Arc<dyn ObsReporter>,
}

impl MetricsReceiver {
    /// Create a receiver forwarding to `next_consumer`.
    ///
    /// Fails with [`ReceiverError::NilNextConsumer`] when no consumer is given.
    pub fn new(
        instance_name: impl Into<String>,
        next_consumer: Option<Arc<dyn MetricsConsumer>>,
    ) -> Result<Self, ReceiverError> {
        let next_consumer = next_consumer.ok_or(ReceiverError::NilNextConsumer)?;
        Ok(Self {
            instance_name: Arc::from(instance_name.into()),
            next_consumer,
            translator: Arc::new(OtlpTranslator),
            obsreport: Arc::new(TracingObsReporter),
        })
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_obsreport(mut self, obsreport: Arc<dyn ObsReporter>) -> Self {
        self.obsreport = obsreport;
        self
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Handle one OTLP export request
    pub async fn export(
        &self,
        ctx: RequestContext,
        request: &ExportMetricsServiceRequest,
    ) -> Result<ExportMetricsServiceResponse, ReceiverError> {
        let receiver_ctx = ReceiverContext::new(
            ctx,
            self.instance_name.clone(),
            RECEIVER_TRANSPORT,
            RECEIVER_TAG_VALUE,
        );

        for resource_metrics in &request.resource_metrics {
            self.process_received_metrics(&receiver_ctx, resource_metrics)
                .await?;
        }

        Ok(ExportMetricsServiceResponse {
            partial_success: None,
        })
    }

    async fn process_received_metrics(
        &self,
        ctx: &ReceiverContext,
        resource_metrics: &ResourceMetrics,
    ) -> Result<(), ReceiverError> {
        if resource_metrics.scope_metrics.is_empty() {
            return Ok(());
        }

        let data = self.translator.translate(resource_metrics)?;
        self.send_to_next_consumer(ctx, data).await?;
        Ok(())
    }

    async fn send_to_next_consumer(
        &self,
        ctx: &ReceiverContext,
        data: MetricsData,
    ) -> Result<(), ConsumerError> {
        let op = self.obsreport.start_metrics_receive_op(ctx);

        let (num_time_series, num_points) = data.counts();

        let result = self
            .next_consumer
            .consume_metrics_data(ctx, data)
            .instrument(op.span().clone())
            .await;

        self.obsreport.end_metrics_receive_op(
            op,
            DATA_FORMAT_PROTOBUF,
            num_points,
            num_time_series,
            result.as_ref().err(),
        );

        result
    }
}
