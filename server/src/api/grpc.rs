//! gRPC OTLP server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tonic::transport::Server as TonicServer;
use tonic::{Request, Response, Status};

use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
    metrics_service_server::{MetricsService, MetricsServiceServer},
};

use crate::core::config::ReceiverConfig;
use crate::domain::metrics::{ConsumerError, MetricsReceiver, ReceiverError};
use crate::domain::obsreport::RequestContext;

pub struct OtlpGrpcServer {
    addr: SocketAddr,
    max_message_bytes: usize,
    receiver: Arc<MetricsReceiver>,
}

impl OtlpGrpcServer {
    pub fn new(config: &ReceiverConfig, host: &str, receiver: Arc<MetricsReceiver>) -> Result<Self> {
        let ip = host
            .parse()
            .with_context(|| format!("Invalid bind host: {}", host))?;
        Ok(Self {
            addr: SocketAddr::new(ip, config.grpc_port),
            max_message_bytes: config.max_message_bytes,
            receiver,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn start(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let addr = self.addr;

        tracing::debug!(
            %addr,
            receiver = self.receiver.instance_name(),
            "Starting OTLP gRPC server"
        );

        TonicServer::builder()
            .add_service(
                MetricsServiceServer::new(OtlpMetricsService::new(self.receiver))
                    .max_decoding_message_size(self.max_message_bytes)
                    .max_encoding_message_size(self.max_message_bytes),
            )
            .serve_with_shutdown(addr, async move {
                let _ = shutdown_rx.wait_for(|&v| v).await;
                tracing::debug!("OTLP gRPC server shutting down");
            })
            .await?;

        Ok(())
    }
}

/// gRPC metrics service
struct OtlpMetricsService {
    receiver: Arc<MetricsReceiver>,
}

impl OtlpMetricsService {
    fn new(receiver: Arc<MetricsReceiver>) -> Self {
        Self { receiver }
    }
}

#[tonic::async_trait]
impl MetricsService for OtlpMetricsService {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let peer = request.remote_addr();
        let ctx = RequestContext::with_peer(peer);
        // Cancels the token when tonic drops this future on client disconnect
        let _cancel_on_drop = ctx.cancellation.clone().drop_guard();
        let req = request.into_inner();

        match self.receiver.export(ctx, &req).await {
            Ok(response) => Ok(Response::new(response)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    receiver = self.receiver.instance_name(),
                    peer = ?peer,
                    "Failed to process metrics export"
                );
                Err(to_status(&e))
            }
        }
    }
}

/// Map a receiver failure to the gRPC status returned to the exporter
fn to_status(err: &ReceiverError) -> Status {
    match err {
        ReceiverError::Translation(e) => Status::invalid_argument(e.to_string()),
        ReceiverError::Downstream(ConsumerError::Closed | ConsumerError::Cancelled) => {
            Status::unavailable(err.to_string())
        }
        ReceiverError::Downstream(ConsumerError::Rejected(_)) | ReceiverError::NilNextConsumer => {
            Status::internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry_proto::tonic::metrics::v1::{
        Gauge, Metric as OtlpMetric, NumberDataPoint, ResourceMetrics, ScopeMetrics, metric::Data,
        number_data_point,
    };
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::{Notify, mpsc};
    use tokio_util::sync::CancellationToken;
    use tonic::Code;
    use tonic::transport::server::TcpConnectInfo;

    use super::*;
    use crate::domain::metrics::{ChannelConsumer, MetricsConsumer, MetricsData, TranslationError};
    use crate::domain::obsreport::ReceiverContext;

    /// What the consumer saw of its receiver context
    struct SeenContext {
        peer: Option<SocketAddr>,
        signal: &'static str,
        cancellation: CancellationToken,
    }

    /// Consumer double that records its context and optionally never returns
    #[derive(Default)]
    struct HoldingConsumer {
        hold: bool,
        seen: Mutex<Option<SeenContext>>,
        entered: Notify,
    }

    #[async_trait]
    impl MetricsConsumer for HoldingConsumer {
        async fn consume_metrics_data(
            &self,
            ctx: &ReceiverContext,
            _data: MetricsData,
        ) -> Result<(), ConsumerError> {
            *self.seen.lock().unwrap() = Some(SeenContext {
                peer: ctx.peer_addr(),
                signal: ctx.signal(),
                cancellation: ctx.cancellation().clone(),
            });
            self.entered.notify_one();
            if self.hold {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn holding_service(hold: bool) -> (OtlpMetricsService, Arc<HoldingConsumer>) {
        let consumer = Arc::new(HoldingConsumer {
            hold,
            ..Default::default()
        });
        let next: Arc<dyn MetricsConsumer> = consumer.clone();
        let receiver = MetricsReceiver::new("otlp", Some(next)).unwrap();
        (OtlpMetricsService::new(Arc::new(receiver)), consumer)
    }

    fn gauge_request(name: &str) -> ExportMetricsServiceRequest {
        ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![OtlpMetric {
                        name: name.to_string(),
                        data: Some(Data::Gauge(Gauge {
                            data_points: vec![NumberDataPoint {
                                time_unix_nano: 1_700_000_000_000_000_000,
                                value: Some(number_data_point::Value::AsDouble(1.5)),
                                ..Default::default()
                            }],
                        })),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn service(capacity: usize) -> (OtlpMetricsService, mpsc::Receiver<MetricsData>) {
        let (consumer, rx) = ChannelConsumer::channel(capacity);
        let consumer: Arc<dyn MetricsConsumer> = Arc::new(consumer);
        let receiver = MetricsReceiver::new("otlp", Some(consumer)).unwrap();
        (OtlpMetricsService::new(Arc::new(receiver)), rx)
    }

    #[tokio::test]
    async fn test_export_forwards_to_consumer() {
        let (service, mut rx) = service(4);

        let response = service
            .export(Request::new(gauge_request("cpu.usage")))
            .await
            .unwrap();
        assert!(response.into_inner().partial_success.is_none());

        let data = rx.recv().await.unwrap();
        assert_eq!(data.metrics.len(), 1);
        assert_eq!(data.metrics[0].descriptor.name, "cpu.usage");
    }

    #[tokio::test]
    async fn test_export_invalid_metric_is_invalid_argument() {
        let (service, _rx) = service(4);

        let status = service
            .export(Request::new(gauge_request("")))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_export_closed_consumer_is_unavailable() {
        let (service, rx) = service(4);
        drop(rx);

        let status = service
            .export(Request::new(gauge_request("cpu.usage")))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
    }

    #[tokio::test]
    async fn test_export_empty_request() {
        let (service, mut rx) = service(4);

        service
            .export(Request::new(ExportMetricsServiceRequest::default()))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_export_passes_peer_to_consumer() {
        let (service, consumer) = holding_service(false);
        let peer: SocketAddr = "10.0.0.7:51234".parse().unwrap();

        let mut request = Request::new(gauge_request("cpu.usage"));
        request.extensions_mut().insert(TcpConnectInfo {
            local_addr: None,
            remote_addr: Some(peer),
        });
        service.export(request).await.unwrap();

        let seen = consumer.seen.lock().unwrap();
        let seen = seen.as_ref().unwrap();
        assert_eq!(seen.peer, Some(peer));
        assert_eq!(seen.signal, "otlp_metrics");
    }

    #[tokio::test]
    async fn test_dropped_export_cancels_request() {
        let (service, consumer) = holding_service(true);

        let handle =
            tokio::spawn(async move { service.export(Request::new(gauge_request("cpu"))).await });
        consumer.entered.notified().await;

        let token = consumer
            .seen
            .lock()
            .unwrap()
            .as_ref()
            .map(|seen| seen.cancellation.clone())
            .unwrap();
        assert!(!token.is_cancelled());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_to_status_mapping() {
        let status = to_status(&ReceiverError::Translation(TranslationError::EmptyMetricName));
        assert_eq!(status.code(), Code::InvalidArgument);

        let status = to_status(&ReceiverError::Downstream(ConsumerError::Cancelled));
        assert_eq!(status.code(), Code::Unavailable);

        let status = to_status(&ReceiverError::Downstream(ConsumerError::Rejected(
            "full".to_string(),
        )));
        assert_eq!(status.code(), Code::Internal);

        assert_eq!(to_status(&ReceiverError::NilNextConsumer).code(), Code::Internal);
    }

    #[test]
    fn test_server_new_parses_host() {
        let (consumer, _rx) = ChannelConsumer::channel(1);
        let consumer: Arc<dyn MetricsConsumer> = Arc::new(consumer);
        let receiver = Arc::new(MetricsReceiver::new("otlp", Some(consumer)).unwrap());
        let config = ReceiverConfig {
            name: "otlp".to_string(),
            grpc_port: 4317,
            max_message_bytes: 1024,
        };

        let server = OtlpGrpcServer::new(&config, "127.0.0.1", receiver.clone()).unwrap();
        assert_eq!(server.addr(), "127.0.0.1:4317".parse().unwrap());

        assert!(OtlpGrpcServer::new(&config, "not-a-host", receiver).is_err());
    }
}
