//! Core application

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use crate::api::OtlpGrpcServer;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::{AppConfig, LogFormat};
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::domain::metrics::{LoggingConsumer, MetricsConsumer, MetricsReceiver};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub receiver: Arc<MetricsReceiver>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.log_format.unwrap_or_default())?;

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::CheckConfig) => Self::check_config(&cli_config),
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config)?;
                Self::start_server(app).await
            }
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let consumer: Arc<dyn MetricsConsumer> =
            Arc::new(LoggingConsumer::new(config.consumer.verbosity));
        let receiver = MetricsReceiver::new(config.receiver.name.clone(), Some(consumer))
            .context("Failed to create metrics receiver")?;

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            receiver: Arc::new(receiver),
        })
    }

    /// Load and validate configuration, then print the effective values
    fn check_config(cli: &CliConfig) -> Result<()> {
        let config = AppConfig::load(cli)?;

        println!("Configuration OK");
        println!("  server.host                  {}", config.server.host);
        println!("  receiver.name                {}", config.receiver.name);
        println!("  receiver.grpc_port           {}", config.receiver.grpc_port);
        println!(
            "  receiver.max_message_bytes   {}",
            config.receiver.max_message_bytes
        );
        println!("  consumer.verbosity           {}", config.consumer.verbosity);
        match config.observability.metrics_port {
            Some(port) => println!("  observability.metrics_port   {}", port),
            None => println!("  observability.metrics_port   disabled"),
        }
        Ok(())
    }

    fn init_logging(format: LogFormat) -> Result<()> {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);
        let filter = EnvFilter::try_new(&filter)
            .with_context(|| format!("Invalid log filter: {}", filter))?;

        let builder = tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_env_filter(filter);

        let result = match format {
            LogFormat::Compact => builder.with_ansi(true).compact().try_init(),
            LogFormat::Json => builder.with_ansi(false).json().try_init(),
        };
        result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
    }

    /// Install the Prometheus recorder so receive-op counters are exported
    fn init_metrics_exporter(host: &str, port: u16) -> Result<()> {
        let ip: IpAddr = host
            .parse()
            .with_context(|| format!("Invalid bind host: {}", host))?;

        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(ip, port))
            .install()
            .context("Failed to install Prometheus recorder")?;

        tracing::debug!(port, "Prometheus metrics endpoint initialized");
        Ok(())
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        if let Some(port) = app.config.observability.metrics_port {
            Self::init_metrics_exporter(&app.config.server.host, port)?;
        }

        let grpc_server = OtlpGrpcServer::new(
            &app.config.receiver,
            &app.config.server.host,
            app.receiver.clone(),
        )?;
        let shutdown_rx = app.shutdown.subscribe();
        let shutdown = app.shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = grpc_server.start(shutdown_rx).await {
                tracing::error!(error = %e, "OTLP gRPC server error");
                shutdown.trigger();
            }
        });
        app.shutdown.register(handle).await;

        banner::print_banner(&app.config);
        tracing::info!(
            receiver = app.receiver.instance_name(),
            host = %app.config.server.host,
            grpc_port = app.config.receiver.grpc_port,
            "Receiver started"
        );

        app.shutdown.wait().await;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
