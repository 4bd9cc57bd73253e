use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use pw_domain::config::{LoggingConfig, ObservabilityConfig};
use pw_listener::cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to listen when no subcommand is given.
        None => listen(None).await,
        Some(Command::Listen { status_interval }) => listen(status_interval).await,
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = pw_listener::cli::load_config()?;
            let valid = pw_listener::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = pw_listener::cli::load_config()?;
            pw_listener::cli::config::show(&config)
        }
        Some(Command::Endpoints) => {
            let (config, _config_path) = pw_listener::cli::load_config()?;
            print!("{}", pw_listener::cli::endpoints::render(&config.channel));
            Ok(())
        }
        Some(Command::Version) => {
            println!("pushwire {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn listen(status_interval: Option<u64>) -> anyhow::Result<()> {
    let (config, config_path) = pw_listener::cli::load_config()?;
    let tracer_provider = init_tracing(&config.logging, &config.observability);
    tracing::info!(config = %config_path, "pushwire starting");

    let result = match pw_listener::cli::config::ensure_runnable(&config, &config_path) {
        Ok(()) => pw_listener::cli::listen::run(&config, status_interval).await,
        Err(e) => Err(e),
    };

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "OpenTelemetry tracer provider shutdown failed");
        }
    }
    result
}

/// Install the tracing subscriber for `listen`.
///
/// Log lines go to stderr so stdout carries only event JSON.  When
/// `otlp_endpoint` is configured an OpenTelemetry layer exports every span
/// via OTLP/gRPC; the returned provider must be shut down on exit to flush
/// pending spans.
fn init_tracing(
    logging: &LoggingConfig,
    obs: &ObservabilityConfig,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let fmt_layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let Some(endpoint) = &obs.otlp_endpoint else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return None;
    };

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!(
                "WARNING: failed to create OTLP exporter for {endpoint}: {e}; \
                 starting without OpenTelemetry"
            );
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
            obs.sample_rate,
        ))
        .with_resource(resource)
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("pushwire"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Some(tracer_provider)
}
