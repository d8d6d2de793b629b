mod client;
mod error;
mod events;
mod projection;

use std::process::exit;

use clap::Parser;
use client::Client;
use client::Color;
use client::Commands;
use client::TelemetryConfig;
use client::healthcheck::healthcheck_cmd;
use client::listen;
use client::projection_commands;
use cms_models::PgContentSource;
use common::tracing::NoopSpanExporter;
use common::tracing::SpanUploading;
use common::tracing::Stream;
use common::tracing::TracingConfig;
use common::tracing::create_tracing_subscriber;
use opentelemetry_otlp::WithExportConfig;
use projection::Projector;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(
    telemetry_config: TelemetryConfig,
    span_uploading: SpanUploading,
) -> anyhow::Result<()> {
    let telemetry = telemetry_config.telemetry();
    let log_level = tracing_subscriber::filter::LevelFilter::INFO;
    match telemetry {
        Some(telemetry) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(telemetry.endpoint.as_str())
                .build()?;
            let tracing_config = TracingConfig {
                stream: Stream::Stderr,
                telemetry: Some(telemetry),
                directives: vec![],
                span_uploading,
            };
            create_tracing_subscriber(tracing_config, log_level, exporter).init();
        }
        None => {
            let tracing_config = TracingConfig {
                stream: Stream::Stderr,
                telemetry: None,
                directives: vec![],
                span_uploading,
            };
            create_tracing_subscriber(tracing_config, log_level, NoopSpanExporter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(_) => (),
        Err(e) => {
            eprintln!("{e:?}");
            exit(2);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let client = Client::parse();

    match client.color {
        Color::Never => colored::control::set_override(false),
        Color::Always => colored::control::set_override(true),
        Color::Auto => colored::control::unset_override(),
    }

    let span_uploading = match client.command {
        Commands::Listen(_) => SpanUploading::BackgroundBatched,
        _ => SpanUploading::Blocking,
    };
    init_tracing(client.telemetry_config, span_uploading)?;

    let db_pool = client.postgres_config.into_pool().await?;

    let mut conn = client.redis_config.connect().await?;
    let projector = Projector::new(
        PgContentSource::new(db_pool.clone()),
        client.projection_config.into_settings(),
    );

    match client.command {
        Commands::Project(args) => {
            projection_commands::project(args, &projector, &mut conn).await
        }
        Commands::Delete(args) => projection_commands::delete(args, &mut conn).await,
        Commands::Sweep => projection_commands::sweep(&projector, &mut conn).await,
        Commands::SyncReferences => {
            projection_commands::sync_references(&projector, &mut conn).await
        }
        Commands::Listen(args) => listen::listen(args, &projector, &mut conn).await,
        Commands::Healthcheck => healthcheck_cmd(db_pool, &mut conn).await,
    }
}
