//! Command implementations for histograph-core.
//!
//! Handles:
//! - start: Load config, connect collaborators, run the pipeline
//! - check: Probe every external dependency once

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use histograph_graph::{GraphSink, GraphStore, HttpGraphStore};
use histograph_normalize::CommandNormalizer;
use histograph_pipeline::{Pipeline, PipelineConfig};
use histograph_queue::{QueueSource, RedisQueue};
use histograph_search::{BulkSink, ElasticClient, IndexProvisioner, IndexRegistry, SearchEngine};
use histograph_types::Settings;

/// CLI values taking precedence over every configuration source.
#[derive(Debug, Clone, Default)]
pub struct StartOverrides {
    pub batch_size: Option<usize>,
    pub batch_timeout_ms: Option<u64>,
    pub queue: Option<String>,
    pub log_level: Option<String>,
}

impl StartOverrides {
    /// Apply the overrides and re-validate.
    pub fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(size) = self.batch_size {
            settings.core.batch_size = size;
        }
        if let Some(timeout) = self.batch_timeout_ms {
            settings.core.batch_timeout_ms = timeout;
        }
        if let Some(queue) = &self.queue {
            settings.queue.name = queue.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        settings.validate().context("Invalid command line override")?;
        Ok(())
    }
}

fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Start the ingestion pipeline and run until interrupted.
pub async fn start_daemon(config_path: Option<&str>, overrides: StartOverrides) -> Result<()> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    overrides.apply(&mut settings)?;

    init_logging(&settings.log_level)?;

    info!("Histograph core starting...");
    info!("Configuration:");
    info!("  Queue: {} ({})", settings.queue.name, settings.queue.redis_url);
    info!("  Search engine: {}", settings.elasticsearch.url);
    info!("  Graph store: {}", settings.graph.url);
    info!(
        "  Batching: {} documents / {} ms",
        settings.core.batch_size, settings.core.batch_timeout_ms
    );

    let engine = Arc::new(
        ElasticClient::new(&settings.elasticsearch).context("Failed to build search client")?,
    );
    engine
        .ping()
        .await
        .with_context(|| format!("Search engine unreachable at {}", settings.elasticsearch.url))?;

    let mut provisioner = IndexProvisioner::new(engine.clone(), IndexRegistry::new())
        .with_concurrency(settings.elasticsearch.create_concurrency);
    if let Some(mapping) = settings
        .elasticsearch
        .load_mapping()
        .context("Failed to read index mapping")?
    {
        provisioner = provisioner.with_mapping(mapping);
    }

    let sink = BulkSink::new(engine)
        .with_request_timeout(settings.elasticsearch.request_timeout())
        .with_cooldown(settings.elasticsearch.retry_time());

    let store =
        HttpGraphStore::new(&settings.graph).context("Failed to build graph store client")?;
    let graph = GraphSink::new(Arc::new(store)).with_max_retries(settings.graph.max_retries);

    let queue = RedisQueue::connect(&settings.queue.redis_url, settings.queue.name.clone())
        .await
        .context("Failed to connect to Redis")?;
    let source = QueueSource::new(Box::new(queue)).with_progress_every(settings.queue.progress_every);

    let pipeline = Pipeline::new(
        source,
        CommandNormalizer::default(),
        graph,
        provisioner,
        sink,
        PipelineConfig::from(&settings.core),
    );

    let cancel = pipeline.cancel_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });

    let stats = pipeline.run().await.context("Pipeline stopped with an error")?;
    info!(
        received = stats.received,
        dropped = stats.dropped(),
        documents = stats.documents_written,
        "Histograph core stopped"
    );
    Ok(())
}

/// Probe Redis, the search engine and the graph store, one line each.
pub async fn check_dependencies(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    init_logging(&settings.log_level)?;

    let mut failures = 0;

    let redis = match RedisQueue::connect(&settings.queue.redis_url, settings.queue.name.clone()).await {
        Ok(mut queue) => queue.ping().await.map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };
    failures += report("redis", &settings.queue.redis_url, redis);

    let search = match ElasticClient::new(&settings.elasticsearch) {
        Ok(client) => client.ping().await.map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };
    failures += report("search engine", &settings.elasticsearch.url, search);

    let graph = match HttpGraphStore::new(&settings.graph) {
        Ok(store) => store.check().await.map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };
    failures += report("graph store", &settings.graph.url, graph);

    if failures > 0 {
        anyhow::bail!("{failures} dependency check(s) failed");
    }
    Ok(())
}

fn report(name: &str, url: &str, result: Result<()>) -> usize {
    match result {
        Ok(()) => {
            println!("{name:<14} OK     {url}");
            0
        }
        Err(e) => {
            println!("{name:<14} FAILED {url}: {e}");
            1
        }
    }
}
