mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_llm_service::{ApiKeys, LlmServiceProfiles, LlmSettings};
use anyhow::Context;
use api::{ApiConfig, AppState, IngestMode};
use clap::{Parser, Subcommand};
use contextor::{AskOptions, ContextorConfig, QueryEngine};
use doc_ingest::{IndicatifProgress, IngestConfig, IngestPipeline};
use ingest_worker::{EventBus, IngestWorker};
use rag_store::{EmbeddingsProvider, LlmEmbedder, RagConfig, VectorStore, open_store};
use tracing::{info, warn};

/// Chat-model temperature used across the app.
const CHAT_TEMPERATURE: f32 = 0.1;

#[derive(Parser, Debug)]
#[command(name = "wiidcos", version, about = "Chat with your PDFs")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the HTTP API (default).
    Serve,
    /// Ingest every PDF already in UPLOAD_DIR, then exit.
    Worker,
    /// Ingest a file, or every PDF in a directory.
    Ingest {
        path: PathBuf,
        /// Drop and recreate the collection first.
        #[arg(long)]
        reset: bool,
    },
    /// Ask one question and print the answer.
    Query {
        text: String,
        #[arg(long)]
        doc_id: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        top_k: Option<u64>,
    },
    /// Report which API keys are set and probe the LLM backends.
    Keys,
}

/// Everything the subcommands share, built once from the environment.
struct Runtime {
    svc: Arc<LlmServiceProfiles>,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    ingest: Arc<IngestPipeline>,
}

impl Runtime {
    fn from_env() -> anyhow::Result<Self> {
        let settings = LlmSettings::configure(CHAT_TEMPERATURE).context("LLM settings")?;
        let svc = Arc::new(LlmServiceProfiles::from_settings(&settings, None)?);

        let rag_cfg = RagConfig::from_env(settings.embedding_dim).context("vector store config")?;
        let store = open_store(rag_cfg)?;
        let embedder: Arc<dyn EmbeddingsProvider> =
            Arc::new(LlmEmbedder::new(svc.clone(), settings.embedding_dim));

        let ingest_cfg = IngestConfig::from_env(settings.chunk_size, settings.chunk_overlap)
            .context("ingest config")?;
        let ingest = Arc::new(IngestPipeline::new(ingest_cfg, store.clone(), embedder.clone()));

        info!(
            provider = ?settings.provider,
            chat = %settings.chat.model,
            embedding = %settings.embedding.model,
            dim = settings.embedding_dim,
            collection = store.collection(),
            "runtime configured"
        );
        Ok(Self {
            svc,
            store,
            embedder,
            ingest,
        })
    }

    async fn query_engine(&self) -> anyhow::Result<QueryEngine> {
        let cfg = ContextorConfig::from_env().context("query config")?;
        Ok(QueryEngine::from_profiles(cfg, self.store.clone(), self.embedder.clone(), self.svc.clone()).await)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // Logging is not up yet.
        eprintln!("warning: .env not loaded ({e}); using process environment");
    }
    telemetry::init()?;

    let cli = Cli::parse();
    let keys = ApiKeys::from_env();
    keys.report();

    match cli.cmd.unwrap_or(Cmd::Serve) {
        Cmd::Serve => serve().await,
        Cmd::Worker => worker().await,
        Cmd::Ingest { path, reset } => ingest(&path, reset).await,
        Cmd::Query {
            text,
            doc_id,
            source,
            top_k,
        } => {
            let opts = AskOptions {
                top_k,
                doc_id,
                source,
            };
            query(&text, opts).await
        }
        Cmd::Keys => check_keys(&keys).await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let rt = Runtime::from_env()?;
    let api_cfg = ApiConfig::from_env()?;
    let query = Arc::new(rt.query_engine().await?);
    info!(reranking = query.reranking(), mode = ?api_cfg.ingest_mode, "query engine ready");

    let bus = match api_cfg.ingest_mode {
        IngestMode::Background => {
            let (bus, rx) = EventBus::new();
            let worker = IngestWorker::new(rt.ingest.clone());
            tokio::spawn(worker.run(rx));
            Some(bus)
        }
        IngestMode::Sync => None,
    };

    let state = AppState::new(api_cfg, rt.ingest.clone(), query, bus)?;
    api::start(Arc::new(state)).await?;
    Ok(())
}

async fn worker() -> anyhow::Result<()> {
    let rt = Runtime::from_env()?;
    let dir = rt.ingest.config().upload_dir.clone();
    let worker = IngestWorker::new(rt.ingest.clone());
    let report = worker.bootstrap(&dir, &IndicatifProgress::bar(0)).await?;
    for (file, err) in &report.failed {
        warn!(%file, error = %err, "not ingested");
    }
    info!(
        ingested = report.ingested.len(),
        failed = report.failed.len(),
        "bootstrap finished"
    );
    Ok(())
}

async fn ingest(path: &Path, reset: bool) -> anyhow::Result<()> {
    let rt = Runtime::from_env()?;
    if reset {
        warn!(collection = rt.store.collection(), "resetting collection");
        rt.store.reset_collection().await?;
    }

    if path.is_dir() {
        let report = rt.ingest.ingest_dir(path, &IndicatifProgress::bar(0)).await?;
        for r in &report.ingested {
            println!("{}", serde_json::to_string(r)?);
        }
        for (file, err) in &report.failed {
            eprintln!("failed: {file}: {err}");
        }
        if !report.failed.is_empty() {
            anyhow::bail!("{} of {} files failed", report.failed.len(), report.failed.len() + report.ingested.len());
        }
        return Ok(());
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("not a file: {}", path.display()))?;
    let report = rt.ingest.ingest_file(path, &filename, None).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn query(text: &str, opts: AskOptions) -> anyhow::Result<()> {
    let rt = Runtime::from_env()?;
    let engine = rt.query_engine().await?;
    let answer = engine.ask(text, opts).await?;

    println!("{}\n", answer.answer);
    for s in &answer.sources {
        match &s.page {
            Some(p) => println!("  - {} (p. {p})", s.filename),
            None => println!("  - {}", s.filename),
        }
    }
    if let Some(c) = answer.confidence {
        println!("  confidence {c:.2}");
    }
    Ok(())
}

async fn check_keys(keys: &ApiKeys) -> anyhow::Result<()> {
    for (name, found) in keys.status() {
        println!("{name:<16} {}", if found { "found" } else { "missing" });
    }
    let settings = LlmSettings::configure(CHAT_TEMPERATURE)?;
    let svc = LlmServiceProfiles::from_settings(&settings, None)?;
    for h in svc.health_all().await {
        let mark = if h.ok { "ok" } else { "FAIL" };
        println!("{mark:<4} {} {} @ {} ({} ms) {}", h.provider, h.model, h.endpoint, h.latency_ms, h.message);
    }
    Ok(())
}
