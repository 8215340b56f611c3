use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use corpus_engine::CorpusEngine;
use corpus_lemma::RuleLemmatizer;
use corpus_tagger::EnglishTagger;
use corpusdesk::{AppState, Engine, LoadMode, load_corpus_dir, read_snapshot, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const MAX_CONTEXT_RADIUS: usize = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    if let Some(dir) = &config.corpus_dir {
        info!(
            "corpus dir {} (mode: {:?})",
            dir.display(),
            config.load_mode
        );
    }
    if let Some(path) = &config.snapshot_path {
        info!("snapshot path {}", path.display());
    }

    let tagger = EnglishTagger::new();
    let lemmatizer = match &config.exceptions_dir {
        Some(dir) => RuleLemmatizer::load(dir)?,
        None => RuleLemmatizer::new(),
    };

    let start = Instant::now();
    let mut engine = build_engine(&config, tagger, lemmatizer)?;
    if let Some(dir) = &config.corpus_dir {
        let loaded = load_corpus_dir(&mut engine, dir, config.load_mode)?;
        info!("loaded {loaded} documents");
    }
    info!(
        "engine ready in {} ms ({} tokens, {} words)",
        start.elapsed().as_millis(),
        engine.index().len(),
        engine.frequency().len()
    );

    let state = AppState {
        engine: Arc::new(RwLock::new(engine)),
        tagger,
        snapshot_path: config.snapshot_path.clone(),
        max_context_radius: MAX_CONTEXT_RADIUS,
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

/// Restore from the snapshot when one exists, otherwise start empty. Corpus
/// directory files are ingested on top either way.
fn build_engine(
    config: &Config,
    tagger: EnglishTagger,
    lemmatizer: RuleLemmatizer,
) -> anyhow::Result<Engine> {
    if let Some(path) = &config.snapshot_path
        && path.exists()
    {
        let snapshot = read_snapshot(path)?;
        let engine = CorpusEngine::from_snapshot(snapshot, tagger, lemmatizer)?;
        info!("restored snapshot from {}", path.display());
        return Ok(engine);
    }
    Ok(CorpusEngine::new(tagger, lemmatizer))
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    corpus_dir: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
    exceptions_dir: Option<PathBuf>,
    load_mode: LoadMode,
}

fn load_config() -> Config {
    let mut cli_corpus_dir: Option<PathBuf> = None;
    let mut cli_snapshot: Option<PathBuf> = None;
    let mut cli_load_mode: Option<LoadMode> = None;
    let mut args = env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--corpus-dir" => {
                if let Some(path) = args.next() {
                    cli_corpus_dir = Some(PathBuf::from(path));
                }
            }
            "--snapshot" => {
                if let Some(path) = args.next() {
                    cli_snapshot = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--corpus-dir=") {
                    cli_corpus_dir = Some(PathBuf::from(path));
                } else if let Some(path) = arg.strip_prefix("--snapshot=") {
                    cli_snapshot = Some(PathBuf::from(path));
                } else if let Some(mode) = arg.strip_prefix("--load-mode=") {
                    cli_load_mode = parse_load_mode(mode);
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let corpus_dir = cli_corpus_dir.or_else(|| env::var("CORPUS_DIR").ok().map(PathBuf::from));
    let snapshot_path = cli_snapshot.or_else(|| env::var("SNAPSHOT_PATH").ok().map(PathBuf::from));
    let exceptions_dir = env::var("LEMMA_EXCEPTIONS_DIR").ok().map(PathBuf::from);
    let load_mode = cli_load_mode
        .or_else(|| {
            env::var("CORPUS_LOAD_MODE")
                .ok()
                .as_deref()
                .and_then(parse_load_mode)
        })
        .unwrap_or(LoadMode::Mmap);

    Config {
        host,
        port,
        corpus_dir,
        snapshot_path,
        exceptions_dir,
        load_mode,
    }
}

fn parse_load_mode(raw: &str) -> Option<LoadMode> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Some(LoadMode::Mmap),
        "owned" => Some(LoadMode::Owned),
        _ => None,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
