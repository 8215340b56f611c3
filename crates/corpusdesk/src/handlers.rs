use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;

use corpus_engine::{CorpusEngine, CorpusError, DEFAULT_CONTEXT_RADIUS, PreparedDocument};
use corpus_lemma::RuleLemmatizer;
use corpus_tagger::EnglishTagger;
use corpus_types::{CLOSED_TAG_SET, Tag};

use crate::loader;

/// The concrete engine this service runs.
pub type Engine = CorpusEngine<EnglishTagger, RuleLemmatizer>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<Engine>>,
    /// Copy of the engine's tagger for off-lock document preparation.
    pub tagger: EnglishTagger,
    pub snapshot_path: Option<PathBuf>,
    pub max_context_radius: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/tags", get(tags))
        .route("/v1/words", get(words))
        .route("/v1/words/{word}", get(word_info))
        .route("/v1/words/{word}/tags", post(add_word_tag))
        .route("/v1/words/{word}/tags/{tag}", delete(remove_word_tag))
        .route("/v1/context", get(context))
        .route("/v1/stats", get(stats))
        .route("/v1/documents", get(documents).post(ingest))
        .route("/v1/documents/{name}/annotated", get(annotated))
        .route("/v1/tokens/{index}/text", put(edit_token_text))
        .route("/v1/tokens/{index}/tag", put(edit_token_tag))
        .route("/v1/snapshot", post(save_snapshot))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn not_found<T: Into<String>>(msg: T) -> Self {
        ApiError::NotFound(msg.into())
    }
}

impl From<CorpusError> for ApiError {
    fn from(err: CorpusError) -> Self {
        match &err {
            CorpusError::UnknownWord(_)
            | CorpusError::UnknownTag { .. }
            | CorpusError::DocumentNotFound(_)
            | CorpusError::OccurrenceNotFound { .. } => ApiError::NotFound(err.to_string()),
            CorpusError::IndexOutOfRange { .. }
            | CorpusError::OutOfRange { .. }
            | CorpusError::Tagger(_) => ApiError::BadRequest(err.to_string()),
            CorpusError::CorruptSnapshot(_) => ApiError::Internal,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::NotFound(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

#[derive(Serialize)]
struct TagDescription {
    tag: &'static str,
    description: &'static str,
}

async fn tags() -> Json<Vec<TagDescription>> {
    Json(
        CLOSED_TAG_SET
            .iter()
            .map(|tag| TagDescription {
                tag: tag.label(),
                description: tag.description(),
            })
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct WordsQuery {
    pub prefix: Option<String>,
}

#[derive(Serialize)]
struct WordsResponse {
    words: Vec<String>,
    /// Words modified since the previous listing; drained on read.
    modified: Vec<String>,
}

async fn words(
    State(state): State<AppState>,
    Query(params): Query<WordsQuery>,
) -> Json<WordsResponse> {
    let mut engine = state.engine.write().await;
    let listing = engine.list_words(params.prefix.as_deref());
    Json(WordsResponse {
        words: listing.words,
        modified: listing.modified,
    })
}

#[derive(Serialize)]
struct WordTag {
    tag: &'static str,
    description: &'static str,
    lemma: String,
}

#[derive(Serialize)]
struct WordInfoResponse {
    word: String,
    count: usize,
    tags: Vec<WordTag>,
}

async fn word_info(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Json<WordInfoResponse>, ApiError> {
    let engine = state.engine.read().await;
    let (count, tags) = engine.word_info(&word);
    if count == 0 {
        return Err(ApiError::not_found(format!("unknown word {word:?}")));
    }
    Ok(Json(WordInfoResponse {
        word,
        count,
        tags: tags
            .into_iter()
            .map(|(tag, lemma)| WordTag {
                tag: tag.label(),
                description: tag.description(),
                lemma,
            })
            .collect(),
    }))
}

#[derive(Deserialize)]
pub struct TagBody {
    pub tag: String,
}

fn parse_tag(label: &str) -> Result<Tag, ApiError> {
    Tag::from_label(label).ok_or_else(|| ApiError::bad_request(format!("unknown tag {label:?}")))
}

async fn add_word_tag(
    State(state): State<AppState>,
    Path(word): Path<String>,
    Json(body): Json<TagBody>,
) -> Result<StatusCode, ApiError> {
    let tag = parse_tag(&body.tag)?;
    let mut engine = state.engine.write().await;
    engine.add_word_tag(&word, tag)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_word_tag(
    State(state): State<AppState>,
    Path((word, tag)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let tag = parse_tag(&tag)?;
    let mut engine = state.engine.write().await;
    engine.remove_word_tag(&word, tag)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ContextQuery {
    pub word: String,
    pub ordinal: Option<usize>,
    pub radius: Option<usize>,
}

#[derive(Serialize)]
struct ContextResponse {
    text: String,
    match_start: usize,
    match_end: usize,
    token_index: usize,
}

async fn context(
    State(state): State<AppState>,
    Query(params): Query<ContextQuery>,
) -> Result<Json<ContextResponse>, ApiError> {
    let word = params.word.trim();
    if word.is_empty() {
        return Err(ApiError::bad_request("word is required"));
    }
    let ordinal = params.ordinal.unwrap_or(0);
    let radius = params
        .radius
        .unwrap_or(DEFAULT_CONTEXT_RADIUS)
        .min(state.max_context_radius);

    let engine = state.engine.read().await;
    let hit = engine.get_context(word, ordinal, radius)?;
    Ok(Json(ContextResponse {
        text: hit.text,
        match_start: hit.match_start,
        match_end: hit.match_end,
        token_index: hit.token_index,
    }))
}

#[derive(Serialize)]
struct TagCount {
    tag: &'static str,
    count: usize,
}

#[derive(Serialize)]
struct WordTagCount {
    word: String,
    tag: &'static str,
    count: usize,
}

#[derive(Serialize)]
struct TagBigramCount {
    first: &'static str,
    second: &'static str,
    count: usize,
}

#[derive(Serialize)]
struct StatsResponse {
    tag_freq: Vec<TagCount>,
    word_tag_freq: Vec<WordTagCount>,
    tag_bigram_freq: Vec<TagBigramCount>,
}

/// The stats tables, sorted by descending count for display.
async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let mut engine = state.engine.write().await;
    let stats = engine.get_stats();

    let mut tag_freq: Vec<TagCount> = stats
        .tag_freq
        .iter()
        .map(|(tag, count)| TagCount {
            tag: tag.label(),
            count: *count,
        })
        .collect();
    tag_freq.sort_by(|a, b| b.count.cmp(&a.count).then(a.tag.cmp(b.tag)));

    let mut word_tag_freq: Vec<WordTagCount> = stats
        .word_tag_freq
        .iter()
        .map(|((word, tag), count)| WordTagCount {
            word: word.clone(),
            tag: tag.label(),
            count: *count,
        })
        .collect();
    word_tag_freq.sort_by(|a, b| b.count.cmp(&a.count).then(a.word.cmp(&b.word)));

    let mut tag_bigram_freq: Vec<TagBigramCount> = stats
        .tag_bigram_freq
        .iter()
        .map(|((first, second), count)| TagBigramCount {
            first: first.label(),
            second: second.label(),
            count: *count,
        })
        .collect();
    tag_bigram_freq.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.first.cmp(b.first))
            .then(a.second.cmp(b.second))
    });

    Json(StatsResponse {
        tag_freq,
        word_tag_freq,
        tag_bigram_freq,
    })
}

#[derive(Serialize)]
struct DocumentInfo {
    name: String,
    start: usize,
    end: usize,
}

async fn documents(State(state): State<AppState>) -> Json<Vec<DocumentInfo>> {
    let engine = state.engine.read().await;
    Json(
        engine
            .buffer()
            .documents()
            .iter()
            .map(|doc| DocumentInfo {
                name: doc.name.clone(),
                start: doc.start,
                end: doc.end,
            })
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct IngestBody {
    pub name: String,
    pub text: String,
}

#[derive(Serialize)]
struct IngestResponse {
    document: DocumentInfo,
    token_count: usize,
    word_count: usize,
}

/// Tokenization happens before the write lock is taken, so a large upload
/// never blocks readers while it is being tagged.
async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let prepared = PreparedDocument::tokenize(&state.tagger, &body.text)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mut engine = state.engine.write().await;
    let report = engine.commit_document(name, prepared);
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            document: DocumentInfo {
                name: report.document.name,
                start: report.document.start,
                end: report.document.end,
            },
            token_count: report.token_count,
            word_count: report.word_count,
        }),
    ))
}

#[derive(Serialize)]
struct AnnotatedSpanResponse {
    gap: String,
    text: String,
    tag: &'static str,
}

async fn annotated(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<AnnotatedSpanResponse>>, ApiError> {
    let engine = state.engine.read().await;
    let spans = engine.render_annotated(&name)?;
    Ok(Json(
        spans
            .into_iter()
            .map(|span| AnnotatedSpanResponse {
                gap: span.gap,
                text: span.text,
                tag: span.tag.label(),
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct EditTextBody {
    pub text: String,
}

#[derive(Serialize)]
struct InsertedToken {
    surface: String,
    tag: &'static str,
}

#[derive(Serialize)]
struct EditTextResponse {
    removed: String,
    inserted: Vec<InsertedToken>,
    delta: isize,
}

async fn edit_token_text(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(body): Json<EditTextBody>,
) -> Result<Json<EditTextResponse>, ApiError> {
    let mut engine = state.engine.write().await;
    let outcome = engine.replace_token(index, &body.text)?;
    Ok(Json(EditTextResponse {
        removed: outcome.removed.surface,
        inserted: outcome
            .inserted
            .into_iter()
            .map(|token| InsertedToken {
                surface: token.surface,
                tag: token.tag.label(),
            })
            .collect(),
        delta: outcome.delta,
    }))
}

#[derive(Serialize)]
struct EditTagResponse {
    old_tag: &'static str,
    new_tag: &'static str,
}

async fn edit_token_tag(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(body): Json<TagBody>,
) -> Result<Json<EditTagResponse>, ApiError> {
    let tag = parse_tag(&body.tag)?;
    let mut engine = state.engine.write().await;
    let old = engine.replace_tag(index, tag)?;
    Ok(Json(EditTagResponse {
        old_tag: old.label(),
        new_tag: tag.label(),
    }))
}

#[derive(Serialize)]
struct SnapshotResponse {
    path: String,
    bytes: u64,
}

async fn save_snapshot(State(state): State<AppState>) -> Result<Json<SnapshotResponse>, ApiError> {
    let Some(path) = state.snapshot_path.as_deref() else {
        return Err(ApiError::bad_request("no snapshot path configured"));
    };
    let snapshot = {
        let engine = state.engine.read().await;
        engine.snapshot()
    };
    let bytes = loader::write_snapshot(path, &snapshot).map_err(|err| {
        tracing::error!("snapshot write failed: {err:#}");
        ApiError::Internal
    })?;
    Ok(Json(SnapshotResponse {
        path: path.display().to_string(),
        bytes,
    }))
}
