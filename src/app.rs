#![cfg(feature = "web")]
use axum::{
    Json, Router,
    body::Body,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::cleaning::{CleaningOptions, CleaningReport, apply_cleaning};
use crate::config::Config;
use crate::downloader::{self, ExportFormat};
use crate::error::{Result, SweeperError};
use crate::graph::{ChartOptions, create_bar_chart};
use crate::loader::{UploadedFile, load_uploads};
use crate::posts::{NewPost, Post, PostStore};
use crate::table::{ColumnType, Table, Value};
use crate::uploads::{UPLOADS_ROUTE, sanitize_file_name, save_image};

/// An uploaded file kept for the lifetime of the process
struct Dataset {
    name: String,
    size_kb: f64,
    table: Table,
}

pub struct AppState {
    config: Config,
    datasets: Mutex<HashMap<Uuid, Dataset>>,
    posts: PostStore,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let posts = PostStore::open(&config.posts_file)?;
        Ok(AppState {
            config,
            datasets: Mutex::new(HashMap::new()),
            posts,
        })
    }

    fn datasets(&self) -> MutexGuard<'_, HashMap<Uuid, Dataset>> {
        self.datasets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct ColumnSummary {
    name: String,
    dtype: ColumnType,
    missing: usize,
}

#[derive(Serialize)]
struct DatasetSummary {
    id: Uuid,
    name: String,
    size_kb: f64,
    rows: usize,
    columns: Vec<ColumnSummary>,
    numeric_columns: Vec<String>,
    preview: Vec<Vec<Value>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum UploadOutcome {
    Loaded(DatasetSummary),
    Failed {
        name: String,
        size_kb: f64,
        error: String,
    },
}

#[derive(Serialize)]
struct CleanResponse {
    report: CleaningReport,
    dataset: DatasetSummary,
}

#[derive(Deserialize)]
struct ColumnsQuery {
    columns: Option<String>,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
    columns: Option<String>,
}

#[derive(Deserialize)]
struct CommentRequest {
    text: String,
    avatar: Option<String>,
}

// Extractor results, so malformed requests get the JSON error body too
type PathParam<T> = std::result::Result<Path<T>, PathRejection>;
type QueryParams<T> = std::result::Result<Query<T>, QueryRejection>;
type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;
type MultipartBody = std::result::Result<Multipart, MultipartRejection>;

impl From<PathRejection> for SweeperError {
    fn from(e: PathRejection) -> Self {
        SweeperError::Validation(format!("Invalid path: {}", e.body_text()))
    }
}

impl From<QueryRejection> for SweeperError {
    fn from(e: QueryRejection) -> Self {
        SweeperError::Validation(format!("Invalid query: {}", e.body_text()))
    }
}

impl From<JsonRejection> for SweeperError {
    fn from(e: JsonRejection) -> Self {
        SweeperError::Validation(format!("Invalid request body: {}", e.body_text()))
    }
}

impl From<MultipartRejection> for SweeperError {
    fn from(e: MultipartRejection) -> Self {
        SweeperError::Validation(format!("Invalid upload: {}", e.body_text()))
    }
}

impl IntoResponse for SweeperError {
    fn into_response(self) -> Response {
        let status = match &self {
            SweeperError::NotFound(_) => StatusCode::NOT_FOUND,
            SweeperError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

/// Build the router for both applications
pub fn router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.uploads_dir);
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(serve_landing))
        .route("/sweeper", get(serve_sweeper))
        .route("/board", get(serve_board))
        .route("/api/sweeper/upload", post(upload_files))
        .route(
            "/api/sweeper/:id",
            get(get_dataset).delete(delete_dataset),
        )
        .route("/api/sweeper/:id/clean", post(clean_dataset))
        .route("/api/sweeper/:id/chart", get(chart_dataset))
        .route("/api/sweeper/:id/export", get(export_dataset))
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/:id/like", post(like_post))
        .route("/api/posts/:id/comments", post(comment_post))
        .nest_service(UPLOADS_ROUTE, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = config.addr.clone();
    let app_state = Arc::new(AppState::new(config)?);
    let app = router(app_state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/landing.html"))
}

async fn serve_sweeper() -> Html<&'static str> {
    Html(include_str!("./static/sweeper.html"))
}

async fn serve_board(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    let posts = state.posts.list()?;
    let posts_json = serde_json::to_string(&posts)?;

    let template = include_str!("./static/board.html").replace(
        "</head>",
        &format!(
            "    <script>const POSTS_DATA = {};</script>\n</head>",
            posts_json.replace("</", "<\\/")
        ),
    );

    Ok(Html(template))
}

fn summarize(id: Uuid, dataset: &Dataset, preview_rows: usize) -> DatasetSummary {
    let table = &dataset.table;
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnSummary {
            name: name.clone(),
            dtype: table.column_type_at(i),
            missing: table.rows().iter().filter(|row| row[i].is_missing()).count(),
        })
        .collect();

    DatasetSummary {
        id,
        name: dataset.name.clone(),
        size_kb: dataset.size_kb,
        rows: table.shape().0,
        columns,
        numeric_columns: table.numeric_columns(),
        preview: table.head(preview_rows).rows().to_vec(),
    }
}

fn parse_columns(columns: Option<&str>) -> Vec<String> {
    columns
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn invalid_upload(e: MultipartError) -> SweeperError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SweeperError::PayloadTooLarge(e.body_text())
    } else {
        SweeperError::Validation(format!("Invalid upload: {}", e.body_text()))
    }
}

fn task_failed(e: tokio::task::JoinError) -> SweeperError {
    SweeperError::Task(e.to_string())
}

// Clone the selected columns of a dataset so the lock is not held while
// encoding or drawing
fn projected(state: &AppState, id: Uuid, columns: Option<&str>) -> Result<(String, Table)> {
    let datasets = state.datasets();
    let dataset = datasets
        .get(&id)
        .ok_or_else(|| SweeperError::NotFound(format!("dataset {}", id)))?;
    let table = dataset.table.select(&parse_columns(columns))?;
    Ok((dataset.name.clone(), table))
}

async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: MultipartBody,
) -> Result<Json<Vec<UploadOutcome>>> {
    let mut multipart = multipart?;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        let Some(file_name) = field.file_name().map(sanitize_file_name) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(invalid_upload)?;
        files.push(UploadedFile::new(file_name, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(SweeperError::Validation("No file data received".to_string()));
    }

    // Parse off the async workers and before taking the registry lock
    let loaded = tokio::task::spawn_blocking(move || load_uploads(files))
        .await
        .map_err(task_failed)?;

    let preview_rows = state.config.preview_rows;
    let mut datasets = state.datasets();
    let outcomes = loaded
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(table) => {
                let id = Uuid::new_v4();
                let dataset = Dataset {
                    name: outcome.name,
                    size_kb: outcome.size_kb,
                    table,
                };
                let summary = summarize(id, &dataset, preview_rows);
                datasets.insert(id, dataset);
                UploadOutcome::Loaded(summary)
            }
            Err(e) => UploadOutcome::Failed {
                error: format!("Error loading {}: {}", outcome.name, e),
                name: outcome.name,
                size_kb: outcome.size_kb,
            },
        })
        .collect();

    Ok(Json(outcomes))
}

async fn get_dataset(
    path: PathParam<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DatasetSummary>> {
    let Path(id) = path?;
    let datasets = state.datasets();
    let dataset = datasets
        .get(&id)
        .ok_or_else(|| SweeperError::NotFound(format!("dataset {}", id)))?;
    Ok(Json(summarize(id, dataset, state.config.preview_rows)))
}

async fn delete_dataset(
    path: PathParam<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>> {
    let Path(id) = path?;
    match state.datasets().remove(&id) {
        Some(dataset) => {
            info!("Discarded dataset {} ({})", id, dataset.name);
            Ok(Json(StatusResponse {
                status: "ok".to_string(),
                message: None,
            }))
        }
        None => Err(SweeperError::NotFound(format!("dataset {}", id))),
    }
}

async fn clean_dataset(
    path: PathParam<Uuid>,
    State(state): State<Arc<AppState>>,
    body: JsonBody<CleaningOptions>,
) -> Result<Json<CleanResponse>> {
    let Path(id) = path?;
    let Json(options) = body?;
    let mut datasets = state.datasets();
    let dataset = datasets
        .get_mut(&id)
        .ok_or_else(|| SweeperError::NotFound(format!("dataset {}", id)))?;

    let report = apply_cleaning(&mut dataset.table, options);
    info!(
        "Cleaned {}: {} duplicates removed, {} cells filled",
        dataset.name, report.duplicates_removed, report.cells_filled
    );

    Ok(Json(CleanResponse {
        report,
        dataset: summarize(id, dataset, state.config.preview_rows),
    }))
}

async fn chart_dataset(
    path: PathParam<Uuid>,
    query: QueryParams<ColumnsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response> {
    let Path(id) = path?;
    let Query(params) = query?;
    let (name, table) = projected(&state, id, params.columns.as_deref())?;
    let options = ChartOptions {
        title: name,
        ..ChartOptions::default()
    };
    let png = tokio::task::spawn_blocking(move || create_bar_chart(&table, &options))
        .await
        .map_err(task_failed)??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn export_dataset(
    path: PathParam<Uuid>,
    query: QueryParams<ExportQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response> {
    let Path(id) = path?;
    let Query(params) = query?;
    let format = match params.format.as_deref() {
        Some(format) => format.parse()?,
        None => ExportFormat::Csv,
    };
    let (name, table) = projected(&state, id, params.columns.as_deref())?;
    let download = downloader::export(&table, &name, format)?;
    info!("Exported {} as {}", name, download.file_name);

    let ascii_name: String = download
        .file_name
        .chars()
        .map(|c| if c.is_ascii() && c != '"' && !c.is_ascii_control() { c } else { '_' })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_name,
        urlencoding::encode(&download.file_name)
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.mime_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(download.bytes))
        .map_err(|e| SweeperError::Validation(e.to_string()))
}

async fn list_posts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Post>>> {
    Ok(Json(state.posts.list()?))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    multipart: MultipartBody,
) -> Result<(StatusCode, Json<Post>)> {
    let mut multipart = multipart?;
    let mut new_post = NewPost::default();
    let mut image_bytes = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => new_post.title = field.text().await.map_err(invalid_upload)?,
            "content" => new_post.content = field.text().await.map_err(invalid_upload)?,
            "image" => {
                let bytes = field.bytes().await.map_err(invalid_upload)?;
                if !bytes.is_empty() {
                    image_bytes = Some(bytes);
                }
            }
            _ => {}
        }
    }

    if new_post.title.trim().is_empty() || new_post.content.trim().is_empty() {
        return Err(SweeperError::Validation(
            "Title and content cannot be empty".to_string(),
        ));
    }

    if let Some(bytes) = image_bytes {
        new_post.image = Some(save_image(&state.config.uploads_dir, &bytes)?);
    }

    let post = state.posts.create(new_post)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn like_post(
    path: PathParam<u64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Post>> {
    let Path(id) = path?;
    Ok(Json(state.posts.like(id)?))
}

async fn comment_post(
    path: PathParam<u64>,
    State(state): State<Arc<AppState>>,
    body: JsonBody<CommentRequest>,
) -> Result<Json<Post>> {
    let Path(id) = path?;
    let Json(payload) = body?;
    Ok(Json(state.posts.comment(
        id,
        &payload.text,
        payload.avatar.as_deref(),
    )?))
}
