use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::export_path;
use ontrack_core::csv_io;
use ontrack_core::db::Database;
use ontrack_core::error::StoreError;
use ontrack_core::models::{
    DEFAULT_CATEGORY_COLOR, NewHabit, NewHabitLog, NewTimeBlock, UpdateHabitLog, UpdateTimeBlock,
};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Database>>,
    data_dir: PathBuf,
}

impl AppState {
    fn db(&self) -> std::sync::MutexGuard<'_, Database> {
        self.db
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateHabitRequest {
    name: String,
    habit_type: String,
    target_hours: Option<i64>,
    target_value: Option<i64>,
    #[serde(default = "default_target_type")]
    target_type: String,
}

fn default_target_type() -> String {
    "binary".to_string()
}

#[derive(Deserialize)]
struct CreateLogRequest {
    habit_id: i64,
    log_date: String,
    hours_spent: Option<f64>,
    value: Option<i64>,
    #[serde(default)]
    completed: bool,
    completion_percentage: Option<i64>,
    #[serde(default)]
    notes: String,
}

/// PUT body for a log: whole-row replacement, absent fields reset to the
/// insert defaults.
#[derive(Deserialize)]
struct UpdateLogRequest {
    hours_spent: Option<f64>,
    value: Option<i64>,
    #[serde(default)]
    completed: bool,
    completion_percentage: Option<i64>,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct CategoryRequest {
    name: String,
    color: Option<String>,
}

#[derive(Deserialize)]
struct TaskRequest {
    name: String,
    category_id: Option<i64>,
}

#[derive(Deserialize)]
struct CreateBlockRequest {
    block_date: String,
    start_time: String,
    end_time: String,
    activity: String,
    category_id: Option<i64>,
    task_id: Option<i64>,
}

/// PUT body for a block; the date is fixed at creation.
#[derive(Deserialize)]
struct UpdateBlockRequest {
    start_time: String,
    end_time: String,
    activity: String,
    category_id: Option<i64>,
    task_id: Option<i64>,
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    category_id: Option<i64>,
}

#[derive(Deserialize)]
struct TasksQuery {
    category_id: Option<i64>,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: i64,
    success: bool,
}

#[derive(Serialize)]
struct OkResponse {
    success: bool,
}

fn created(id: i64) -> (StatusCode, Json<CreatedResponse>) {
    (StatusCode::CREATED, Json(CreatedResponse { id, success: true }))
}

fn ok() -> Json<OkResponse> {
    Json(OkResponse { success: true })
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
            }
        };
        (
            status,
            Json(ErrorResponse {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) | StoreError::Malformed(msg) => Self::BadRequest(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Storage(e) => Self::Internal(e.into()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{s}'. Use YYYY-MM-DD")))
}

fn parse_date_or_today(s: Option<&str>) -> Result<NaiveDate, ApiError> {
    match s {
        Some(s) => parse_date(s),
        None => Ok(Local::now().date_naive()),
    }
}

/// Resolve a `start_date`/`end_date` pair, both defaulting to today, into
/// validated ISO strings for the inclusive analytics range.
fn parse_range(query: &RangeQuery) -> Result<(String, String), ApiError> {
    let start = parse_date_or_today(query.start_date.as_deref())?;
    let end = parse_date_or_today(query.end_date.as_deref())?;
    Ok((
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    ))
}

// --- Habit handlers ---

async fn list_habits(State(state): State<AppState>) -> Result<Response, ApiError> {
    let habits = state.db().list_habits()?;
    Ok(Json(habits).into_response())
}

async fn create_habit(
    State(state): State<AppState>,
    Json(req): Json<CreateHabitRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.db().insert_habit(&NewHabit {
        name: req.name,
        habit_type: req.habit_type,
        target_hours: req.target_hours,
        target_value: req.target_value,
        target_type: req.target_type,
    })?;
    Ok(created(id))
}

async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().delete_habit(id)?;
    Ok(ok())
}

async fn get_habit_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let progress = state.db().habit_progress(id)?;
    Ok(Json(progress).into_response())
}

// --- Habit log handlers ---

async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Response, ApiError> {
    let date = parse_date_or_today(query.date.as_deref())?;
    let logs = state.db().logs_for_date(date)?;
    Ok(Json(logs).into_response())
}

async fn create_log(
    State(state): State<AppState>,
    Json(req): Json<CreateLogRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let log_date = parse_date(&req.log_date)?;
    let id = state.db().insert_log(&NewHabitLog {
        habit_id: req.habit_id,
        log_date,
        hours_spent: req.hours_spent,
        value: req.value,
        completed: req.completed,
        completion_percentage: req.completion_percentage,
        notes: req.notes,
    })?;
    Ok(created(id))
}

async fn update_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLogRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().update_log(
        id,
        &UpdateHabitLog {
            hours_spent: req.hours_spent,
            value: req.value,
            completed: req.completed,
            completion_percentage: req.completion_percentage,
            notes: req.notes,
        },
    )?;
    Ok(ok())
}

async fn delete_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().delete_log(id)?;
    Ok(ok())
}

// --- Category handlers ---

async fn list_categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state.db().list_categories()?;
    Ok(Json(categories).into_response())
}

async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let color = req.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR);
    let id = state.db().insert_category(&req.name, color)?;
    Ok(created(id))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let color = req.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR);
    state.db().update_category(id, &req.name, color)?;
    Ok(ok())
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().delete_category(id)?;
    Ok(ok())
}

// --- Task handlers ---

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TasksQuery>,
) -> Result<Response, ApiError> {
    let tasks = state.db().list_tasks(query.category_id)?;
    Ok(Json(tasks).into_response())
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.db().insert_task(&req.name, req.category_id)?;
    Ok(created(id))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().update_task(id, &req.name, req.category_id)?;
    Ok(ok())
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().delete_task(id)?;
    Ok(ok())
}

// --- Time block handlers ---

async fn list_blocks(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Response, ApiError> {
    let date = parse_date_or_today(query.date.as_deref())?;
    let day = state.db().blocks_for_date(date)?;
    Ok(Json(day).into_response())
}

async fn create_block(
    State(state): State<AppState>,
    Json(req): Json<CreateBlockRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let block_date = parse_date(&req.block_date)?;
    let id = state.db().insert_block(&NewTimeBlock {
        block_date,
        start_time: req.start_time,
        end_time: req.end_time,
        activity: req.activity,
        category_id: req.category_id,
        task_id: req.task_id,
    })?;
    Ok(created(id))
}

async fn update_block(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBlockRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().update_block(
        id,
        &UpdateTimeBlock {
            start_time: req.start_time,
            end_time: req.end_time,
            activity: req.activity,
            category_id: req.category_id,
            task_id: req.task_id,
        },
    )?;
    Ok(ok())
}

async fn delete_block(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OkResponse>, ApiError> {
    state.db().delete_block(id)?;
    Ok(ok())
}

// --- Analytics handlers ---

async fn category_analytics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let (start, end) = parse_range(&query)?;
    let analytics = state.db().category_analytics(&start, &end)?;
    Ok(Json(analytics).into_response())
}

async fn task_analytics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let (start, end) = parse_range(&query)?;
    let analytics = state.db().task_analytics(&start, &end, query.category_id)?;
    Ok(Json(analytics).into_response())
}

async fn habit_analytics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let (start, end) = parse_range(&query)?;
    let analytics = state.db().habit_analytics(&start, &end)?;
    Ok(Json(analytics).into_response())
}

// --- Export / import handlers ---

fn csv_attachment(csv: Vec<u8>, disposition: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}

async fn export_habits(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut buf = Vec::new();
    csv_io::export_habit_logs(&state.db(), &mut buf)?;
    // Keep a timestamped snapshot in the data directory alongside the download.
    let path = export_path(&state.data_dir, "habits");
    std::fs::write(&path, &buf)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(csv_attachment(
        buf,
        "attachment; filename=\"habits_export.csv\"",
    ))
}

async fn export_timeblocks(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut buf = Vec::new();
    csv_io::export_time_blocks(&state.db(), &mut buf)?;
    let path = export_path(&state.data_dir, "timeblocks");
    std::fs::write(&path, &buf)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(csv_attachment(
        buf,
        "attachment; filename=\"timeblocks_export.csv\"",
    ))
}

/// Pull the uploaded CSV out of a multipart form's `file` field.
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if field.file_name().is_none_or(str::is_empty) {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        return Ok(bytes.to_vec());
    }
    Err(ApiError::BadRequest("No file provided".to_string()))
}

async fn import_habits(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let bytes = read_upload(&mut multipart).await?;
    let report = csv_io::import_habit_logs(&state.db(), bytes.as_slice())?;
    Ok(Json(serde_json::json!({
        "success": true,
        "imported": report.imported,
        "errors": report.errors,
    }))
    .into_response())
}

async fn import_timeblocks(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let bytes = read_upload(&mut multipart).await?;
    let report = csv_io::import_time_blocks(&state.db(), bytes.as_slice())?;
    Ok(Json(serde_json::json!({
        "success": true,
        "imported": report.imported,
        "errors": report.errors,
    }))
    .into_response())
}

// --- Router ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/habits", get(list_habits).post(create_habit))
        .route("/api/habits/{id}", delete(delete_habit))
        .route("/api/habit-logs", get(list_logs).post(create_log))
        .route("/api/habit-logs/{id}", put(update_log).delete(delete_log))
        .route("/api/habit-progress/{id}", get(get_habit_progress))
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .route("/api/time-blocks", get(list_blocks).post(create_block))
        .route(
            "/api/time-blocks/{id}",
            put(update_block).delete(delete_block),
        )
        .route("/api/analytics", get(category_analytics))
        .route("/api/analytics/tasks", get(task_analytics))
        .route("/api/analytics/habits", get(habit_analytics))
        .route("/export/habits", get(export_habits))
        .route("/export/timeblocks", get(export_timeblocks))
        .route("/import/habits", post(import_habits))
        .route("/import/timeblocks", post(import_timeblocks))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    db: Database,
    port: u16,
    bind: &str,
    data_dir: PathBuf,
) -> anyhow::Result<()> {
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        data_dir,
    };

    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        eprintln!("Warning: Listening on {bind}. Any device on your network can access this API.");
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            db: Arc::new(Mutex::new(Database::open_in_memory().unwrap())),
            data_dir: std::env::temp_dir(),
        }
    }

    fn test_app() -> Router {
        build_router(test_state())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    fn put_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::put(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn habit_create_and_list() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/habits",
                &serde_json::json!({"name": "Reading", "habit_type": "daily"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["id"].is_number());

        let response = app.oneshot(get("/api/habits")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Reading");
        assert_eq!(json[0]["target_type"], "binary");
    }

    #[tokio::test]
    async fn habit_empty_name_returns_400() {
        let app = test_app();
        let response = app
            .oneshot(post_json(
                "/api/habits",
                &serde_json::json!({"name": "", "habit_type": "daily"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn log_lifecycle() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/habits",
                &serde_json::json!({"name": "Reading", "habit_type": "daily"}),
            ))
            .await
            .unwrap();
        let habit_id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/habit-logs",
                &serde_json::json!({
                    "habit_id": habit_id,
                    "log_date": "2024-06-01",
                    "hours_spent": 1.5,
                    "completed": true,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let log_id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(get("/api/habit-logs?date=2024-06-01"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Reading");
        assert_eq!(json[0]["hours_spent"], 1.5);

        // Whole-row PUT resets omitted fields.
        let response = app
            .clone()
            .oneshot(put_json(
                &format!("/api/habit-logs/{log_id}"),
                &serde_json::json!({"notes": "skipped"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get("/api/habit-logs?date=2024-06-01"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json[0]["completed"], false);
        assert!(json[0]["hours_spent"].is_null());
        assert_eq!(json[0]["notes"], "skipped");

        let response = app
            .oneshot(
                axum::http::Request::delete(format!("/api/habit-logs/{log_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);
    }

    #[tokio::test]
    async fn log_invalid_date_returns_400() {
        let app = test_app();
        let response = app
            .oneshot(get("/api/habit-logs?date=not-a-date"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_unknown_log_returns_404() {
        let app = test_app();
        let response = app
            .oneshot(put_json("/api/habit-logs/42", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn habit_progress_unknown_returns_404() {
        let app = test_app();
        let response = app.oneshot(get("/api/habit-progress/9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_category_returns_409() {
        let app = test_app();
        let body = serde_json::json!({"name": "Work"});
        let response = app
            .clone()
            .oneshot(post_json("/api/categories", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_json("/api/categories", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Category already exists");
    }

    #[tokio::test]
    async fn delete_used_category_returns_409() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/api/categories", &serde_json::json!({"name": "Work"})))
            .await
            .unwrap();
        let cat_id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/time-blocks",
                &serde_json::json!({
                    "block_date": "2024-06-01",
                    "start_time": "09:00",
                    "end_time": "10:00",
                    "activity": "inbox",
                    "category_id": cat_id,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                axum::http::Request::delete(format!("/api/categories/{cat_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Cannot delete. 1 time blocks use this category.");
    }

    #[tokio::test]
    async fn block_day_view_totals() {
        let app = test_app();
        for (start, end) in [("09:00", "10:30"), ("11:00", "11:45")] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/time-blocks",
                    &serde_json::json!({
                        "block_date": "2024-06-01",
                        "start_time": start,
                        "end_time": end,
                        "activity": "work",
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(get("/api/time-blocks?date=2024-06-01"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["blocks"].as_array().unwrap().len(), 2);
        assert_eq!(json["total_minutes"], 135);
        assert_eq!(json["total_hours"], 2.25);
    }

    #[tokio::test]
    async fn block_bad_time_returns_400() {
        let app = test_app();
        let response = app
            .oneshot(post_json(
                "/api/time-blocks",
                &serde_json::json!({
                    "block_date": "2024-06-01",
                    "start_time": "nine",
                    "end_time": "10:00",
                    "activity": "work",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid time 'nine'. Use HH:MM");
    }

    #[tokio::test]
    async fn analytics_defaults_to_today() {
        let app = test_app();
        let response = app.oneshot(get("/api/analytics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(json["start_date"], today);
        assert_eq!(json["end_date"], today);
        assert_eq!(json["total_minutes"], 0);
    }

    #[tokio::test]
    async fn analytics_invalid_range_returns_400() {
        let app = test_app();
        let response = app
            .oneshot(get("/api/analytics/habits?start_date=junk"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_habits_is_csv_attachment() {
        let app = test_app();
        let response = app.oneshot(get("/export/habits")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/csv");
        assert_eq!(
            response.headers().get("content-disposition").unwrap(),
            "attachment; filename=\"habits_export.csv\""
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("Habit Name,Type,Target Hours,Date,Hours Spent,Completed,Notes"));
    }

    fn multipart_upload(uri: &str, csv: &str) -> axum::http::Request<Body> {
        let boundary = "ontrack-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"upload.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{boundary}--\r\n"
        );
        axum::http::Request::post(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn import_habits_multipart() {
        let app = test_app();
        let csv = "Habit Name,Type,Target Hours,Date,Hours Spent,Completed,Notes\n\
                   Reading,daily,30,2024-06-01,1.5,true,chapter 3\n\
                   Reading,daily,30,bad-date,,,\n";
        let response = app
            .clone()
            .oneshot(multipart_upload("/import/habits", csv))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["imported"], 1);
        assert_eq!(json["errors"].as_array().unwrap().len(), 1);

        let response = app.oneshot(get("/api/habits")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Reading");
    }

    #[tokio::test]
    async fn import_timeblocks_multipart() {
        let app = test_app();
        let csv = "Date,Start Time,End Time,Activity,Duration (minutes),Category,Task\n\
                   2024-06-01,09:00,10:00,inbox,60,,\n";
        let response = app
            .clone()
            .oneshot(multipart_upload("/import/timeblocks", csv))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["imported"], 1);

        let response = app
            .oneshot(get("/api/time-blocks?date=2024-06-01"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["total_minutes"], 60);
    }

    #[tokio::test]
    async fn import_without_file_field_returns_400() {
        let app = test_app();
        let boundary = "ontrack-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"other\"\r\n\r\n\
             hello\r\n\
             --{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                axum::http::Request::post("/import/habits")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No file provided");
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app();
        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/habits")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
