use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::error::PredictorError;
use crate::models::{
    AccuracyStats, ApiResponse, HeadToHeadMatch, MatchInput, NewHeadToHeadMatch, Prediction, ResultCheck,
    ScorePerformance, TeamCoefficientProfile,
};
use crate::services::head_to_head::{summarize, HeadToHeadSummary};
use crate::services::{GeneratedPrediction, PredictionEngine, ResultChecker, TeamProfiles};
use crate::store::{HeadToHeadStore, PredictionStore};
use crate::utils::{normalize_team_name, parse_match_datetime};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PredictionEngine>,
    pub predictions: PredictionStore,
    pub head_to_head: HeadToHeadStore,
    pub checker: Arc<ResultChecker>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            engine: Arc::new(PredictionEngine::from_settings(settings)),
            predictions: PredictionStore::new(settings.simulated_latency),
            head_to_head: HeadToHeadStore::new(settings.simulated_latency),
            checker: Arc::new(ResultChecker::new(
                settings.result_cache_ttl,
                settings.simulated_latency,
                settings.seed,
            )),
        }
    }
}

pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let app = create_router().with_state(AppState::from_settings(settings));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    tracing::info!("ScoreForge API server listening on port {}", settings.port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/predictions", get(list_predictions_handler).post(generate_prediction_handler))
        .route("/predictions/stats", get(accuracy_stats_handler))
        .route("/predictions/export.csv", get(export_csv_handler))
        .route("/predictions/check", post(check_pending_handler))
        .route("/predictions/range", get(predictions_in_range_handler))
        .route("/predictions/{id}", get(get_prediction_handler).delete(delete_prediction_handler))
        .route("/predictions/{id}/result", put(update_result_handler))
        .route(
            "/head-to-head",
            get(list_head_to_head_handler)
                .post(add_head_to_head_handler)
                .delete(clear_head_to_head_handler),
        )
        .route("/head-to-head/summary", get(head_to_head_summary_handler))
        .route("/head-to-head/{id}", delete(remove_head_to_head_handler))
        .route("/teams/profiles", get(team_profiles_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

fn error_response(err: PredictorError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &err {
        PredictorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictorError::LookupNotFound(_) | PredictorError::HeadToHeadNotFound(_) => StatusCode::NOT_FOUND,
        PredictorError::HeadToHeadFull { .. } => StatusCode::CONFLICT,
        PredictorError::EnrichmentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PredictorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ScoreForge API is running"))
}

// POST /predictions - Generate and store a prediction
async fn generate_prediction_handler(
    State(state): State<AppState>,
    Json(input): Json<MatchInput>,
) -> ApiResult<GeneratedPrediction> {
    let history = state.head_to_head.get_all().await;
    let mut generated = state
        .engine
        .generate_prediction(&input, &history)
        .await
        .map_err(error_response)?;

    generated.prediction = state.predictions.create(generated.prediction).await;
    Ok(Json(ApiResponse::success(generated)))
}

// GET /predictions - Prediction history, optionally filtered by team
#[derive(Deserialize)]
struct PredictionQuery {
    home: Option<String>,
    away: Option<String>,
}

async fn list_predictions_handler(
    State(state): State<AppState>,
    Query(params): Query<PredictionQuery>,
) -> ApiResult<Vec<Prediction>> {
    let predictions = match (params.home, params.away) {
        (Some(home), Some(away)) => state.predictions.get_by_teams(&home, &away).await,
        (Some(home), None) => {
            let home = normalize_team_name(&home);
            let mut all = state.predictions.get_all().await;
            all.retain(|p| normalize_team_name(&p.home_team).contains(&home));
            all
        }
        (None, Some(away)) => {
            let away = normalize_team_name(&away);
            let mut all = state.predictions.get_all().await;
            all.retain(|p| normalize_team_name(&p.away_team).contains(&away));
            all
        }
        (None, None) => state.predictions.get_all().await,
    };
    Ok(Json(ApiResponse::success(predictions)))
}

// GET /predictions/range?from=&to= - Predictions whose kick-off falls in the window
#[derive(Deserialize)]
struct RangeQuery {
    from: String,
    to: String,
}

async fn predictions_in_range_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeQuery>,
) -> ApiResult<Vec<Prediction>> {
    let (Some(start), Some(end)) = (parse_match_datetime(&params.from), parse_match_datetime(&params.to)) else {
        return Err(error_response(PredictorError::Validation(
            "from and to must be valid dates".to_string(),
        )));
    };
    Ok(Json(ApiResponse::success(state.predictions.get_by_date_range(start, end).await)))
}

async fn get_prediction_handler(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Prediction> {
    state
        .predictions
        .get_by_id(id)
        .await
        .map(|p| Json(ApiResponse::success(p)))
        .map_err(error_response)
}

async fn delete_prediction_handler(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Prediction> {
    state
        .predictions
        .delete(id)
        .await
        .map(|p| Json(ApiResponse::success(p)))
        .map_err(error_response)
}

// PUT /predictions/{id}/result - Attach the actual score
#[derive(Deserialize)]
struct ResultRequest {
    actual_score: String,
}

async fn update_result_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ResultRequest>,
) -> ApiResult<Prediction> {
    if request.actual_score.trim().is_empty() {
        return Err(error_response(PredictorError::Validation("actual score is required".to_string())));
    }
    state
        .predictions
        .update_result(id, &request.actual_score)
        .await
        .map(|p| Json(ApiResponse::success(p)))
        .map_err(error_response)
}

#[derive(Serialize)]
struct StatsResponse {
    accuracy: AccuracyStats,
    top_scores: Vec<ScorePerformance>,
}

async fn accuracy_stats_handler(State(state): State<AppState>) -> ApiResult<StatsResponse> {
    let accuracy = state.predictions.accuracy_stats().await;
    let top_scores = state.predictions.top_performing_scores().await;
    Ok(Json(ApiResponse::success(StatsResponse { accuracy, top_scores })))
}

async fn export_csv_handler(State(state): State<AppState>) -> Response {
    match state.predictions.export_csv().await {
        Ok(body) => ([(header::CONTENT_TYPE, "text/csv")], body).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

// POST /predictions/check - Check every pending prediction against live results
async fn check_pending_handler(State(state): State<AppState>) -> ApiResult<Vec<ResultCheck>> {
    state
        .checker
        .check_all_pending(&state.predictions)
        .await
        .map(|checks| Json(ApiResponse::success(checks)))
        .map_err(error_response)
}

async fn list_head_to_head_handler(State(state): State<AppState>) -> ApiResult<Vec<HeadToHeadMatch>> {
    Ok(Json(ApiResponse::success(state.head_to_head.get_all().await)))
}

async fn add_head_to_head_handler(
    State(state): State<AppState>,
    Json(request): Json<NewHeadToHeadMatch>,
) -> ApiResult<HeadToHeadMatch> {
    state
        .head_to_head
        .add(request)
        .await
        .map(|m| Json(ApiResponse::success(m)))
        .map_err(error_response)
}

async fn remove_head_to_head_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<HeadToHeadMatch> {
    state
        .head_to_head
        .remove(id)
        .await
        .map(|m| Json(ApiResponse::success(m)))
        .map_err(error_response)
}

async fn clear_head_to_head_handler(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.head_to_head.clear().await;
    Ok(Json(ApiResponse::success("Head-to-head history cleared")))
}

// GET /head-to-head/summary?home=&away=
#[derive(Deserialize)]
struct SummaryQuery {
    home: String,
    away: String,
}

async fn head_to_head_summary_handler(
    State(state): State<AppState>,
    Query(params): Query<SummaryQuery>,
) -> ApiResult<HeadToHeadSummary> {
    let history = state.head_to_head.get_all().await;
    Ok(Json(ApiResponse::success(summarize(&params.home, &params.away, &history))))
}

#[derive(Serialize)]
struct NamedProfile {
    team: &'static str,
    profile: TeamCoefficientProfile,
}

async fn team_profiles_handler() -> Json<ApiResponse<Vec<NamedProfile>>> {
    let profiles = TeamProfiles::new()
        .all()
        .into_iter()
        .map(|(team, profile)| NamedProfile { team, profile })
        .collect();
    Json(ApiResponse::success(profiles))
}
