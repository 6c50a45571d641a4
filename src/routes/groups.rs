use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::Matchmaker;
use crate::error::MatchError;
use crate::models::requests::into_roster;
use crate::models::{
    ErrorResponse, HealthResponse, MatchGroupsRequest, MatchGroupsResponse, MatchSummary,
    SelectThemesRequest, SelectThemesResponse,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matchmaker: Arc<Matchmaker>,
}

/// Configure all group-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/groups/match", web::post().to(match_groups))
        .route("/themes/select", web::post().to(select_themes));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

fn engine_error(err: &MatchError) -> HttpResponse {
    if err.is_invalid_input() {
        tracing::info!("Rejected match input: {}", err);
        HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid input".to_string(),
            message: err.to_string(),
            status_code: 400,
        })
    } else {
        tracing::error!("Matching failed: {}", err);
        HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Matching failed".to_string(),
            message: err.to_string(),
            status_code: 500,
        })
    }
}

fn blocking_error(err: actix_web::error::BlockingError) -> HttpResponse {
    tracing::error!("Matching task did not complete: {}", err);
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Matching task failed".to_string(),
        message: err.to_string(),
        status_code: 500,
    })
}

/// Fill groups with attendees
///
/// POST /api/v1/groups/match
///
/// Request body:
/// ```json
/// {
///   "groups": [{"facilitator": "uuid", "themes": ["arcane"], "date": "2024-06-01"}],
///   "attendees": [{"id": "uuid", "name": "string", "personas": [...]}]
/// }
/// ```
async fn match_groups(
    state: web::Data<AppState>,
    req: web::Json<MatchGroupsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let MatchGroupsRequest { mut groups, attendees } = req.into_inner();
    let roster = match into_roster(attendees) {
        Ok(roster) => roster,
        Err(e) => return engine_error(&e),
    };

    tracing::info!("Matching {} attendees into {} groups", roster.len(), groups.len());

    // The engine is synchronous; keep it off the async workers
    let matchmaker = Arc::clone(&state.matchmaker);
    let result = web::block(move || {
        matchmaker
            .match_groups(&mut groups, &roster)
            .map(|report| (groups, report))
    })
    .await;

    match result {
        Ok(Ok((groups, report))) => HttpResponse::Ok().json(MatchGroupsResponse {
            groups,
            summary: MatchSummary::from(&report),
        }),
        Ok(Err(e)) => engine_error(&e),
        Err(e) => blocking_error(e),
    }
}

/// Pick a theme for each group
///
/// POST /api/v1/themes/select
///
/// Request body:
/// ```json
/// {
///   "groupCount": 3,
///   "attendees": [{"id": "uuid", "name": "string", "personas": [...]}]
/// }
/// ```
async fn select_themes(
    state: web::Data<AppState>,
    req: web::Json<SelectThemesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let SelectThemesRequest { group_count, attendees } = req.into_inner();
    let roster = match into_roster(attendees) {
        Ok(roster) => roster,
        Err(e) => return engine_error(&e),
    };

    let matchmaker = Arc::clone(&state.matchmaker);
    let result = web::block(move || matchmaker.select_themes(group_count, &roster)).await;

    match result {
        Ok(Ok(selection)) => {
            tracing::debug!("Theme selection evaluated {} combinations", selection.evaluated);
            HttpResponse::Ok().json(SelectThemesResponse::from(selection))
        }
        Ok(Err(e)) => engine_error(&e),
        Err(e) => blocking_error(e),
    }
}
