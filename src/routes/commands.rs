use crate::core::{MatchError, MatchMaker, MatchOutcome};
use crate::models::{
    CommandResponse, ErrorResponse, HealthResponse, MatchInfoResponse, MatchResponse,
    RegisterRequest, UserActionRequest,
};
use crate::services::MatchmakingStore;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matchmaker: Arc<MatchMaker>,
    pub store: Arc<MatchmakingStore>,
}

/// Configure all command routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/register", web::post().to(register))
        .route("/match/find", web::post().to(find_match))
        .route("/match/confirm-date", web::post().to(confirm_date))
        .route("/match/unmatch", web::post().to(unmatch))
        .route("/match/reject", web::post().to(reject_match))
        .route("/match/info", web::get().to(match_info))
        .route("/queue/leave", web::post().to(leave_queue))
        .route("/help", web::get().to(help));
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Map a core error onto an HTTP reply
///
/// Precondition failures are the caller's problem (400); a provisioning
/// failure is transient (503) and worth retrying.
fn match_error_response(err: MatchError) -> HttpResponse {
    match err {
        MatchError::ChannelProvisioning(_) => {
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "channel_provisioning_failed".to_string(),
                message: err.to_string(),
                status_code: 503,
            })
        }
        _ => HttpResponse::BadRequest().json(ErrorResponse {
            error: "precondition_failed".to_string(),
            message: err.to_string(),
            status_code: 400,
        }),
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
    .customize()
    .insert_header(("x-queue-length", state.store.queue_len().to_string()))
}

/// Register or update a profile
///
/// POST /api/v1/register
async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for register request: {:?}", errors);
        return validation_failed(errors);
    }

    let tokens = req.preference_tokens();
    let result = state
        .matchmaker
        .register(
            &req.user_id,
            &req.name,
            req.age,
            &req.gender,
            &tokens,
            &req.bio,
        )
        .await;

    match result {
        Ok(registration) => {
            let mut message = if registration.updated {
                "Registration updated successfully! Your data has been updated.".to_string()
            } else {
                "Registration successful! Your data has been saved.".to_string()
            };
            if let Some(MatchOutcome::Matched { channel_ref, .. }) = &registration.paired {
                message.push_str(&format!(
                    " You have been matched! Your private channel is: {}",
                    channel_ref
                ));
            }
            HttpResponse::Ok().json(CommandResponse::new(message))
        }
        Err(e) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "invalid_registration".to_string(),
            message: e.to_string(),
            status_code: 400,
        }),
    }
}

/// Find a match or join the queue
///
/// POST /api/v1/match/find
async fn find_match(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.matchmaker.attempt_match(&req.user_id).await {
        Ok(MatchOutcome::Matched {
            partner_id,
            channel_ref,
        }) => HttpResponse::Ok().json(MatchResponse {
            outcome: "matched".to_string(),
            message: format!(
                "You have been matched! Your private channel is: {}",
                channel_ref
            ),
            partner_id: Some(partner_id),
            channel_ref: Some(channel_ref),
        }),
        Ok(MatchOutcome::Queued) => HttpResponse::Ok().json(MatchResponse {
            outcome: "queued".to_string(),
            message: "No match found at the moment. You have been added to the queue. \
                      We will notify you once a match is found."
                .to_string(),
            partner_id: None,
            channel_ref: None,
        }),
        Err(e) => match_error_response(e),
    }
}

/// Confirm a successful date
///
/// POST /api/v1/match/confirm-date
async fn confirm_date(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.matchmaker.confirm_date(&req.user_id).await {
        Ok(_) => HttpResponse::Ok().json(CommandResponse::new(
            "Congratulations! You and your match are now officially dating!",
        )),
        Err(e) => match_error_response(e),
    }
}

/// End the current match without penalty
///
/// POST /api/v1/match/unmatch
async fn unmatch(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.matchmaker.unmatch(&req.user_id).await {
        Ok(_) => HttpResponse::Ok().json(CommandResponse::new(
            "Your match has ended. You are free to find a new match.",
        )),
        Err(e) => match_error_response(e),
    }
}

/// Reject the current match and permanently block the pair
///
/// POST /api/v1/match/reject
async fn reject_match(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.matchmaker.reject(&req.user_id).await {
        Ok(_) => HttpResponse::Ok().json(CommandResponse::new(
            "You have rejected the match. You will no longer match with this user again.",
        )),
        Err(e) => match_error_response(e),
    }
}

/// Partner profile snapshot for the current match
///
/// GET /api/v1/match/info?userId={userId}
async fn match_info(
    state: web::Data<AppState>,
    query: web::Query<UserActionRequest>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    match state.matchmaker.match_info(&query.user_id) {
        Ok((partner, _record)) => HttpResponse::Ok().json(MatchInfoResponse {
            name: partner.name,
            age: partner.age,
            gender: partner.gender.to_string(),
            bio: partner.bio,
        }),
        Err(e) => match_error_response(e),
    }
}

/// Leave the waiting queue
///
/// POST /api/v1/queue/leave
async fn leave_queue(
    state: web::Data<AppState>,
    req: web::Json<UserActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.matchmaker.leave_queue(&req.user_id) {
        Ok(()) => HttpResponse::Ok().json(CommandResponse::new(
            "You have been removed from the queue.",
        )),
        Err(e) => match_error_response(e),
    }
}

/// List all available commands
///
/// GET /api/v1/help
async fn help() -> impl Responder {
    let help_message = "Available commands:\n\n\
        register - Register or update your dating profile\n\
        find-match - Find a match based on your gender preference\n\
        unmatch - End the current match without rejecting\n\
        reject-match - Reject your current match; you will never match them again\n\
        get-match-info - Get information about your current match\n\
        confirm-date - Confirm a successful date and start officially dating\n\
        leave-queue - Remove yourself from the matching queue\n\
        help - List all available commands";

    HttpResponse::Ok().json(CommandResponse::new(help_message))
}
