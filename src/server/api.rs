use crate::agent::ChatAgent;
use crate::error::ChatError;
use crate::models::chat::{ ChatRequest, ChatResponse, ErrorResponse };
use axum::{
    extract::{ rejection::JsonRejection, State },
    http::StatusCode,
    response::{ IntoResponse, Response },
    routing::post,
    Json,
    Router,
};
use log::debug;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            ChatError::Validation(_) => (StatusCode::BAD_REQUEST, "Message is required"),
            ChatError::Completion(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (code, Json(ErrorResponse { error: message.to_string() })).into_response()
    }
}

pub fn build_router(agent: Arc<ChatAgent>, static_dir: &str) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .with_state(AppState { agent })
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Result<Json<ChatResponse>, ChatError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected chat body: {}", rejection);
            return Err(ChatError::Validation(rejection.body_text()));
        }
    };

    let response = state.agent.process_message(request.message.as_deref()).await?;

    Ok(Json(ChatResponse { response }))
}
