use anyhow::{Context, Result};
use axum::{Extension, Json, extract::State, response::IntoResponse};
use diesel::QueryDsl;
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::Deserialize;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, UserIdentity},
    models::UserEntity,
    schema::users,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/feedback",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(submit_feedback))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct SubmitFeedbackReq {
    pub subject: Option<String>,
    pub message: String,
}

/// Forward user feedback to the admin mailbox.
#[utoipa::path(
    post,
    path = "/submit",
    tags = ["Feedback"],
    security(("bearerAuth" = [])),
    request_body = SubmitFeedbackReq,
    responses(
        (status = 200, description = "Submitted feedback successfully", body = StdResponse<String, String>)
    )
)]
async fn submit_feedback(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(body): Json<SubmitFeedbackReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::BadRequest("Feedback message is empty".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table
        .find(identity.user_id)
        .get_result(conn)
        .await
        .context("Failed to get user")?;

    let subject = body
        .subject
        .filter(|subject| !subject.trim().is_empty())
        .unwrap_or_else(|| "Partner portal feedback".to_string());
    let html = format!(
        "<p>From: {} &lt;{}&gt;</p><p>{}</p>",
        user.name, user.email, body.message
    );

    state
        .mailer
        .send(&state.admin_mailbox, &subject, &html)
        .await?;

    Ok(StdResponse::<String, _> {
        data: None,
        message: Some("Submitted feedback successfully"),
    })
}
