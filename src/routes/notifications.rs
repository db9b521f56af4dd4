use anyhow::Result;
use axum::{Json, extract::State, response::IntoResponse};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::Deserialize;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    mailer::NotificationKind,
    middleware,
    notify::{self, NotificationReport},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(send_notification))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct SendNotificationReq {
    pub order_id: i32,
    pub kind: NotificationKind,
    /// Subject override, only honored for custom notifications.
    pub subject: Option<String>,
    /// Free-form body for custom notifications.
    pub message: Option<String>,
}

/// Send (or re-send) an order notification to the order's company. The
/// response reports how many recipients were reached; individual send
/// failures are logged, not returned as errors.
#[utoipa::path(
    post,
    path = "/send-notification",
    tags = ["Notifications"],
    security(("bearerAuth" = [])),
    request_body = SendNotificationReq,
    responses(
        (status = 200, description = "Dispatched notification", body = StdResponse<NotificationReport, String>)
    )
)]
async fn send_notification(
    State(state): State<AppState>,
    Json(body): Json<SendNotificationReq>,
) -> Result<impl IntoResponse, AppError> {
    let report = notify::dispatch_order_notification(
        &state,
        body.order_id,
        body.kind,
        body.subject,
        body.message,
    )
    .await?;

    Ok(StdResponse {
        data: Some(report),
        message: Some("Dispatched notification"),
    })
}
