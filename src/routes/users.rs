use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use serde::{Deserialize, Serialize};

use crate::{
    aliases::DieselError,
    api::auth_admin,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, UserIdentity},
    models::{CreateUserEntity, UserEntity},
    schema::users,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new()
        .nest(
            "/api/users",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(get_users))
                .routes(utoipa_axum::routes!(create_user))
                .routes(utoipa_axum::routes!(send_reset_link))
                .routes(utoipa_axum::routes!(delete_user))
                .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
        )
        .nest(
            "/api/auth",
            OpenApiRouter::new()
                .routes(utoipa_axum::routes!(reset_password))
                .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
        )
}

/// Fetch all portal users.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all users", body = StdResponse<Vec<UserEntity>, String>)
    )
)]
async fn get_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let users: Vec<UserEntity> = users::table
        .order_by(users::email.asc())
        .get_results(conn)
        .await
        .context("Failed to get users")?;

    Ok(StdResponse {
        data: Some(users),
        message: Some("Get users successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateUserReq {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub company_id: Option<i32>,
}

/// Provision a new portal user: create the auth record through the provider
/// admin API, then mirror it as a profile row. If the profile insert fails
/// the auth record is left in place; the error is surfaced so the admin can
/// retry.
#[utoipa::path(
    post,
    path = "/create",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = CreateUserReq,
    responses(
        (status = 200, description = "Created user successfully", body = StdResponse<UserEntity, String>)
    )
)]
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserReq>,
) -> Result<impl IntoResponse, AppError> {
    match body.role.as_str() {
        "admin" | "client" => {}
        _ => {
            return Err(AppError::BadRequest(format!(
                "{} is not a valid role",
                body.role
            )));
        }
    }
    if body.role == "client" && body.company_id.is_none() {
        return Err(AppError::BadRequest(
            "Client users must be linked to a company".into(),
        ));
    }

    let auth_id = auth_admin::create_auth_user(state.http_client.clone(), &body.email, &body.password)
        .await?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: QueryResult<UserEntity> = diesel::insert_into(users::table)
        .values(CreateUserEntity {
            id: auth_id,
            email: body.email,
            name: body.name,
            role: body.role,
            company_id: body.company_id,
        })
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await;

    let user = match user {
        Ok(user) => user,
        Err(err) => {
            // The auth record already exists at the provider; deliberately
            // not rolled back so the admin can retry the profile step.
            tracing::error!(
                auth_id = %auth_id,
                "Failed to create user profile after auth record was created: {:?}",
                err
            );
            return Err(AppError::Other(err.into()));
        }
    };

    Ok(StdResponse {
        data: Some(user),
        message: Some("Created user successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct SendResetLinkReq {
    pub email: String,
}

/// Generate a password-recovery link for a user and email it to them.
#[utoipa::path(
    post,
    path = "/send-reset-link",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = SendResetLinkReq,
    responses(
        (status = 200, description = "Sent reset link successfully", body = StdResponse<String, String>)
    )
)]
async fn send_reset_link(
    State(state): State<AppState>,
    Json(body): Json<SendResetLinkReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: QueryResult<UserEntity> = users::table
        .filter(users::email.eq(&body.email))
        .get_result(conn)
        .await;

    let user = match user {
        Ok(user) => user,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let link = auth_admin::generate_recovery_link(state.http_client.clone(), &user.email).await?;
    let (subject, html) = state
        .mailer
        .templates()
        .render_password_reset(&user.name, &link)?;
    state.mailer.send(&user.email, &subject, &html).await?;

    Ok(StdResponse::<String, _> {
        data: None,
        message: Some("Sent reset link successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct ResetPasswordReq {
    pub new_password: String,
}

/// Set a new password for the authenticated user through the provider admin
/// API.
#[utoipa::path(
    post,
    path = "/reset-password",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    request_body = ResetPasswordReq,
    responses(
        (status = 200, description = "Password updated successfully", body = StdResponse<String, String>)
    )
)]
async fn reset_password(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(body): Json<ResetPasswordReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    auth_admin::update_user_password(
        state.http_client.clone(),
        identity.user_id,
        &body.new_password,
    )
    .await?;

    Ok(StdResponse::<String, _> {
        data: None,
        message: Some("Password updated successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct DeleteUserRes {
    pub deleted_user: UserEntity,
}

/// Delete a portal user. The profile row is removed first; if the provider
/// then fails to delete the auth record, the failure is logged and the
/// request still succeeds.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Users"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted user successfully", body = StdResponse<DeleteUserRes, String>)
    )
)]
async fn delete_user(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: QueryResult<UserEntity> = diesel::delete(users::table.find(id))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await;

    let deleted_user = match user {
        Ok(user) => user,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    if let Err(err) = auth_admin::delete_auth_user(state.http_client.clone(), id).await {
        // Availability over consistency: the profile row is gone, leave the
        // orphaned auth record for a manual cleanup.
        tracing::warn!(
            user_id = %id,
            "Failed to delete auth record after profile removal: {:?}",
            err
        );
    }

    Ok(StdResponse {
        data: Some(DeleteUserRes { deleted_user }),
        message: Some("Deleted user successfully"),
    })
}
