use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::result::DatabaseErrorKind;
use diesel::{ExpressionMethods, NullableExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::Serialize;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::{CompanyEntity, CreateCompanyEntity, UpdateCompanyEntity},
    schema::{classes, companies, support_fund_levels},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/companies",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_companies))
            .routes(utoipa_axum::routes!(get_company))
            .routes(utoipa_axum::routes!(create_company))
            .routes(utoipa_axum::routes!(update_company))
            .routes(utoipa_axum::routes!(delete_company))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

#[derive(Serialize, ToSchema)]
struct GetCompanyRes {
    pub company: CompanyEntity,
    pub class_name: String,
    pub support_fund_percent: Option<f32>,
}

/// Fetch all companies with their resolved class and support-fund level.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Companies"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all companies", body = StdResponse<Vec<GetCompanyRes>, String>)
    )
)]
async fn get_companies(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(CompanyEntity, String, Option<f32>)> = companies::table
        .inner_join(classes::table)
        .left_join(support_fund_levels::table)
        .select((
            CompanyEntity::as_select(),
            classes::name,
            support_fund_levels::percent.nullable(),
        ))
        .order_by(companies::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get companies")?;

    let companies_res: Vec<GetCompanyRes> = rows
        .into_iter()
        .map(|(company, class_name, support_fund_percent)| GetCompanyRes {
            company,
            class_name,
            support_fund_percent,
        })
        .collect();

    Ok(StdResponse {
        data: Some(companies_res),
        message: Some("Get companies successfully"),
    })
}

/// Fetch a single company with its resolved class and support-fund level.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Companies"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Company ID to fetch")
    ),
    responses(
        (status = 200, description = "Get company successfully", body = StdResponse<GetCompanyRes, String>)
    )
)]
async fn get_company(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let row: QueryResult<(CompanyEntity, String, Option<f32>)> = companies::table
        .find(id)
        .inner_join(classes::table)
        .left_join(support_fund_levels::table)
        .select((
            CompanyEntity::as_select(),
            classes::name,
            support_fund_levels::percent.nullable(),
        ))
        .get_result(conn)
        .await;

    match row {
        Ok((company, class_name, support_fund_percent)) => Ok(StdResponse {
            data: Some(GetCompanyRes {
                company,
                class_name,
                support_fund_percent,
            }),
            message: Some("Get company successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Create a new company.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Companies"],
    security(("bearerAuth" = [])),
    request_body = CreateCompanyEntity,
    responses(
        (status = 200, description = "Created company successfully", body = StdResponse<CompanyEntity, String>)
    )
)]
async fn create_company(
    State(state): State<AppState>,
    Json(body): Json<CreateCompanyEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let company: QueryResult<CompanyEntity> = diesel::insert_into(companies::table)
        .values(body)
        .returning(CompanyEntity::as_returning())
        .get_result(conn)
        .await;

    match company {
        Ok(company) => Ok(StdResponse {
            data: Some(company),
            message: Some("Created company successfully"),
        }),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
            AppError::BadRequest("Unknown class or support fund level".into()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Update a company.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Companies"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Company ID to update")
    ),
    request_body = UpdateCompanyEntity,
    responses(
        (status = 200, description = "Updated company successfully", body = StdResponse<CompanyEntity, String>)
    )
)]
async fn update_company(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateCompanyEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let company: QueryResult<CompanyEntity> = diesel::update(companies::table.find(id))
        .set((body, companies::updated_at.eq(diesel::dsl::now)))
        .returning(CompanyEntity::as_returning())
        .get_result(conn)
        .await;

    match company {
        Ok(company) => Ok(StdResponse {
            data: Some(company),
            message: Some("Updated company successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
            AppError::BadRequest("Unknown class or support fund level".into()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

#[derive(Serialize, ToSchema)]
struct DeleteCompanyRes {
    pub deleted_company: CompanyEntity,
}

/// Delete a company. Companies with orders, users or notes cannot be
/// deleted.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Companies"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Company ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted company successfully", body = StdResponse<DeleteCompanyRes, String>)
    )
)]
async fn delete_company(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let company: QueryResult<CompanyEntity> = diesel::delete(companies::table.find(id))
        .returning(CompanyEntity::as_returning())
        .get_result(conn)
        .await;

    match company {
        Ok(deleted_company) => Ok(StdResponse {
            data: Some(DeleteCompanyRes { deleted_company }),
            message: Some("Deleted company successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
            AppError::Conflict("Company is referenced by orders, users or notes".into()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}
