use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::result::DatabaseErrorKind;
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::Serialize;

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::{CreateProductEntity, ProductEntity, UpdateProductEntity},
    schema::products,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products))
            .routes(utoipa_axum::routes!(get_product))
            .routes(utoipa_axum::routes!(create_product))
            .routes(utoipa_axum::routes!(update_product))
            .routes(utoipa_axum::routes!(delete_product))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

/// Fetch the full product list, including disabled products.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let products: Vec<ProductEntity> = products::table
        .order_by(products::sku.asc())
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

/// Fetch a single product.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn get_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: QueryResult<ProductEntity> = products::table.find(id).get_result(conn).await;

    match product {
        Ok(product) => Ok(StdResponse {
            data: Some(product),
            message: Some("Get product successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Create a new product.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    request_body = CreateProductEntity,
    responses(
        (status = 200, description = "Created product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    if body.case_pack < 1 {
        return Err(AppError::BadRequest("case_pack must be at least 1".into()));
    }

    let product: QueryResult<ProductEntity> = diesel::insert_into(products::table)
        .values(body)
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match product {
        Ok(product) => Ok(StdResponse {
            data: Some(product),
            message: Some("Created product successfully"),
        }),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
            AppError::Conflict("A product with this sku already exists".into()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Update a product's mutable fields (prices, flags, case pack).
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductEntity,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn update_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    if matches!(body.case_pack, Some(pack) if pack < 1) {
        return Err(AppError::BadRequest("case_pack must be at least 1".into()));
    }

    let product: QueryResult<ProductEntity> = diesel::update(products::table.find(id))
        .set((body, products::updated_at.eq(diesel::dsl::now)))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match product {
        Ok(product) => Ok(StdResponse {
            data: Some(product),
            message: Some("Updated product successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

#[derive(Serialize, ToSchema)]
struct DeleteProductRes {
    pub deleted_product: ProductEntity,
}

/// Delete a product. Products referenced by order items cannot be deleted;
/// disable them instead.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Products"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted product successfully", body = StdResponse<DeleteProductRes, String>)
    )
)]
async fn delete_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: QueryResult<ProductEntity> = diesel::delete(products::table.find(id))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await;

    match product {
        Ok(deleted_product) => Ok(StdResponse {
            data: Some(DeleteProductRes { deleted_product }),
            message: Some("Deleted product successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => Err(
            AppError::Conflict("Product is referenced by existing orders".into()),
        ),
        Err(err) => Err(AppError::Other(err.into())),
    }
}
