use anyhow::{Context, Result};
use axum::{Extension, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::Serialize;

use crate::{
    api::storage,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, ClientIdentity},
    models::ProductEntity,
    pricing,
    schema::{classes, companies, products},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/clients/catalog",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_catalog))
            .route_layer(axum::middleware::from_fn(
                middleware::clients_authorization,
            )),
    )
}

#[derive(Serialize, ToSchema)]
struct CatalogItemRes {
    pub product: ProductEntity,
    /// Price resolved for the caller's class.
    pub unit_price: f32,
    /// Public URL of the product image, when one was uploaded.
    pub image_url: Option<String>,
}

/// Fetch the products orderable by the authenticated client's company:
/// enabled and visible to the company's class, with the class price applied.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Catalog"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List the catalog", body = StdResponse<Vec<CatalogItemRes>, String>)
    )
)]
async fn get_catalog(
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let class_name: String = companies::table
        .find(identity.company_id)
        .inner_join(classes::table)
        .select(classes::name)
        .get_result(conn)
        .await
        .context("Failed to get company class")?;

    let all_products: Vec<ProductEntity> = products::table
        .filter(products::enable.eq(true))
        .order_by(products::sku.asc())
        .get_results(conn)
        .await
        .context("Failed to get products")?;

    let catalog: Vec<CatalogItemRes> = all_products
        .into_iter()
        .filter(|product| pricing::is_visible_to_class(product, Some(&class_name)))
        .map(|product| CatalogItemRes {
            unit_price: pricing::unit_price_for_class(&product, Some(&class_name)),
            image_url: product
                .image_url
                .as_deref()
                .map(|path| storage::public_url(storage::BUCKET_PRODUCT_IMAGES, path)),
            product,
        })
        .collect();

    Ok(StdResponse {
        data: Some(catalog),
        message: Some("Get catalog successfully"),
    })
}
