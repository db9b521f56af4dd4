use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, NullableExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::{Deserialize, Serialize};

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    mailer::NotificationKind,
    middleware::{self, ClientIdentity},
    models::{
        CreateOrderEntity, CreateOrderItemEntity, OrderEntity, OrderItemEntity, ProductEntity,
    },
    notify, pricing,
    schema::{classes, companies, order_items, orders, products, support_fund_levels},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/clients/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(get_support_fund_offer))
            .routes(utoipa_axum::routes!(redeem_support_fund))
            .route_layer(axum::middleware::from_fn(
                middleware::clients_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
struct OrderLineReq {
    pub product_id: i32,
    /// Whole cases; converted to units via the product's case pack.
    pub cases: i32,
}

#[derive(Deserialize, ToSchema)]
struct CreateOrderReq {
    pub order_items: Vec<OrderLineReq>,
}

#[derive(Serialize, ToSchema)]
struct CreateOrderRes {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
}

/// Place a new order for the authenticated client's company. Quantities are
/// entered in cases; lines with zero cases are dropped.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Client orders"],
    security(("bearerAuth" = [])),
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Created order successfully", body = StdResponse<CreateOrderRes, String>)
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
    Json(body): Json<CreateOrderReq>,
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

    let requested: Vec<OrderLineReq> = body
        .order_items
        .into_iter()
        .filter(|line| line.cases > 0)
        .collect();
    if requested.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }

    let product_ids: Vec<i32> = requested.iter().map(|line| line.product_id).collect();
    let available: Vec<ProductEntity> = products::table
        .filter(products::id.eq_any(&product_ids))
        .filter(products::enable.eq(true))
        .get_results(conn)
        .await
        .context("Failed to get products")?;
    let available: HashMap<i32, ProductEntity> =
        available.into_iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(requested.len());
    for line in &requested {
        let product = available.get(&line.product_id).ok_or_else(|| {
            AppError::BadRequest(format!("Product {} is not available", line.product_id))
        })?;
        if !pricing::is_visible_to_class(product, Some(&class_name)) {
            return Err(AppError::BadRequest(format!(
                "Product {} is not available",
                product.id
            )));
        }

        let unit_price = pricing::unit_price_for_class(product, Some(&class_name));
        if let Some(priced) = pricing::price_line(product.id, line.cases, product.case_pack, unit_price)
        {
            lines.push(priced);
        }
    }

    let total_value = pricing::order_total(&lines);

    let (order, created_items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        company_id: identity.company_id,
                        user_id: identity.user_id,
                        status: "Open".into(),
                        total_value,
                        support_fund_used: 0.0,
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create order")?;

                let new_items: Vec<CreateOrderItemEntity> = lines
                    .iter()
                    .map(|line| CreateOrderItemEntity {
                        order_id: order.id,
                        product_id: line.product_id,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        total_price: line.total_price,
                        is_support_fund_item: false,
                    })
                    .collect();

                let created_items = diesel::insert_into(order_items::table)
                    .values(new_items)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create order items")?;

                Ok::<(OrderEntity, Vec<OrderItemEntity>), anyhow::Error>((order, created_items))
            })
        })
        .await
        .context("Transaction failed")?;

    notify::spawn_order_notification(state.clone(), order.id, NotificationKind::Created);

    Ok(StdResponse {
        data: Some(CreateOrderRes {
            order,
            order_items: created_items,
        }),
        message: Some("Created order successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetOrderRes {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
}

/// Fetch all orders belonging to the authenticated client's company.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Client orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<GetOrderRes>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_orders: Vec<OrderEntity> = orders::table
        .filter(orders::company_id.eq(identity.company_id))
        .order_by(orders::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my orders")?;

    let order_ids: Vec<i32> = my_orders.iter().map(|order| order.id).collect();
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    let orders_with_items: Vec<GetOrderRes> = my_orders
        .into_iter()
        .map(|order| GetOrderRes {
            order_items: group.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_items),
        message: Some("Get my orders successfully"),
    })
}

/// Fetch a specific order belonging to the authenticated client's company.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Client orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>)
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: QueryResult<OrderEntity> = orders::table
        .find(id)
        .filter(orders::company_id.eq(identity.company_id))
        .get_result(conn)
        .await;

    let order = match order {
        Ok(order) => order,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let order_items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    Ok(StdResponse {
        data: Some(GetOrderRes { order, order_items }),
        message: Some("Get order successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct SupportFundOptionRes {
    pub product: ProductEntity,
    pub unit_price: f32,
    /// Largest case quantity that still fits into the remaining credit.
    pub max_cases: i32,
}

#[derive(Serialize, ToSchema)]
struct SupportFundOfferRes {
    pub support_fund_earned: f32,
    pub support_fund_used: f32,
    pub remaining_credit: f32,
    pub options: Vec<SupportFundOptionRes>,
}

/// Fetch the support-fund redemption offer for an order: the credit earned
/// by the order and the eligible products with their per-product case caps.
#[utoipa::path(
    get,
    path = "/{id}/support-fund",
    tags = ["Client orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID the credit was earned on")
    ),
    responses(
        (status = 200, description = "Get support fund offer successfully", body = StdResponse<SupportFundOfferRes, String>)
    )
)]
async fn get_support_fund_offer(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: QueryResult<OrderEntity> = orders::table
        .find(id)
        .filter(orders::company_id.eq(identity.company_id))
        .get_result(conn)
        .await;

    let order = match order {
        Ok(order) => order,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let (class_name, percent): (String, Option<f32>) = companies::table
        .find(identity.company_id)
        .inner_join(classes::table)
        .left_join(support_fund_levels::table)
        .select((classes::name, support_fund_levels::percent.nullable()))
        .get_result(conn)
        .await
        .context("Failed to get company class")?;

    // The stored total has already been reduced by any prior redemption;
    // credit is always earned on the pre-redemption total.
    let original_total = order.total_value + order.support_fund_used;
    let earned = pricing::support_fund_earned(original_total, percent.unwrap_or(0.0));
    let remaining = earned - order.support_fund_used;

    let eligible: Vec<ProductEntity> = products::table
        .filter(products::enable.eq(true))
        .filter(products::list_in_support_funds.eq(true))
        .order_by(products::sku.asc())
        .get_results(conn)
        .await
        .context("Failed to get support fund products")?;

    let options: Vec<SupportFundOptionRes> = eligible
        .into_iter()
        .filter(|product| pricing::is_visible_to_class(product, Some(&class_name)))
        .map(|product| {
            let unit_price = pricing::unit_price_for_class(&product, Some(&class_name));
            SupportFundOptionRes {
                max_cases: pricing::max_redeemable_cases(remaining, unit_price, product.case_pack),
                unit_price,
                product,
            }
        })
        .collect();

    Ok(StdResponse {
        data: Some(SupportFundOfferRes {
            support_fund_earned: earned,
            support_fund_used: order.support_fund_used,
            remaining_credit: remaining,
            options,
        }),
        message: Some("Get support fund offer successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct RedeemSupportFundReq {
    pub order_items: Vec<OrderLineReq>,
}

#[derive(Serialize, ToSchema)]
struct RedeemSupportFundRes {
    pub order: OrderEntity,
    pub redeemed_items: Vec<OrderItemEntity>,
    pub support_fund_earned: f32,
}

/// Redeem the support-fund credit earned by an order against the eligible
/// product list. The redeemed total must fit into the earned credit; the
/// order total is reduced by the redeemed amount and the redemption is
/// recorded in one transaction.
#[utoipa::path(
    post,
    path = "/{id}/support-fund",
    tags = ["Client orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID the credit was earned on")
    ),
    request_body = RedeemSupportFundReq,
    responses(
        (status = 200, description = "Redeemed support fund successfully", body = StdResponse<RedeemSupportFundRes, String>)
    )
)]
async fn redeem_support_fund(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
    Json(body): Json<RedeemSupportFundReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: QueryResult<OrderEntity> = orders::table
        .find(id)
        .filter(orders::company_id.eq(identity.company_id))
        .get_result(conn)
        .await;

    let order = match order {
        Ok(order) => order,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    if order.status != "Open" {
        return Err(AppError::BadRequest(
            "Support fund can only be redeemed on open orders".into(),
        ));
    }
    if order.support_fund_used > 0.0 {
        return Err(AppError::Conflict(
            "Support fund has already been redeemed for this order".into(),
        ));
    }

    let (class_name, percent): (String, Option<f32>) = companies::table
        .find(identity.company_id)
        .inner_join(classes::table)
        .left_join(support_fund_levels::table)
        .select((classes::name, support_fund_levels::percent.nullable()))
        .get_result(conn)
        .await
        .context("Failed to get company class")?;

    let earned = pricing::support_fund_earned(order.total_value, percent.unwrap_or(0.0));

    let requested: Vec<OrderLineReq> = body
        .order_items
        .into_iter()
        .filter(|line| line.cases > 0)
        .collect();
    if requested.is_empty() {
        return Err(AppError::BadRequest("Redemption has no items".into()));
    }

    let product_ids: Vec<i32> = requested.iter().map(|line| line.product_id).collect();
    let eligible: Vec<ProductEntity> = products::table
        .filter(products::id.eq_any(&product_ids))
        .filter(products::enable.eq(true))
        .filter(products::list_in_support_funds.eq(true))
        .get_results(conn)
        .await
        .context("Failed to get support fund products")?;
    let eligible: HashMap<i32, ProductEntity> = eligible.into_iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(requested.len());
    for line in &requested {
        let product = eligible.get(&line.product_id).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Product {} is not eligible for support fund redemption",
                line.product_id
            ))
        })?;
        if !pricing::is_visible_to_class(product, Some(&class_name)) {
            return Err(AppError::BadRequest(format!(
                "Product {} is not eligible for support fund redemption",
                product.id
            )));
        }

        let unit_price = pricing::unit_price_for_class(product, Some(&class_name));
        if let Some(priced) = pricing::price_line(product.id, line.cases, product.case_pack, unit_price)
        {
            lines.push(priced);
        }
    }

    let redeemed_total = pricing::order_total(&lines);
    if redeemed_total > earned {
        return Err(AppError::BadRequest(format!(
            "Redemption total {:.2} exceeds the earned support fund {:.2}",
            redeemed_total, earned
        )));
    }

    let final_total = pricing::final_total(order.total_value, redeemed_total);
    let order_id = order.id;

    let (updated_order, redeemed_items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let new_items: Vec<CreateOrderItemEntity> = lines
                    .iter()
                    .map(|line| CreateOrderItemEntity {
                        order_id,
                        product_id: line.product_id,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        total_price: line.total_price,
                        is_support_fund_item: true,
                    })
                    .collect();

                let redeemed_items = diesel::insert_into(order_items::table)
                    .values(new_items)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create support fund items")?;

                let updated_order = diesel::update(orders::table.find(order_id))
                    .set((
                        orders::total_value.eq(final_total),
                        orders::support_fund_used.eq(redeemed_total),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to update order totals")?;

                Ok::<(OrderEntity, Vec<OrderItemEntity>), anyhow::Error>((
                    updated_order,
                    redeemed_items,
                ))
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(RedeemSupportFundRes {
            order: updated_order,
            redeemed_items,
            support_fund_earned: earned,
        }),
        message: Some("Redeemed support fund successfully"),
    })
}
