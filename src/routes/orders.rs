use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::{Deserialize, Serialize};

use crate::{
    aliases::DieselError,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    mailer::NotificationKind,
    middleware, notify,
    models::{OrderEntity, OrderItemEntity},
    schema::{companies, order_items, orders},
};

const ORDER_STATUSES: [&str; 4] = ["Open", "In Process", "Done", "Cancelled"];

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(update_order_status))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

#[derive(Serialize, ToSchema)]
struct GetOrderRes {
    pub order: OrderEntity,
    pub company_name: String,
    pub order_items: Vec<OrderItemEntity>,
}

/// Fetch all orders across companies, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<GetOrderRes>, String>)
    )
)]
async fn get_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(OrderEntity, String)> = orders::table
        .inner_join(companies::table)
        .select((OrderEntity::as_select(), companies::name))
        .order_by(orders::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    let order_ids: Vec<i32> = rows.iter().map(|(order, _)| order.id).collect();
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    let orders_res: Vec<GetOrderRes> = rows
        .into_iter()
        .map(|(order, company_name)| GetOrderRes {
            order_items: group.remove(&order.id).unwrap_or_default(),
            company_name,
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_res),
        message: Some("Get orders successfully"),
    })
}

/// Fetch a specific order with its line items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
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
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let row: QueryResult<(OrderEntity, String)> = orders::table
        .find(id)
        .inner_join(companies::table)
        .select((OrderEntity::as_select(), companies::name))
        .get_result(conn)
        .await;

    let (order, company_name) = match row {
        Ok(row) => row,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let order_items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    Ok(StdResponse {
        data: Some(GetOrderRes {
            order,
            company_name,
            order_items,
        }),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateOrderStatusReq {
    pub status: String,
}

/// Transition an order to a new status. Transitions to "In Process", "Done"
/// and "Cancelled" notify the company's users; the notification is
/// best-effort and never blocks the transition.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to transition")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order status successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn update_order_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    if !ORDER_STATUSES.contains(&body.status.as_str()) {
        return Err(AppError::BadRequest(format!(
            "{} is not a valid order status",
            body.status
        )));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated_order: QueryResult<OrderEntity> = diesel::update(orders::table.find(id))
        .set((
            orders::status.eq(&body.status),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await;

    let updated_order = match updated_order {
        Ok(order) => order,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    if let Some(kind) = NotificationKind::for_status(&updated_order.status) {
        notify::spawn_order_notification(state.clone(), updated_order.id, kind);
    }

    Ok(StdResponse {
        data: Some(updated_order),
        message: Some("Updated order status successfully"),
    })
}
