//! Order-lifecycle notification fan-out.
//!
//! Notifications are best-effort: the state change that triggered them has
//! already been committed, so failures here are logged and never bubble back
//! into the request that caused them.

use anyhow::{Context, Result};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    app_state::AppState,
    mailer::{MailLineItem, NotificationKind, OrderMailContext},
    models::{CompanyEntity, OrderEntity, OrderItemEntity, ProductEntity},
    schema::{companies, order_items, orders, products, users},
};

#[derive(Serialize, Debug, ToSchema)]
pub struct NotificationReport {
    pub sent: usize,
    pub failed: usize,
}

/// Renders the notification for `order_id` and emails every user of the
/// order's company plus the admin mailbox. Per-recipient failures are logged
/// and counted, not propagated.
pub async fn dispatch_order_notification(
    state: &AppState,
    order_id: i32,
    kind: NotificationKind,
    custom_subject: Option<String>,
    custom_message: Option<String>,
) -> Result<NotificationReport> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (order, company): (OrderEntity, CompanyEntity) = orders::table
        .find(order_id)
        .inner_join(companies::table)
        .select((OrderEntity::as_select(), CompanyEntity::as_select()))
        .get_result(conn)
        .await
        .context("Failed to get order for notification")?;

    let items: Vec<(OrderItemEntity, ProductEntity)> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .inner_join(products::table)
        .select((OrderItemEntity::as_select(), ProductEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get order items for notification")?;

    let recipients: Vec<String> = users::table
        .filter(users::company_id.eq(company.id))
        .select(users::email)
        .get_results(conn)
        .await
        .context("Failed to get notification recipients")?;

    let ctx = OrderMailContext {
        order_id: order.id,
        company_name: company.name,
        items: items
            .into_iter()
            .map(|(item, product)| MailLineItem {
                sku: product.sku,
                item_name: product.item_name,
                quantity: item.quantity,
                total_price: item.total_price,
                is_support_fund_item: item.is_support_fund_item,
            })
            .collect(),
        total_value: order.total_value,
        support_fund_used: order.support_fund_used,
        message: custom_message,
    };

    let (subject, html) = state
        .mailer
        .templates()
        .render_order(kind, &ctx, custom_subject.as_deref())?;

    let mut sent = 0;
    let mut failed = 0;
    for recipient in recipients
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(state.mailer.admin_mailbox()))
    {
        match state.mailer.send(recipient, &subject, &html).await {
            Ok(()) => sent += 1,
            Err(err) => {
                failed += 1;
                tracing::warn!(
                    order_id = order.id,
                    to = %recipient,
                    "Failed to send order notification: {:?}",
                    err
                );
            }
        }
    }

    tracing::info!(order_id = order.id, ?kind, sent, failed, "Order notification dispatched");
    Ok(NotificationReport { sent, failed })
}

/// Fire-and-forget wrapper used wherever an order mutation should notify
/// without delaying or failing the request.
pub fn spawn_order_notification(state: AppState, order_id: i32, kind: NotificationKind) {
    tokio::spawn(async move {
        if let Err(err) = dispatch_order_notification(&state, order_id, kind, None, None).await {
            tracing::warn!(order_id, ?kind, "Order notification failed: {:?}", err);
        }
    });
}
