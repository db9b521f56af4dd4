use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tera::Tera;
use utoipa::ToSchema;

/// The five order-lifecycle notifications the portal sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    InProcess,
    Ready,
    Cancelled,
    Custom,
}

impl NotificationKind {
    fn template_name(&self) -> &'static str {
        match self {
            Self::Created => "order_created.html",
            Self::InProcess => "order_in_process.html",
            Self::Ready => "order_ready.html",
            Self::Cancelled => "order_cancelled.html",
            Self::Custom => "order_custom.html",
        }
    }

    /// Notification triggered by an admin status transition, if any.
    /// Moving an order back to "Open" is an administrative correction and
    /// sends nothing.
    pub fn for_status(status: &str) -> Option<Self> {
        match status {
            "In Process" => Some(Self::InProcess),
            "Done" => Some(Self::Ready),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MailLineItem {
    pub sku: String,
    pub item_name: String,
    pub quantity: i32,
    pub total_price: f32,
    pub is_support_fund_item: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderMailContext {
    pub order_id: i32,
    pub company_name: String,
    pub items: Vec<MailLineItem>,
    pub total_value: f32,
    pub support_fund_used: f32,
    /// Free-form body, only used by custom notifications.
    pub message: Option<String>,
}

pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates([
            (
                "order_created.html",
                include_str!("../../templates/order_created.html"),
            ),
            (
                "order_in_process.html",
                include_str!("../../templates/order_in_process.html"),
            ),
            (
                "order_ready.html",
                include_str!("../../templates/order_ready.html"),
            ),
            (
                "order_cancelled.html",
                include_str!("../../templates/order_cancelled.html"),
            ),
            (
                "order_custom.html",
                include_str!("../../templates/order_custom.html"),
            ),
            (
                "password_reset.html",
                include_str!("../../templates/password_reset.html"),
            ),
        ])
        .context("Failed to load mail templates")?;

        Ok(Self { tera })
    }

    /// Renders an order-lifecycle notification into a (subject, html) pair.
    pub fn render_order(
        &self,
        kind: NotificationKind,
        ctx: &OrderMailContext,
        custom_subject: Option<&str>,
    ) -> Result<(String, String)> {
        let subject = match kind {
            NotificationKind::Created => format!("Order #{} received", ctx.order_id),
            NotificationKind::InProcess => format!("Order #{} is in process", ctx.order_id),
            NotificationKind::Ready => format!("Order #{} is ready", ctx.order_id),
            NotificationKind::Cancelled => format!("Order #{} has been cancelled", ctx.order_id),
            NotificationKind::Custom => custom_subject
                .map(str::to_string)
                .unwrap_or_else(|| format!("Update on order #{}", ctx.order_id)),
        };

        let context =
            tera::Context::from_serialize(ctx).context("Failed to build template context")?;
        let html = self
            .tera
            .render(kind.template_name(), &context)
            .with_context(|| format!("Failed to render template {}", kind.template_name()))?;

        Ok((subject, html))
    }

    pub fn render_password_reset(
        &self,
        user_name: &str,
        reset_link: &str,
    ) -> Result<(String, String)> {
        let mut context = tera::Context::new();
        context.insert("user_name", user_name);
        context.insert("reset_link", reset_link);

        let html = self
            .tera
            .render("password_reset.html", &context)
            .context("Failed to render template password_reset.html")?;

        Ok(("Reset your partner portal password".to_string(), html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> OrderMailContext {
        OrderMailContext {
            order_id: 42,
            company_name: "Acme Distribution".to_string(),
            items: vec![
                MailLineItem {
                    sku: "SKU-001".to_string(),
                    item_name: "Widget".to_string(),
                    quantity: 12,
                    total_price: 48.0,
                    is_support_fund_item: false,
                },
                MailLineItem {
                    sku: "SKU-002".to_string(),
                    item_name: "Gadget".to_string(),
                    quantity: 6,
                    total_price: 24.0,
                    is_support_fund_item: true,
                },
            ],
            total_value: 952.0,
            support_fund_used: 48.0,
            message: None,
        }
    }

    #[test]
    fn every_lifecycle_template_renders() {
        let templates = Templates::new().unwrap();
        let ctx = context();

        for kind in [
            NotificationKind::Created,
            NotificationKind::InProcess,
            NotificationKind::Ready,
            NotificationKind::Cancelled,
            NotificationKind::Custom,
        ] {
            let (subject, html) = templates.render_order(kind, &ctx, None).unwrap();
            assert!(subject.contains("42"), "subject for {:?}: {}", kind, subject);
            assert!(html.contains("Acme Distribution"));
            assert!(html.contains("SKU-001"));
        }
    }

    #[test]
    fn created_template_lists_items_and_totals() {
        let templates = Templates::new().unwrap();
        let (subject, html) = templates
            .render_order(NotificationKind::Created, &context(), None)
            .unwrap();

        assert_eq!(subject, "Order #42 received");
        assert!(html.contains("Widget"));
        assert!(html.contains("Gadget"));
        assert!(html.contains("952"));
        assert!(html.contains("48"));
    }

    #[test]
    fn custom_subject_overrides_the_default() {
        let templates = Templates::new().unwrap();
        let mut ctx = context();
        ctx.message = Some("Your shipment leaves on Friday.".to_string());

        let (subject, html) = templates
            .render_order(NotificationKind::Custom, &ctx, Some("Shipping update"))
            .unwrap();

        assert_eq!(subject, "Shipping update");
        assert!(html.contains("Your shipment leaves on Friday."));
    }

    #[test]
    fn status_transitions_map_to_notification_kinds() {
        assert_eq!(
            NotificationKind::for_status("In Process"),
            Some(NotificationKind::InProcess)
        );
        assert_eq!(
            NotificationKind::for_status("Done"),
            Some(NotificationKind::Ready)
        );
        assert_eq!(
            NotificationKind::for_status("Cancelled"),
            Some(NotificationKind::Cancelled)
        );
        assert_eq!(NotificationKind::for_status("Open"), None);
    }

    #[test]
    fn password_reset_embeds_the_link() {
        let templates = Templates::new().unwrap();
        let (subject, html) = templates
            .render_password_reset("Dana", "https://portal.example/reset?token=abc")
            .unwrap();

        assert!(subject.contains("password"));
        assert!(html.contains("Dana"));
        assert!(html.contains("https://portal.example/reset?token=abc"));
    }
}
