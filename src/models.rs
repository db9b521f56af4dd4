use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Classes & support fund levels

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::classes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ClassEntity {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::support_fund_levels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SupportFundLevelEntity {
    pub id: i32,
    pub percent: f32,
    pub created_at: DateTime<Utc>,
}

// Companies

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::companies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompanyEntity {
    pub id: i32,
    pub name: String,
    pub class_id: i32,
    pub support_fund_level_id: Option<i32>,
    pub incoterm: Option<String>,
    pub payment_terms: Option<String>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub annual_target: Option<f32>,
    pub ship_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::companies)]
pub struct CreateCompanyEntity {
    pub name: String,
    pub class_id: i32,
    pub support_fund_level_id: Option<i32>,
    pub incoterm: Option<String>,
    pub payment_terms: Option<String>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub annual_target: Option<f32>,
    pub ship_to: Option<String>,
}

#[derive(AsChangeset, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::companies)]
pub struct UpdateCompanyEntity {
    pub name: Option<String>,
    pub class_id: Option<i32>,
    pub support_fund_level_id: Option<i32>,
    pub incoterm: Option<String>,
    pub payment_terms: Option<String>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub annual_target: Option<f32>,
    pub ship_to: Option<String>,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: i32,
    pub sku: String,
    pub item_name: String,
    pub price_americas: f32,
    pub price_international: f32,
    pub case_pack: i32,
    pub enable: bool,
    pub list_in_support_funds: bool,
    pub visible_americas: bool,
    pub visible_international: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub sku: String,
    pub item_name: String,
    pub price_americas: f32,
    pub price_international: f32,
    pub case_pack: i32,
    pub enable: bool,
    pub list_in_support_funds: bool,
    pub visible_americas: bool,
    pub visible_international: bool,
    pub image_url: Option<String>,
}

/// Patch payload for products. The sku is part of the product's identity and
/// is deliberately absent here.
#[derive(AsChangeset, Deserialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::products)]
pub struct UpdateProductEntity {
    pub item_name: Option<String>,
    pub price_americas: Option<f32>,
    pub price_international: Option<f32>,
    pub case_pack: Option<i32>,
    pub enable: Option<bool>,
    pub list_in_support_funds: Option<bool>,
    pub visible_americas: Option<bool>,
    pub visible_international: Option<bool>,
    pub image_url: Option<String>,
}

// Users

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub company_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub company_id: Option<i32>,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub company_id: i32,
    pub user_id: Uuid,
    pub status: String,
    pub total_value: f32,
    pub support_fund_used: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub company_id: i32,
    pub user_id: Uuid,
    pub status: String,
    pub total_value: f32,
    pub support_fund_used: f32,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    /// Units, not cases.
    pub quantity: i32,
    pub unit_price: f32,
    pub total_price: f32,
    pub is_support_fund_item: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: f32,
    pub total_price: f32,
    pub is_support_fund_item: bool,
}

// Company notes

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::company_notes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompanyNoteEntity {
    pub id: i32,
    pub company_id: i32,
    pub author_id: Uuid,
    pub body: String,
    pub visible_to_client: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::company_notes)]
pub struct CreateCompanyNoteEntity {
    pub company_id: i32,
    pub author_id: Uuid,
    pub body: String,
    pub visible_to_client: bool,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::note_replies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NoteReplyEntity {
    pub id: i32,
    pub note_id: i32,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::note_replies)]
pub struct CreateNoteReplyEntity {
    pub note_id: i32,
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::note_attachments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NoteAttachmentEntity {
    pub id: i32,
    pub note_id: i32,
    pub file_name: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::note_attachments)]
pub struct CreateNoteAttachmentEntity {
    pub note_id: i32,
    pub file_name: String,
    pub storage_path: String,
}
