//! Object-storage URL helpers. Uploads happen straight from the browser;
//! this service only resolves stored paths into URLs.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ApiUrls;
use crate::app_error::AppError;

pub const BUCKET_PRODUCT_IMAGES: &str = "product-images";
pub const BUCKET_CATEGORY_IMAGES: &str = "category-images";
pub const BUCKET_COMPANY_NOTES: &str = "company-notes";
pub const BUCKET_DOCUMENTS: &str = "documents";

/// Default lifetime of a signed URL, in seconds.
pub const SIGNED_URL_TTL_SECS: u32 = 3600;

#[derive(Serialize, Deserialize)]
struct SignedUrlRes {
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}

/// URL for objects in public buckets (product and category images).
pub fn public_url(bucket: &str, path: &str) -> String {
    format!("{}/object/public/{}/{}", ApiUrls::get_storage_url(), bucket, path)
}

/// Requests a time-limited URL for an object in a private bucket.
pub async fn create_signed_url(client: Client, bucket: &str, path: &str) -> Result<String> {
    let url = ApiUrls::get_storage_url();
    let signed: SignedUrlRes = client
        .post(format!("{}/object/sign/{}/{}", url, bucket, path))
        .bearer_auth(ApiUrls::get_service_role_key())
        .json(&json!({ "expiresIn": SIGNED_URL_TTL_SECS }))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("StorageProvider".into()))?
        .error_for_status()
        .context("Storage provider rejected the signing request")?
        .json()
        .await
        .context("Failed to parse JSON")?;

    // The provider returns a path relative to the storage root.
    Ok(format!("{}{}", url, signed.signed_url))
}
