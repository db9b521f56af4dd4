//! Calls to the auth provider's admin API. These run with the service-role
//! key and are the only place user credentials are provisioned or mutated.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::ApiUrls;
use crate::app_error::AppError;

#[derive(Serialize, Deserialize)]
struct AdminUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Serialize, Deserialize)]
struct GeneratedLink {
    pub action_link: String,
}

/// Creates the auth record for a new portal user and returns its id.
pub async fn create_auth_user(client: Client, email: &str, password: &str) -> Result<Uuid> {
    let url = ApiUrls::get_auth_admin_url();
    let user: AdminUser = client
        .post(format!("{}/users", url))
        .bearer_auth(ApiUrls::get_service_role_key())
        .json(&json!({
            "email": email,
            "password": password,
            "email_confirm": true,
        }))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("AuthProvider".into()))?
        .error_for_status()
        .context("Auth provider rejected the user creation")?
        .json()
        .await
        .context("Failed to parse JSON")?;

    Ok(user.id)
}

/// Asks the provider for a one-time password-recovery link for `email`.
pub async fn generate_recovery_link(client: Client, email: &str) -> Result<String> {
    let url = ApiUrls::get_auth_admin_url();
    let link: GeneratedLink = client
        .post(format!("{}/generate_link", url))
        .bearer_auth(ApiUrls::get_service_role_key())
        .json(&json!({
            "type": "recovery",
            "email": email,
        }))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("AuthProvider".into()))?
        .error_for_status()
        .context("Auth provider rejected the recovery link request")?
        .json()
        .await
        .context("Failed to parse JSON")?;

    Ok(link.action_link)
}

/// Overwrites a user's password through the admin API.
pub async fn update_user_password(client: Client, user_id: Uuid, new_password: &str) -> Result<()> {
    let url = ApiUrls::get_auth_admin_url();
    client
        .put(format!("{}/users/{}", url, user_id))
        .bearer_auth(ApiUrls::get_service_role_key())
        .json(&json!({ "password": new_password }))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("AuthProvider".into()))?
        .error_for_status()
        .context("Auth provider rejected the password update")?;

    Ok(())
}

/// Deletes the auth record. Used when an admin removes a portal user.
pub async fn delete_auth_user(client: Client, user_id: Uuid) -> Result<()> {
    let url = ApiUrls::get_auth_admin_url();
    client
        .delete(format!("{}/users/{}", url, user_id))
        .bearer_auth(ApiUrls::get_service_role_key())
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("AuthProvider".into()))?
        .error_for_status()
        .context("Auth provider rejected the user deletion")?;

    Ok(())
}
