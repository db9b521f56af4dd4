use anyhow::Context;
use axum::{extract::Request, http::header, middleware::Next, response::Response};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub company_id: Option<i32>,
    pub exp: usize,
}

/// Identity of an authenticated portal client, always tied to a company.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub user_id: Uuid,
    pub company_id: i32,
}

#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub user_id: Uuid,
}

/// Identity of any authenticated user, role left to the handler.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub role: String,
    pub company_id: Option<i32>,
}

fn decode_bearer(req: &Request) -> Result<Claims, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".into()))?;

    let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    Ok(decoded.claims)
}

pub async fn clients_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let claims = decode_bearer(&req)?;
    if claims.role != "client" {
        return Err(AppError::ForbiddenResource("Client role required".into()));
    }
    let company_id = claims.company_id.ok_or_else(|| {
        AppError::ForbiddenResource("No company is linked to this user".into())
    })?;

    req.extensions_mut().insert(ClientIdentity {
        user_id: claims.sub,
        company_id,
    });
    Ok(next.run(req).await)
}

pub async fn admins_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let claims = decode_bearer(&req)?;
    if claims.role != "admin" {
        return Err(AppError::ForbiddenResource("Admin role required".into()));
    }

    req.extensions_mut().insert(AdminIdentity {
        user_id: claims.sub,
    });
    Ok(next.run(req).await)
}

pub async fn users_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let claims = decode_bearer(&req)?;

    req.extensions_mut().insert(UserIdentity {
        user_id: claims.sub,
        role: claims.role,
        company_id: claims.company_id,
    });
    Ok(next.run(req).await)
}
