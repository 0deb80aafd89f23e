//! Token endpoint: exchange login credentials for a bearer token.

use crate::auth::password::check_password;
use crate::config::ID_FIELD;
use crate::error::AppError;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

const CREDENTIALS_MISMATCH: &str = "Email and password do not match";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginData {
    #[serde(default)]
    pub grant_type: Option<String>,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    /// Expiry as a unix timestamp.
    pub expires_in: i64,
}

/// Credentials as JSON or as an urlencoded form.
async fn login_data(req: Request) -> Result<LoginData, AppError> {
    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        let Form(data) = Form::<LoginData>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return Ok(data);
    }
    let body = Bytes::from_request(req, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("invalid login data: {}", e)))
}

pub async fn create_token(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<TokenResponse>, AppError> {
    let data = login_data(req).await?;
    if let Some(grant) = data.grant_type.as_deref() {
        if grant != "password" {
            return Err(AppError::BadRequest(format!("unsupported grant_type: {}", grant)));
        }
    }
    let login = &state.settings.login;
    let resource = state
        .registry
        .get(&login.resource)
        .ok_or_else(|| AppError::Unexpected(format!("login resource {} not registered", login.resource)))?;
    let user = CrudService::find_by_field(state.store.as_ref(), resource, &login.login_field, &data.username)
        .await?;
    let Some(user) = user else {
        tracing::info!(username = %data.username, "login for unknown user");
        return Err(AppError::BadRequest(CREDENTIALS_MISMATCH.into()));
    };
    let stored = user
        .get(&login.password_field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !check_password(data.password.clone(), stored).await? {
        tracing::info!(username = %data.username, "login with wrong password");
        return Err(AppError::BadRequest(CREDENTIALS_MISMATCH.into()));
    }
    let user_id = user
        .get(ID_FIELD)
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Unexpected("user row without id".into()))?;
    let (access_token, expires_in) = state.tokens.issue(user_id)?;
    tracing::info!(user_id, "token issued");
    Ok(Json(TokenResponse {
        token_type: "Bearer".into(),
        access_token,
        expires_in,
    }))
}
