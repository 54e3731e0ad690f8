use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Hosted auth service location plus the public API key sent with every call.
#[derive(Debug, Clone)]
pub struct AuthEndpoint {
    pub base_url: String,
    pub api_key: String,
}

impl AuthEndpoint {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, InfraError> {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|url| url.join(path))
            .map_err(|error| InfraError::InvalidConfig(format!("invalid auth base url: {error}")))
    }
}

#[derive(Debug, Clone)]
pub struct AuthTokenResponse {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[async_trait]
pub trait AuthHttpClient: Send + Sync {
    async fn sign_in_with_password(
        &self,
        endpoint: &AuthEndpoint,
        email: &str,
        password: &str,
    ) -> Result<AuthTokenResponse, InfraError>;

    async fn refresh_session(
        &self,
        endpoint: &AuthEndpoint,
        refresh_token: &str,
    ) -> Result<AuthTokenResponse, InfraError>;

    async fn sign_out(&self, endpoint: &AuthEndpoint, access_token: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestAuthClient {
    client: Client,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponsePayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<UserPayload>,
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct UserPayload {
    id: String,
}

impl ReqwestAuthClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn post_token(
        &self,
        endpoint: &AuthEndpoint,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<AuthTokenResponse, InfraError> {
        let mut url = endpoint.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .client
            .post(url)
            .header("apikey", &endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("auth request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading auth response: {error}")))?;

        let parsed = serde_json::from_str::<TokenResponsePayload>(&body).map_err(|error| {
            InfraError::Auth(format!("invalid auth response payload: {error}; body={body}"))
        })?;

        if !status.is_success() || parsed.error.is_some() {
            let code = parsed
                .error
                .unwrap_or_else(|| format!("http_{}", status.as_u16()));
            let detail = parsed
                .error_description
                .or(parsed.msg)
                .unwrap_or_else(|| body.clone());
            return Err(InfraError::Auth(format!("token endpoint error: {code}; {detail}")));
        }

        let access_token = parsed
            .access_token
            .ok_or_else(|| InfraError::Auth("token response without access_token".to_string()))?;
        let user_id = parsed
            .user
            .map(|user| user.id)
            .ok_or_else(|| InfraError::Auth("token response without user".to_string()))?;

        Ok(AuthTokenResponse {
            user_id,
            access_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in.unwrap_or(0).max(0),
        })
    }
}

#[async_trait]
impl AuthHttpClient for ReqwestAuthClient {
    async fn sign_in_with_password(
        &self,
        endpoint: &AuthEndpoint,
        email: &str,
        password: &str,
    ) -> Result<AuthTokenResponse, InfraError> {
        self.post_token(
            endpoint,
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn refresh_session(
        &self,
        endpoint: &AuthEndpoint,
        refresh_token: &str,
    ) -> Result<AuthTokenResponse, InfraError> {
        self.post_token(
            endpoint,
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn sign_out(&self, endpoint: &AuthEndpoint, access_token: &str) -> Result<(), InfraError> {
        let response = self
            .client
            .post(endpoint.url("auth/v1/logout")?)
            .header("apikey", &endpoint.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("sign-out request failed: {error}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(InfraError::Auth(format!(
            "sign-out failed: http {}; body={body}",
            status.as_u16()
        )))
    }
}
