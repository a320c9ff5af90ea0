//! HTTP transport for the GophKeeper server.

use gophkeeper_core::api::{
    DeleteSecretRequest, DeleteSecretResponse, ErrorBody, GetSecretRequest, GetSecretResponse,
    ListSecretsRequest, ListSecretsResponse, LoginRequest, LoginResponse, LogoutRequest,
    LogoutResponse, RefreshTokenRequest, RefreshTokenResponse, RegisterRequest, RegisterResponse,
    Secret, SyncRequest, SyncResponse,
};
use gophkeeper_core::SecretType;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, Result};

/// Seam between the client application and the server, so tests can drive
/// the sync driver against a fake.
pub trait Api {
    fn set_token(&mut self, token: &str);

    async fn register(&self, login: &str, password: &str) -> Result<String>;
    async fn login(&self, login: &str, password: &str) -> Result<LoginResponse>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshTokenResponse>;
    async fn logout(&self, refresh_token: &str) -> Result<bool>;

    async fn sync(
        &self,
        user_id: &str,
        last_sync_version: i64,
        secrets: Vec<Secret>,
    ) -> Result<SyncResponse>;
    async fn get_secret(&self, secret_id: &str) -> Result<Secret>;
    async fn list_secrets(
        &self,
        user_id: &str,
        filter_type: Option<SecretType>,
    ) -> Result<Vec<Secret>>;
    async fn delete_secret(&self, secret_id: &str) -> Result<bool>;
}

/// Production transport: JSON over HTTP against the RPC method routes.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(server_address: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: server_address.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{}", self.base_url, method);
        let mut builder = self.client.post(&url).json(request);
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_else(|_| ErrorBody {
                code: "INTERNAL".to_string(),
                message: format!("server returned {status}"),
            });
            return Err(ClientError::Api {
                code: body.code,
                message: body.message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))
    }
}

impl Api for HttpTransport {
    fn set_token(&mut self, token: &str) {
        self.token = if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        };
    }

    async fn register(&self, login: &str, password: &str) -> Result<String> {
        let response: RegisterResponse = self
            .call(
                "gophkeeper.v1.AuthService/Register",
                &RegisterRequest {
                    login: login.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        Ok(response.user_id)
    }

    async fn login(&self, login: &str, password: &str) -> Result<LoginResponse> {
        self.call(
            "gophkeeper.v1.AuthService/Login",
            &LoginRequest {
                login: login.to_string(),
                password: password.to_string(),
            },
        )
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshTokenResponse> {
        self.call(
            "gophkeeper.v1.AuthService/RefreshToken",
            &RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            },
        )
        .await
    }

    async fn logout(&self, refresh_token: &str) -> Result<bool> {
        let response: LogoutResponse = self
            .call(
                "gophkeeper.v1.AuthService/Logout",
                &LogoutRequest {
                    refresh_token: refresh_token.to_string(),
                },
            )
            .await?;
        Ok(response.success)
    }

    async fn sync(
        &self,
        user_id: &str,
        last_sync_version: i64,
        secrets: Vec<Secret>,
    ) -> Result<SyncResponse> {
        self.call(
            "gophkeeper.v1.SecretService/Sync",
            &SyncRequest {
                user_id: user_id.to_string(),
                last_sync_version,
                secrets,
            },
        )
        .await
    }

    async fn get_secret(&self, secret_id: &str) -> Result<Secret> {
        let response: GetSecretResponse = self
            .call(
                "gophkeeper.v1.SecretService/GetSecret",
                &GetSecretRequest {
                    secret_id: secret_id.to_string(),
                },
            )
            .await?;
        Ok(response.secret)
    }

    async fn list_secrets(
        &self,
        user_id: &str,
        filter_type: Option<SecretType>,
    ) -> Result<Vec<Secret>> {
        let response: ListSecretsResponse = self
            .call(
                "gophkeeper.v1.SecretService/ListSecrets",
                &ListSecretsRequest {
                    user_id: user_id.to_string(),
                    filter_type,
                },
            )
            .await?;
        Ok(response.secrets)
    }

    async fn delete_secret(&self, secret_id: &str) -> Result<bool> {
        let response: DeleteSecretResponse = self
            .call(
                "gophkeeper.v1.SecretService/DeleteSecret",
                &DeleteSecretRequest {
                    secret_id: secret_id.to_string(),
                },
            )
            .await?;
        Ok(response.success)
    }
}
