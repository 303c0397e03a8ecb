//! REST client for the deposit backend
//!
//! Read-only access to health, networks, the wallet registry and deposit lists.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::{DepositRecord, NetworkRecord, WalletRecord};

/// Backend API client
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl BackendClient {
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check backend health (`GET /health`)
    pub async fn health(&self) -> AppResult<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let body: HealthResponse = response.json().await?;
        Ok(body.status == "healthy")
    }

    /// List configured networks (`GET /blockchain-networks/`)
    pub async fn list_networks(&self) -> AppResult<Vec<NetworkRecord>> {
        let url = format!("{}/blockchain-networks/", self.base_url);
        self.get_json(&url).await
    }

    /// List a user's wallets (`GET /wallets/user/{userId}`)
    pub async fn list_user_wallets(&self, user_id: Uuid) -> AppResult<Vec<WalletRecord>> {
        let url = format!("{}/wallets/user/{}", self.base_url, user_id);
        self.get_json(&url).await
    }

    /// List a wallet's deposits (`GET /deposits/wallet/{walletId}`)
    ///
    /// A 404 means "no deposits found" and yields an empty list.
    pub async fn list_wallet_deposits(&self, wallet_id: Uuid) -> AppResult<Vec<DepositRecord>> {
        let url = format!("{}/deposits/wallet/{}", self.base_url, wallet_id);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(%wallet_id, "No deposits found for wallet");
            return Ok(Vec::new());
        }

        Self::decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
