use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{RemoteStore, SelectQuery, Table};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Project url, for example `https://xyzcompany.supabase.co`.
    pub url: String,
    pub anon_key: String,
    /// Token of a signed in user. Without it requests are made anonymously.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

/// `select`, `order` and `limit` parameters in PostgREST syntax.
fn query_params(query: &SelectQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];
    if let Some((column, ascending)) = query.order_by {
        let direction = if ascending { "asc" } else { "desc" };
        params.push(("order", format!("{column}.{direction}")));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

/// Talks to a PostgREST compatible backend (`/rest/v1/<table>`) and its auth endpoint.
pub struct PostgrestClient {
    client: Client,
    config: RemoteConfig,
}

impl PostgrestClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url(), table)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    async fn rows(table: Table, response: Response) -> Result<Vec<Value>> {
        let status = response.status();
        if !status.is_success() {
            bail!(
                "Remote error on {table}: {} - {}",
                status,
                response.text().await.unwrap_or_default()
            );
        }
        let body = response
            .json::<Value>()
            .await
            .with_context(|| format!("Failed to parse {table} response"))?;

        Ok(match body {
            Value::Array(rows) => rows,
            Value::Null => vec![],
            row => vec![row],
        })
    }
}

#[async_trait]
impl RemoteStore for PostgrestClient {
    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<Option<String>> {
        if self.config.access_token.is_none() {
            return Ok(None);
        }
        let url = format!("{}/auth/v1/user", self.base_url());
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .context("Failed to send request to auth endpoint")?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Access token was rejected, treating as signed out");
                Ok(None)
            }
            status if status.is_success() => {
                let user = response
                    .json::<Value>()
                    .await
                    .context("Failed to parse user response")?;
                Ok(user.get("id").and_then(Value::as_str).map(str::to_string))
            }
            status => bail!(
                "Auth error: {} - {}",
                status,
                response.text().await.unwrap_or_default()
            ),
        }
    }

    #[instrument(skip(self))]
    async fn select(&self, table: Table, query: SelectQuery) -> Result<Vec<Value>> {
        let response = self
            .request(Method::GET, &self.table_url(table))
            .query(&query_params(&query))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {table} endpoint"))?;
        Self::rows(table, response).await
    }

    #[instrument(skip(self))]
    async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>> {
        let response = self
            .request(Method::POST, &self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .with_context(|| format!("Failed to send insert to {table} endpoint"))?;
        Self::rows(table, response).await
    }

    #[instrument(skip(self))]
    async fn update(&self, table: Table, id: &str, row: Value) -> Result<Vec<Value>> {
        let response = self
            .request(Method::PATCH, &self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .with_context(|| format!("Failed to send update to {table} endpoint"))?;
        Self::rows(table, response).await
    }
}
