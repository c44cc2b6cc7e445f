use std::time::Duration;

use consumption_store::domain::{BillingCycle, Day, MeteringPoint, RawHourlyPoint};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

use crate::config::Credentials;
use crate::pipeline::PipelineError;
use crate::sources::ProviderApi;

const QUERY_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// JSON gateway in front of the distributor's private customer API.
///
/// Endpoints, relative to `base_url`:
/// - `POST /login` -> `{"token": ...}`
/// - `GET /cups` -> metering points
/// - `GET /cups/{id}/cycles` -> billing cycles
/// - `POST /cups/{id}/measurements` with `{"cycle": ...}` -> readings of a cycle
/// - `GET /cups/{id}/measurements?start=YYYY-MM-DD&end=YYYY-MM-DD` -> readings of a range
pub struct HttpProviderApi {
    base_url: String,
    client: Client,
    token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct CycleRequest<'a> {
    cycle: &'a BillingCycle,
}

impl HttpProviderApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, PipelineError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| PipelineError::Auth("no provider session, authenticate first".to_string()))?;
        Ok(request.bearer_auth(token))
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, PipelineError> {
        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("{what}: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::error!(%status, what, "provider rejected credentials");
            return Err(PipelineError::Auth(format!("{what}: provider answered {status}")));
        }
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("<body unreadable: {e}>"),
            };
            tracing::error!(%status, what, "provider request failed");
            return Err(PipelineError::Network(format!("{what}: provider answered {status}: {body}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Network(format!("{what}: {e}")))?;
        tracing::debug!(what, bytes = body.len(), "provider response received");

        serde_json::from_slice(&body).map_err(|e| PipelineError::MalformedResponse(format!("{what}: {e}")))
    }
}

fn query_date(date: Date) -> Result<String, PipelineError> {
    date.format(QUERY_DATE_FORMAT)
        .map_err(|e| PipelineError::Config(format!("cannot format date {date}: {e}")))
}

#[async_trait::async_trait]
impl ProviderApi for HttpProviderApi {
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), PipelineError> {
        let request = self.client.post(self.url("/login")).json(&LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
        });

        let login: LoginResponse = self.fetch_json(request, "login").await?;
        self.token = Some(login.token);
        Ok(())
    }

    async fn list_metering_points(&self) -> Result<Vec<MeteringPoint>, PipelineError> {
        let request = self.authorized(self.client.get(self.url("/cups")))?;
        self.fetch_json(request, "list metering points").await
    }

    async fn list_billing_cycles(&self, point_id: &str) -> Result<Vec<BillingCycle>, PipelineError> {
        let request = self.authorized(self.client.get(self.url(&format!("/cups/{point_id}/cycles"))))?;
        self.fetch_json(request, "list billing cycles").await
    }

    async fn readings_for_cycle(
        &self,
        point_id: &str,
        cycle: &BillingCycle,
    ) -> Result<Vec<Day<RawHourlyPoint>>, PipelineError> {
        let request = self
            .client
            .post(self.url(&format!("/cups/{point_id}/measurements")))
            .json(&CycleRequest { cycle });
        self.fetch_json(self.authorized(request)?, "cycle readings").await
    }

    async fn readings_in_interval(
        &self,
        point_id: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<Day<RawHourlyPoint>>, PipelineError> {
        let request = self
            .client
            .get(self.url(&format!("/cups/{point_id}/measurements")))
            .query(&[("start", query_date(start)?), ("end", query_date(end)?)]);
        self.fetch_json(self.authorized(request)?, "interval readings").await
    }
}
