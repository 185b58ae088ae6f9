use log::error;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use journey_model::{Pin, RouteId, RouteSummary};

use crate::error::ApiError;
use crate::submit::{CreateRouteResponse, JourneyPayload, COVER_FIELD};

/// Talks to the pins/routes JSON API. No timeouts or retries; callers decide what a failure means.
#[derive(Clone)]
pub struct ApiClient {
    base: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn pins(&self) -> Result<Vec<Pin>, ApiError> {
        self.get_json("/api/pins").await
    }

    pub async fn routes(&self) -> Result<Vec<RouteSummary>, ApiError> {
        self.get_json("/api/routes").await
    }

    /// The route's pins in the order the server stored them.
    pub async fn route_pins(&self, id: RouteId) -> Result<Vec<Pin>, ApiError> {
        self.get_json(&format!("/api/routes/{}/pins", id.0)).await
    }

    pub async fn create_route(&self, payload: &JourneyPayload) -> Result<(), ApiError> {
        let mut form = Form::new();
        for (key, value) in payload.form_fields()? {
            form = form.text(key, value);
        }
        if let Some(cover) = &payload.cover {
            let part = Part::bytes(cover.bytes.clone())
                .file_name(cover.file_name.clone())
                .mime_str(&cover.mime)?;
            form = form.part(COVER_FIELD, part);
        }
        let resp = self
            .client
            .post(self.url("/api/routes"))
            .multipart(form)
            .send()
            .await
            .inspect_err(|err| error!("POST /api/routes failed: {err}"))?;
        let status = resp.status();
        let body = resp.text().await?;
        // Refusals usually come back as 4xx with a JSON explanation, so try the body first
        match serde_json::from_str::<CreateRouteResponse>(&body) {
            Ok(parsed) => parsed.into_result(),
            Err(_) if !status.is_success() => Err(ApiError::Status(status.as_u16())),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .inspect_err(|err| error!("GET {path} failed: {err}"))?;
        let status = resp.status();
        if !status.is_success() {
            error!("GET {path} returned {status}");
            return Err(ApiError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
