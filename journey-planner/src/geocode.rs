//! Address lookups for convenience only. Nothing here may fail a pin or route workflow, so every
//! error is logged and turned into `None`.

use log::warn;
use serde::Deserialize;

use journey_model::LatLng;

pub const NOMINATIM: &str = "https://nominatim.openstreetmap.org";

#[derive(Clone)]
pub struct Geocoder {
    base: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ReverseResult {
    display_name: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct SearchResult {
    lat: String,
    lon: String,
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new(NOMINATIM)
    }
}

impl Geocoder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// A human-readable address near `pt`
    pub async fn reverse(&self, pt: LatLng) -> Option<String> {
        let query = [
            ("format", "jsonv2".to_string()),
            ("lat", pt.lat.to_string()),
            ("lon", pt.lng.to_string()),
        ];
        match self.lookup::<ReverseResult>("reverse", &query).await {
            Ok(result) => result.display_name,
            Err(err) => {
                warn!("Reverse geocoding {pt:?} failed: {err}");
                None
            }
        }
    }

    /// The best match for a free-text address
    pub async fn forward(&self, address: &str) -> Option<LatLng> {
        let query = [("format", "json".to_string()), ("q", address.to_string())];
        let results = match self.lookup::<Vec<SearchResult>>("search", &query).await {
            Ok(results) => results,
            Err(err) => {
                warn!("Geocoding {address:?} failed: {err}");
                return None;
            }
        };
        parse_first_match(&results)
    }

    async fn lookup<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, reqwest::Error> {
        self.client
            .get(format!("{}/{endpoint}", self.base))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

pub(crate) fn parse_first_match(results: &[SearchResult]) -> Option<LatLng> {
    let first = results.first()?;
    match (first.lat.parse(), first.lon.parse()) {
        (Ok(lat), Ok(lng)) => Some(LatLng::new(lat, lng)),
        _ => {
            warn!("Geocoder returned bad coordinates {:?}, {:?}", first.lat, first.lon);
            None
        }
    }
}
