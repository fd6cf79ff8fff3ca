use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::{error::FetchError, model::ForecastResponse};

use super::{ForecastClient, ForecastQuery};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_UNITS: &str = "metric";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    units: String,
    http: Client,
}

#[derive(Debug)]
pub struct OpenWeatherClientBuilder {
    api_key: String,
    base_url: String,
    units: String,
    timeout: Duration,
}

impl OpenWeatherClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenWeatherClient, FetchError> {
        let http = Client::builder().timeout(self.timeout).build()?;

        Ok(OpenWeatherClient {
            api_key: self.api_key,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            units: self.units,
            http,
        })
    }
}

impl OpenWeatherClient {
    pub fn builder(api_key: impl Into<String>) -> OpenWeatherClientBuilder {
        OpenWeatherClientBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            units: DEFAULT_UNITS.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn query_params(&self, query: &ForecastQuery) -> Vec<(&'static str, String)> {
        let mut params = match query {
            ForecastQuery::City(name) => vec![("q", name.clone())],
            ForecastQuery::Coordinates(c) => {
                vec![("lat", c.latitude.to_string()), ("lon", c.longitude.to_string())]
            }
        };
        params.push(("units", self.units.clone()));
        params.push(("appid", self.api_key.clone()));
        params
    }
}

#[async_trait]
impl ForecastClient for OpenWeatherClient {
    #[instrument(skip_all, fields(query = %query), level = "debug")]
    async fn fetch(&self, query: &ForecastQuery) -> Result<ForecastResponse, FetchError> {
        let url = format!("{}/forecast", self.base_url);

        let res = self.http.get(&url).query(&self.query_params(query)).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: ForecastResponse = serde_json::from_str(&body)?;
        debug!(city = %parsed.city.name, entries = parsed.list.len(), "forecast received");

        Ok(parsed)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, tests::SAMPLE_FORECAST};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::builder("test_key").base_url(server.uri()).build().unwrap()
    }

    #[tokio::test]
    async fn fetch_by_city_sends_expected_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Tampere"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_FORECAST))
            .expect(1)
            .mount(&server)
            .await;

        let forecast = client(&server)
            .fetch(&ForecastQuery::City("Tampere".into()))
            .await
            .unwrap();

        assert_eq!(forecast.city.name, "Tampere");
        assert_eq!(forecast.list.len(), 2);
    }

    #[tokio::test]
    async fn fetch_by_coordinates_sends_lat_lon() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("lat", "61.4978"))
            .and(query_param("lon", "23.761"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_FORECAST))
            .expect(1)
            .mount(&server)
            .await;

        let query = ForecastQuery::Coordinates(Coordinates::new(61.4978, 23.761));
        let forecast = client(&server).fetch(&query).await.unwrap();

        assert_eq!(forecast.city.coord.lat, 61.4978);
    }

    #[tokio::test]
    async fn non_success_status_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string(r#"{"cod":"404","message":"city not found"}"#),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(&ForecastQuery::City("Atlantis".into()))
            .await
            .unwrap_err();

        match err {
            FetchError::Provider { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("city not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"cod\":\"200\"}"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(&ForecastQuery::City("Tampere".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let client = OpenWeatherClient::builder("k")
            .base_url("http://127.0.0.1:9")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = client.fetch(&ForecastQuery::City("Tampere".into())).await.unwrap_err();
        assert!(err.is_network());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "ä".repeat(300);
        let truncated = truncate_body(&long);

        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
