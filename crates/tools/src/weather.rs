//! Live weather lookup backed by OpenWeatherMap.
//!
//! Every outcome is returned as tool-result text: a formatted report on
//! success, a short error sentence otherwise. The model reads either one
//! and phrases the reply; a missing API key or an unreachable upstream
//! never aborts the turn.

use async_trait::async_trait;
use serde::Deserialize;
use skylark_core::error::ToolError;
use skylark_core::tool::Tool;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct WeatherTool {
    api_key: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl WeatherTool {
    pub fn new(api_key: Option<String>, api_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            api_url,
            client,
        }
    }

    async fn fetch(&self, city: &str, api_key: &str) -> String {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("q", city),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(city = %city, error = %e, "Weather request failed");
                return format!("Exception occurred: {e}");
            }
        };

        if !response.status().is_success() {
            let message = match response.json::<UpstreamError>().await {
                Ok(err) => err.message,
                Err(e) => e.to_string(),
            };
            warn!(city = %city, message = %message, "Weather API returned error");
            return format!("Error fetching weather: {message}");
        }

        match response.json::<WeatherResponse>().await {
            Ok(data) => format_report(city, &data),
            Err(e) => format!("Exception occurred: {e}"),
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Fetches real-time weather data for a specified city. Returns temperature, conditions, humidity, and wind speed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The name of the city, e.g. London or Tokyo"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<String, ToolError> {
        let city = arguments["city"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'city' argument".into()))?;

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok("Error: OpenWeatherMap API key not found.".into());
        };

        debug!(city = %city, "Fetching weather");
        Ok(self.fetch(city, api_key).await)
    }
}

/// The subset of the OpenWeatherMap response we read.
#[derive(Debug, Deserialize)]
struct WeatherResponse {
    weather: Vec<WeatherCondition>,
    main: WeatherMain,
    wind: WeatherWind,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct WeatherWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: String,
}

fn format_report(city: &str, data: &WeatherResponse) -> String {
    let description = data
        .weather
        .first()
        .map(|w| w.description.as_str())
        .unwrap_or("unknown conditions");

    format!(
        "The weather in {city} is currently {description} with a temperature of {temp}°C, humidity of {humidity}%, and wind speed of {wind} m/s.",
        temp = data.main.temp,
        humidity = data.main.humidity,
        wind = data.wind.speed,
    )
}
