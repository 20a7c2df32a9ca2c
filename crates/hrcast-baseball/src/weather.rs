// Current ballpark weather from OpenWeatherMap, with a fixed fallback.
//
// Any failure (no API key, network error, non-2xx status, missing fields)
// yields the configured fallback reading tagged `ConditionsSource::Fallback`
// so callers can tell degraded mode apart from a genuine calm, mild day.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ballpark::BallparkTable;
use crate::error::{get_text, ProviderError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a weather reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionsSource {
    /// Returned by the weather service.
    Live,
    /// Fixed fallback after a weather service failure.
    Fallback,
    /// Entered by the user.
    Manual,
}

/// Wind speed and temperature at a ballpark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Conditions {
    pub wind_mph: f64,
    pub temp_f: f64,
    pub source: ConditionsSource,
}

impl Conditions {
    pub fn manual(wind_mph: f64, temp_f: f64) -> Self {
        Self {
            wind_mph,
            temp_f,
            source: ConditionsSource::Manual,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source == ConditionsSource::Fallback
    }
}

// ---------------------------------------------------------------------------
// Weather API seam
// ---------------------------------------------------------------------------

/// Current-conditions query by coordinate. Returns `(wind_mph, temp_f)`.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn current(&self, lat: f64, lon: f64) -> Result<(f64, f64), ProviderError>;
}

/// OpenWeatherMap "current weather" client (imperial units).
pub struct OpenWeather {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenWeather {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl WeatherApi for OpenWeather {
    async fn current(&self, lat: f64, lon: f64) -> Result<(f64, f64), ProviderError> {
        let Some(key) = &self.api_key else {
            return Err(ProviderError::NotConfigured(
                "openweather_api_key is not set".into(),
            ));
        };

        let request = self.http.get(&self.endpoint).query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", key.clone()),
            ("units", "imperial".to_string()),
        ]);
        debug!(lat, lon, "querying current weather");
        let body = get_text(request, &self.endpoint).await?;

        parse_conditions(&body).ok_or_else(|| ProviderError::Malformed {
            url: self.endpoint.clone(),
            message: "expected numeric wind.speed and main.temp".into(),
        })
    }
}

/// Extract `(wind.speed, main.temp)` from an OpenWeatherMap response body.
///
/// Expected shape: `{ "wind": { "speed": N }, "main": { "temp": N }, ... }`
pub(crate) fn parse_conditions(body: &str) -> Option<(f64, f64)> {
    let v: Value = serde_json::from_str(body).ok()?;
    let wind = v.get("wind")?.get("speed")?.as_f64()?;
    let temp = v.get("main")?.get("temp")?.as_f64()?;
    Some((wind, temp))
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Maps ballpark names to current conditions.
pub struct WeatherProvider<W> {
    api: W,
    ballparks: BallparkTable,
    fallback_wind_mph: f64,
    fallback_temp_f: f64,
}

impl<W: WeatherApi> WeatherProvider<W> {
    pub fn new(
        api: W,
        ballparks: BallparkTable,
        fallback_wind_mph: f64,
        fallback_temp_f: f64,
    ) -> Self {
        Self {
            api,
            ballparks,
            fallback_wind_mph,
            fallback_temp_f,
        }
    }

    pub fn api(&self) -> &W {
        &self.api
    }

    pub fn fallback(&self) -> Conditions {
        Conditions {
            wind_mph: self.fallback_wind_mph,
            temp_f: self.fallback_temp_f,
            source: ConditionsSource::Fallback,
        }
    }

    /// Current conditions at `ballpark`. Unknown parks are queried at (0, 0).
    pub async fn current_conditions(&self, ballpark: &str) -> Conditions {
        let (lat, lon) = match self.ballparks.coordinates(ballpark) {
            Some(coords) => coords,
            None => {
                warn!(
                    "no coordinates for ballpark '{}', querying (0, 0)",
                    ballpark
                );
                (0.0, 0.0)
            }
        };

        match self.api.current(lat, lon).await {
            Ok((wind_mph, temp_f)) if wind_mph.is_finite() && temp_f.is_finite() => Conditions {
                wind_mph,
                temp_f,
                source: ConditionsSource::Live,
            },
            Ok(_) => {
                warn!("weather for '{}' was not finite, using fallback", ballpark);
                self.fallback()
            }
            Err(e) => {
                warn!(
                    "weather lookup for '{}' failed, using fallback: {}",
                    ballpark, e
                );
                self.fallback()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
