/*!
 * HTTP bridge speech backend.
 *
 * Talks to a host application that owns the actual speech engine. The
 * bridge contract is small: POST /speak blocks until the utterance has
 * finished playing on the host, POST /stop cancels whatever is in
 * flight, and GET /voices lists the host's voices.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::BackendSettings;
use crate::errors::BackendError;
use crate::voice::VoiceInfo;

use super::{SpeakRequest, SpeechBackend};

/// Speech bridge client
#[derive(Debug)]
pub struct BridgeBackend {
    /// HTTP client for bridge requests
    client: Client,
    /// Validated base URL, always with a trailing slash
    base_url: Url,
}

/// Utterance request body sent to the bridge
#[derive(Debug, Serialize)]
struct SpeakBody<'a> {
    /// Sentence text
    text: &'a str,
    /// Language tag for engine-side voice fallback
    language: &'a str,
    /// Explicit voice, omitted to let the host pick
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<&'a str>,
    /// Speech rate multiplier
    rate: f32,
}

/// Voice listing returned by the bridge
#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceInfo>,
}

impl BridgeBackend {
    /// Build the backend from configuration settings
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, BackendError> {
        let endpoint = settings
            .bridge_url
            .clone()
            .ok_or_else(|| BackendError::Unavailable("no bridge URL configured".to_string()))?;

        Self::new(&endpoint, settings.timeout_secs)
    }

    /// Create a bridge client against the given endpoint
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        // A trailing slash makes Url::join keep the full base path
        let mut normalized = endpoint.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let base_url = Url::parse(&normalized)
            .map_err(|e| BackendError::Unavailable(format!("invalid bridge URL {}: {}", endpoint, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Ok(Self { client, base_url })
    }

    fn route(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Unavailable(format!("invalid bridge route {}: {}", path, e)))
    }

    fn request_error(error: reqwest::Error) -> BackendError {
        if error.is_connect() || error.is_timeout() {
            BackendError::Unavailable(format!("bridge unreachable: {}", error))
        } else {
            BackendError::UtteranceFailed(format!("bridge request failed: {}", error))
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Bridge error ({}): {}", status, error_text);
            return Err(BackendError::BridgeError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SpeechBackend for BridgeBackend {
    async fn speak(&self, request: SpeakRequest) -> Result<(), BackendError> {
        let body = SpeakBody {
            text: &request.text,
            language: &request.language,
            voice_id: request.voice_id.as_deref(),
            rate: request.rate,
        };

        let response = self
            .client
            .post(self.route("speak")?)
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.route("stop")?)
            .send()
            .await
            .map_err(Self::request_error)?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn list_voices(&self, language: Option<&str>) -> Result<Vec<VoiceInfo>, BackendError> {
        let mut route = self.route("voices")?;
        if let Some(language) = language {
            route.query_pairs_mut().append_pair("language", language);
        }

        let response = self
            .client
            .get(route)
            .send()
            .await
            .map_err(|e| BackendError::VoiceEnumeration(e.to_string()))?;

        let response = Self::check_status(response).await?;

        let listing = response
            .json::<VoicesResponse>()
            .await
            .map_err(|e| BackendError::VoiceEnumeration(format!("malformed voice listing: {}", e)))?;

        Ok(listing.voices)
    }
}
