use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use pipewatch_core::{StartRequest, StatusSnapshot};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{ApiError, DiagnosticsReport, FailureKind, StartReply};

const DEFAULT_STARTED_MESSAGE: &str = "Pipeline started";
const DEFAULT_REFUSED_MESSAGE: &str = "The server refused the request";
const DEFAULT_STOP_MESSAGE: &str = "Stop requested";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Orchestrator root, e.g. `http://localhost:5000/`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// The orchestrator's HTTP surface.
#[async_trait::async_trait]
pub trait PipelineApi: Send + Sync {
    async fn status(&self) -> Result<StatusSnapshot, ApiError>;
    async fn start(&self, request: &StartRequest) -> Result<StartReply, ApiError>;
    async fn stop(&self) -> Result<String, ApiError>;
    async fn diagnostics(&self) -> Result<DiagnosticsReport, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestPipelineApi {
    base: Url,
    client: reqwest::Client,
}

impl ReqwestPipelineApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut raw = settings.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base =
            Url::parse(&raw).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(FailureKind::InvalidUrl, raw));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StartBody {
    status: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiagnosticsBody {
    pipeline_executor_available: bool,
}

#[async_trait::async_trait]
impl PipelineApi for ReqwestPipelineApi {
    async fn status(&self) -> Result<StatusSnapshot, ApiError> {
        let url = self.endpoint("status")?;
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = success_body(response).await?;
        decode(&body)
    }

    async fn start(&self, request: &StartRequest) -> Result<StartReply, ApiError> {
        let url = self.endpoint("start_pipeline")?;
        let payload = serde_json::to_vec(request)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        engine_debug!("POST {} {}", url, request.summary());

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed = serde_json::from_slice::<StartBody>(&body).ok();

        if !status.is_success() {
            engine_warn!("Start request refused with HTTP {}", status.as_u16());
            let message = parsed
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("server returned HTTP {}", status.as_u16()));
            return Ok(StartReply {
                accepted: false,
                message,
            });
        }

        let body = parsed.ok_or_else(|| {
            ApiError::new(FailureKind::Decode, "start response is not a JSON object")
        })?;
        let accepted = body.status.as_deref() == Some("success");
        let message = body.message.unwrap_or_else(|| {
            if accepted {
                DEFAULT_STARTED_MESSAGE.to_string()
            } else {
                DEFAULT_REFUSED_MESSAGE.to_string()
            }
        });
        Ok(StartReply { accepted, message })
    }

    async fn stop(&self) -> Result<String, ApiError> {
        let url = self.endpoint("stop_pipeline")?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let message = serde_json::from_slice::<MessageBody>(&body)
            .ok()
            .and_then(|body| body.message);

        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message.unwrap_or_else(|| reason(status)),
            ));
        }
        Ok(message.unwrap_or_else(|| DEFAULT_STOP_MESSAGE.to_string()))
    }

    async fn diagnostics(&self) -> Result<DiagnosticsReport, ApiError> {
        let url = self.endpoint("debug/pipeline")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = success_body(response).await?;
        let parsed: DiagnosticsBody = decode(&body)?;
        Ok(DiagnosticsReport {
            executor_available: parsed.pipeline_executor_available,
        })
    }
}

async fn success_body(response: Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            reason(status),
        ));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    Ok(bytes.to_vec())
}

fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
