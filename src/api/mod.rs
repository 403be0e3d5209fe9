use crate::models::{
    EntityPatch, PreviewRequest, PreviewResponse, SubmitPatchesRequest, SubmitPatchesResponse,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    /// A 2xx submit response whose body reports a non-success status.
    fn rejected(response: &SubmitPatchesResponse) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: response
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Import submit failed".to_string()),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    /// Deployments inject `window.ENV.API_URL`; local dev falls back to the
    /// default backend port.
    pub fn new() -> Self {
        let default_api_url = "http://localhost:8088".to_string();

        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    if let Ok(api_url) = js_sys::Reflect::get(&env, &"API_URL".into()) {
                        if let Some(url_str) = api_url.as_string() {
                            return Self { api_url: url_str };
                        }
                    }
                }
            }
        }

        Self {
            api_url: default_api_url,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    pub fn from_env() -> Self {
        Self::new(EnvConfig::new().api_url)
    }

    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url, path);
        let res = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "Request failed"))
        }
    }

    pub async fn fetch_preview(&self, request: &PreviewRequest) -> ApiResult<PreviewResponse> {
        self.request_api("/api/import/preview", request).await
    }

    /// Submits the compiled diff set as one batch. Any rejection (transport,
    /// HTTP, or a 2xx body without a success status) fails the whole batch;
    /// callers keep their drafts and retry manually.
    pub async fn submit_patches(
        &self,
        patches: Vec<EntityPatch>,
    ) -> ApiResult<SubmitPatchesResponse> {
        let response: SubmitPatchesResponse = self
            .request_api("/api/import/submit", &SubmitPatchesRequest { patches })
            .await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::rejected(&response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatchOp, PatchOperation};

    #[test]
    fn test_api_client_new() {
        let client = ApiClient::new("http://localhost:8088".to_string());
        assert_eq!(client.base_url, "http://localhost:8088");
    }

    #[test]
    fn test_preview_request_serialization_omits_absent_query() {
        let req = PreviewRequest {
            start: 0,
            count: 25,
            query: None,
        };
        let v = serde_json::to_value(&req).expect("should serialize");
        assert_eq!(v["start"], 0);
        assert_eq!(v["count"], 25);
        assert!(v.get("query").is_none());

        let req = PreviewRequest {
            start: 25,
            count: 25,
            query: Some("users".to_string()),
        };
        let v = serde_json::to_value(&req).expect("should serialize");
        assert_eq!(v["query"], "users");
    }

    #[test]
    fn test_submit_request_wire_shape() {
        let req = SubmitPatchesRequest {
            patches: vec![EntityPatch {
                urn: "urn:ds:1".to_string(),
                entity_type: "DATASET".to_string(),
                operations: vec![PatchOperation {
                    op: PatchOp::Replace,
                    path: "/name".to_string(),
                    value: Some(serde_json::json!("users")),
                }],
            }],
        };
        let v = serde_json::to_value(&req).expect("should serialize");
        assert_eq!(v["patches"][0]["urn"], "urn:ds:1");
        assert_eq!(v["patches"][0]["entityType"], "DATASET");
        assert_eq!(v["patches"][0]["operations"][0]["op"], "replace");
    }

    #[test]
    fn test_rejected_submit_uses_server_message_with_fallback() {
        let with_message = SubmitPatchesResponse {
            status: "FAILED".to_string(),
            message: Some("urn:ds:1 is stale".to_string()),
        };
        let e = ApiError::rejected(&with_message);
        assert_eq!(e.kind, ApiErrorKind::Http);
        assert_eq!(e.to_string(), "urn:ds:1 is stale");

        let blank_message = SubmitPatchesResponse {
            status: "FAILED".to_string(),
            message: Some("  ".to_string()),
        };
        assert_eq!(
            ApiError::rejected(&blank_message).to_string(),
            "Import submit failed"
        );
    }
}
