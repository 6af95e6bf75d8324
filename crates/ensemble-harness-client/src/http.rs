// crates/ensemble-harness-client/src/http.rs
// ============================================================================
// Module: HTTP Resource API
// Description: Blocking HTTP implementation of the resource API seam.
// Purpose: Create, clone, and read remote resources with bounded responses.
// Dependencies: ensemble-harness-core, ensemble-harness-config, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpResourceApi`] maps [`ResourceApi`] calls onto the service's REST
//! endpoints: `POST {base}/ensemble` creates (or clones when the body carries
//! `origin`), `GET {base}/{id}` reads. Credentials travel as query
//! parameters and never appear in returned locations. Responses larger than
//! the configured limit fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;

use ensemble_harness_config::ApiConfig;
use ensemble_harness_core::ApiError;
use ensemble_harness_core::HttpCode;
use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceEnvelope;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceType;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body accepted from the service, in bytes.
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Client
// ============================================================================

/// Credentials attached to every request.
#[derive(Clone)]
struct Credentials {
    /// Account username.
    username: String,
    /// Account API key.
    api_key: String,
}

/// Blocking HTTP client for the remote resource service.
///
/// # Invariants
/// - `base_url` always ends with `/` so resource paths join beneath it.
/// - Redirects are not followed.
#[derive(Clone)]
pub struct HttpResourceApi {
    /// Base URL resource paths are joined onto.
    base_url: Url,
    /// Underlying HTTP client.
    client: Client,
    /// Optional account credentials.
    credentials: Option<Credentials>,
    /// Project assigned to created resources when the caller sets none.
    project: Option<String>,
    /// Response size limit in bytes.
    max_response_bytes: usize,
}

impl HttpResourceApi {
    /// Creates a client from API configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] when the base URL does not parse and
    /// [`ApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut raw = config.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url =
            Url::parse(&raw).map_err(|err| ApiError::Invalid(format!("invalid base url: {err}")))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ApiError::Transport(format!("http client build failed: {err}")))?;
        Ok(Self {
            base_url,
            client,
            credentials: config.credentials().map(|(username, api_key)| Credentials {
                username: username.to_string(),
                api_key: api_key.to_string(),
            }),
            project: config.project.clone(),
            max_response_bytes: MAX_RESPONSE_BYTES,
        })
    }

    /// Overrides the response size limit.
    #[must_use]
    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    /// Returns the base URL requests are issued against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Creates a resource of the given kind from a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails before a response arrives
    /// or the response cannot be decoded.
    pub fn create(
        &self,
        resource_type: ResourceType,
        mut body: Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        if let Some(project) = &self.project
            && !body.contains_key("project")
        {
            body.insert("project".to_string(), Value::String(project.clone()));
        }
        let path = resource_type.as_str();
        let payload = serde_json::to_vec(&Value::Object(body))
            .map_err(|err| ApiError::Invalid(format!("request body: {err}")))?;
        let request = self
            .client
            .post(self.authorized_url(path)?)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.send(request, path)
    }

    /// Returns the resource URL with credentials attached.
    fn authorized_url(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = self.public_url(path)?;
        if let Some(credentials) = &self.credentials {
            url.query_pairs_mut()
                .append_pair("username", &credentials.username)
                .append_pair("api_key", &credentials.api_key);
        }
        Ok(url)
    }

    /// Returns the resource URL without credentials.
    fn public_url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::Invalid(format!("invalid resource path {path}: {err}")))
    }

    /// Sends a request and maps the response into an envelope.
    fn send(&self, request: RequestBuilder, path: &str) -> Result<ResourceEnvelope, ApiError> {
        let mut response = request
            .send()
            .map_err(|err| ApiError::Transport(format!("request to {path} failed: {err}")))?;
        let code: HttpCode = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_response_limited(&mut response, self.max_response_bytes)?;
        let parsed = serde_json::from_slice::<Value>(&body);
        if !(200..300).contains(&code) {
            let error = match parsed {
                Ok(value) if !value.is_null() => value,
                _ => json!({
                    "status": {
                        "code": i64::from(code),
                        "message": String::from_utf8_lossy(&body),
                    }
                }),
            };
            return Ok(ResourceEnvelope::rejected(code, error));
        }
        let parsed =
            parsed.map_err(|err| ApiError::Decode(format!("response from {path}: {err}")))?;
        let resource = parsed
            .get("resource")
            .and_then(Value::as_str)
            .map(ResourceId::new)
            .ok_or_else(|| ApiError::Decode(format!("response from {path} has no resource id")))?;
        let location = match location {
            Some(location) => Some(location),
            None => Some(self.public_url(resource.as_str())?.to_string()),
        };
        Ok(ResourceEnvelope::accepted(code, resource, location, parsed))
    }
}

impl ResourceApi for HttpResourceApi {
    fn create_ensemble(
        &self,
        dataset: &ResourceId,
        args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        let mut body = args.clone();
        body.insert("dataset".to_string(), Value::String(dataset.to_string()));
        self.create(ResourceType::Ensemble, body)
    }

    fn clone_ensemble(
        &self,
        ensemble: &ResourceId,
        args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        if ensemble.resource_type() != ResourceType::Ensemble {
            return Err(ApiError::Invalid(format!("{ensemble} is not an ensemble")));
        }
        let mut body = args.clone();
        body.insert("origin".to_string(), Value::String(ensemble.to_string()));
        self.create(ResourceType::Ensemble, body)
    }

    fn get_resource(&self, resource: &ResourceId) -> Result<ResourceEnvelope, ApiError> {
        let request = self.client.get(self.authorized_url(resource.as_str())?);
        self.send(request, resource.as_str())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ApiError::Invalid("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(ApiError::Decode("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| ApiError::Transport(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(ApiError::Decode("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
