//! Request/response plumbing below the session protocol.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::BackendError;
use crate::config::StorefrontConfig;

/// HTTP methods the backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// A file attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Multipart form body: text fields plus file parts, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    /// Value of the first text field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// One backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/api/cart/cartList`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    retried: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Whether this request is already the retry after a session refresh.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// The same request marked as retried.
    #[must_use]
    pub fn into_retry(mut self) -> Self {
        self.retried = true;
        self
    }

    /// Value of the first query parameter called `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The JSON body, if any.
    #[must_use]
    pub const fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Raw backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Convenience constructor for a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body parsed as JSON, `None` if it is not JSON.
    #[must_use]
    pub fn json_value(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// The envelope's `message` field.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.json_value()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
    }

    /// The envelope's `success` flag.
    #[must_use]
    pub fn success_flag(&self) -> Option<bool> {
        self.json_value()
            .and_then(|v| v.get("success").and_then(Value::as_bool))
    }
}

/// Something that can carry an [`ApiRequest`] to the backend.
///
/// Implementations report only transport failures as errors; every HTTP
/// status, including 401, comes back as an [`ApiResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError>;
}

/// Transport over `reqwest` with a persistent cookie jar.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestTransport {
    /// Build a transport for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()?;

        let mut base = config.api_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { client, base })
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, BackendError> {
        let mut url = self.base.join(request.path.trim_start_matches('/'))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError> {
        let url = self.url_for(request)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let builder = self.client.request(method, url);
        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(build_form(form)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            tracing::debug!(
                status,
                path = %request.path,
                body = %body.chars().take(200).collect::<String>(),
                "backend returned non-success status"
            );
        }

        Ok(ApiResponse { status, body })
    }
}

fn build_form(form: &MultipartForm) -> Result<reqwest::multipart::Form, BackendError> {
    let mut out = reqwest::multipart::Form::new();
    for (name, value) in &form.fields {
        out = out.text(name.clone(), value.clone());
    }
    for file in &form.files {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)?;
        out = out.part(file.field.clone(), part);
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        let config = StorefrontConfig::with_api_url(Url::parse(base).unwrap());
        ReqwestTransport::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_onto_base_path() {
        let t = transport("http://localhost:8000/backend");
        let url = t
            .url_for(&ApiRequest::get("/api/cart/cartList"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/backend/api/cart/cartList");
    }

    #[test]
    fn test_query_only_added_when_present() {
        let t = transport("http://localhost:8000");
        let bare = t.url_for(&ApiRequest::get("/api/product/all")).unwrap();
        assert_eq!(bare.query(), None);

        let paged = t
            .url_for(
                &ApiRequest::get("/api/limited/getLimitProduct")
                    .query("category", "men")
                    .query("limit", 6)
                    .query("page", 2),
            )
            .unwrap();
        assert_eq!(paged.query(), Some("category=men&limit=6&page=2"));
    }

    #[test]
    fn test_retry_marks_request() {
        let request = ApiRequest::post("/api/like/likeProduct");
        assert!(!request.is_retried());
        assert!(request.into_retry().is_retried());
    }

    #[test]
    fn test_response_envelope_accessors() {
        let response = ApiResponse::new(401, r#"{"success":false,"message":"jwt expired"}"#);
        assert!(!response.is_success());
        assert_eq!(response.success_flag(), Some(false));
        assert_eq!(response.message().as_deref(), Some("jwt expired"));
        assert_eq!(ApiResponse::new(500, "oops").message(), None);
    }
}
