//! HTTP client for the render, conversion and recognition services

use super::payload::{
    ConvertRequest, ConvertResponse, ConvertedDocument, PreviewRequest, PreviewResponse,
    Recognition, RecognizeResponse, ServiceResponse, UploadResponse,
};
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

const PREVIEW_PATH: &str = "/api/preview";
const UPLOAD_PATH: &str = "/api/upload";
const CONVERT_PATH: &str = "/api/convert";
const DOWNLOAD_PATH: &str = "/api/download";
const RECOGNIZE_PATH: &str = "/recognize_formula";

/// File name the recognizer receives for the rasterized formula
pub const FORMULA_UPLOAD_NAME: &str = "formula.png";

/// Handle to the backend. Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ServerConfig) -> ApiResult<Self> {
        let base_url = normalize_base_url(&config.base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL the generated document is fetched from. The id is one escaped
    /// path segment.
    pub fn download_url(&self, download_id: &str) -> ApiResult<Url> {
        let base = self.endpoint(DOWNLOAD_PATH);
        let mut url = Url::parse(&base).map_err(|_| ApiError::InvalidBaseUrl(base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(base.clone()))?
            .push(download_id);
        Ok(url)
    }

    pub fn preview_request(&self, content: &str) -> RequestBuilder {
        self.http
            .post(self.endpoint(PREVIEW_PATH))
            .json(&PreviewRequest { content })
    }

    pub fn convert_request(&self, content: &str, filename: &str) -> RequestBuilder {
        self.http
            .post(self.endpoint(CONVERT_PATH))
            .json(&ConvertRequest { content, filename })
    }

    pub fn upload_request(&self, file_name: String, bytes: Vec<u8>) -> RequestBuilder {
        let part = Part::bytes(bytes).file_name(file_name);
        self.http
            .post(self.endpoint(UPLOAD_PATH))
            .multipart(Form::new().part("file", part))
    }

    pub fn recognize_request(&self, png: Vec<u8>) -> ApiResult<RequestBuilder> {
        let part = Part::bytes(png)
            .file_name(FORMULA_UPLOAD_NAME)
            .mime_str("image/png")?;
        Ok(self
            .http
            .post(self.endpoint(RECOGNIZE_PATH))
            .multipart(Form::new().part("image", part)))
    }

    /// Render Markdown to HTML
    pub async fn preview(&self, content: &str) -> ApiResult<String> {
        log::debug!("POST {} ({} chars)", PREVIEW_PATH, content.chars().count());
        let response = self.preview_request(content).send().await?;
        read_envelope::<PreviewResponse>(response).await
    }

    /// Send a local document to the server and get its text back
    pub async fn upload_document(&self, file_name: String, bytes: Vec<u8>) -> ApiResult<String> {
        log::debug!("POST {} ({}, {} bytes)", UPLOAD_PATH, file_name, bytes.len());
        let response = self.upload_request(file_name, bytes).send().await?;
        read_envelope::<UploadResponse>(response).await
    }

    /// Ask the server to build a Word document
    pub async fn convert(&self, content: &str, filename: &str) -> ApiResult<ConvertedDocument> {
        log::debug!("POST {} (filename {})", CONVERT_PATH, filename);
        let response = self.convert_request(content, filename).send().await?;
        read_envelope::<ConvertResponse>(response).await
    }

    /// Fetch the bytes of a generated document
    pub async fn download(&self, document: &ConvertedDocument) -> ApiResult<Vec<u8>> {
        let url = self.download_url(&document.download_id)?;
        log::debug!("GET {}", url);
        let response = ensure_success(self.http.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Submit a PNG-encoded formula image for recognition
    pub async fn recognize_formula(&self, png: Vec<u8>) -> ApiResult<Recognition> {
        log::debug!("POST {} ({} bytes)", RECOGNIZE_PATH, png.len());
        let response = self.recognize_request(png)?.send().await?;
        read_envelope::<RecognizeResponse>(response).await
    }
}

fn normalize_base_url(raw: &str) -> ApiResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(ApiError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decode a `{success, ...}` envelope. Error statuses that still carry the
/// envelope are reported as service failures; anything else as `Status`.
async fn read_envelope<T>(response: Response) -> ApiResult<T::Output>
where
    T: ServiceResponse + DeserializeOwned,
{
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<T>(&body) {
        Ok(envelope) => envelope.into_result(),
        Err(_) if !status.is_success() => Err(ApiError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(ApiError::Decode(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&ServerConfig {
            base_url: "http://localhost:5000/".to_string(),
            request_timeout_secs: None,
        })
        .expect("client")
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        assert_eq!(client().base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_rejects_base_url_without_scheme() {
        let err = ApiClient::new(&ServerConfig {
            base_url: "localhost:5000".to_string(),
            request_timeout_secs: None,
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_preview_request_shape() {
        let request = client().preview_request("# Title").build().expect("request");
        assert_eq!(request.method(), "POST");
        assert_eq!(request.url().as_str(), "http://localhost:5000/api/preview");
        let body = request.body().and_then(|b| b.as_bytes()).expect("body");
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["content"], "# Title");
    }

    #[test]
    fn test_convert_request_shape() {
        let request = client()
            .convert_request("$$x$$", "document")
            .build()
            .expect("request");
        assert_eq!(request.url().path(), "/api/convert");
        let body = request.body().and_then(|b| b.as_bytes()).expect("body");
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["content"], "$$x$$");
        assert_eq!(json["filename"], "document");
    }

    #[test]
    fn test_recognize_request_is_multipart() {
        let request = client()
            .recognize_request(vec![0x89, b'P', b'N', b'G'])
            .expect("builder")
            .build()
            .expect("request");
        assert_eq!(request.url().path(), "/recognize_formula");
        let content_type = request
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("multipart/form-data"));
    }

    #[test]
    fn test_download_url() {
        assert_eq!(
            client().download_url("abc").unwrap().as_str(),
            "http://localhost:5000/api/download/abc"
        );
    }

    #[test]
    fn test_download_id_is_one_escaped_segment() {
        assert_eq!(
            client().download_url("a/b c?d").unwrap().as_str(),
            "http://localhost:5000/api/download/a%2Fb%20c%3Fd"
        );
    }
}
