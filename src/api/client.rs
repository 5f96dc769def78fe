use crate::api::types::{Pc, PcId, PcIdResponse, PcRef, UpdateNotesRequest};
use crate::api::PcApi;
use crate::config::ApiConfig;
use crate::error::TransportError;
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client for the inventory API.
///
/// Every request carries a JSON content type. Responses are classified into
/// [`TransportError::TransportFailure`] (connection or non-2xx status) and
/// [`TransportError::DecodeFailure`] (2xx with an unparseable body). Nothing
/// is retried here.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;
    if base.cannot_be_a_base() {
      return Err(eyre!("API url {} cannot be used as a base", config.url));
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  /// Send a request to `path` (relative to the base url) and decode the
  /// response body as JSON.
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
  ) -> Result<Value, TransportError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    self.send(method, &segments, body).await
  }

  async fn send(
    &self,
    method: Method,
    segments: &[&str],
    body: Option<&Value>,
  ) -> Result<Value, TransportError> {
    let url = self.endpoint(segments);
    debug!(%method, %url, "api request");

    let mut request = self.http.request(method.clone(), url.clone());
    if let Some(body) = body {
      request = request.body(body.to_string());
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(TransportError::status(
        status.as_u16(),
        format!("{} {} returned {}", method, url.path(), status),
      ));
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(TransportError::from)
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    // Checked in `new`
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
  Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl PcApi for ApiClient {
  async fn list_pcs(&self) -> Result<Vec<PcRef>, TransportError> {
    decode(self.send(Method::GET, &["pcs"], None).await?)
  }

  async fn get_pc(&self, id: &PcId) -> Result<Pc, TransportError> {
    let id = id.to_string();
    decode(self.send(Method::GET, &["pc", &id], None).await?)
  }

  async fn update_notes(&self, id: &PcId, notes: &str) -> Result<PcIdResponse, TransportError> {
    let body = serde_json::to_value(UpdateNotesRequest { pc_id: id, notes })?;
    decode(
      self
        .send(Method::POST, &["update_notes"], Some(&body))
        .await?,
    )
  }

  async fn delete_pc(&self, id: &PcId) -> Result<PcIdResponse, TransportError> {
    let id = id.to_string();
    decode(self.send(Method::DELETE, &["pc", &id, "delete"], None).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;
  use tokio::task::JoinHandle;

  /// Serve a single canned response and hand back the raw request text.
  async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
      let (mut stream, _) = listener.accept().await.unwrap();
      let request = read_request(&mut stream).await;
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      stream.write_all(response.as_bytes()).await.unwrap();
      stream.shutdown().await.ok();
      request
    });

    (base, handle)
  }

  async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
      let n = stream.read(&mut chunk).await.unwrap();
      if n == 0 {
        break;
      }
      buf.extend_from_slice(&chunk[..n]);
      let text = String::from_utf8_lossy(&buf).to_string();
      if let Some(head_end) = text.find("\r\n\r\n") {
        let content_length = text[..head_end]
          .lines()
          .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name
              .eq_ignore_ascii_case("content-length")
              .then(|| value.trim().parse::<usize>().ok())
              .flatten()
          })
          .unwrap_or(0);
        if buf.len() >= head_end + 4 + content_length {
          break;
        }
      }
    }
    String::from_utf8_lossy(&buf).to_string()
  }

  fn client(base: &str) -> ApiClient {
    ApiClient::new(&ApiConfig {
      url: base.to_string(),
      timeout_secs: Some(5),
    })
    .unwrap()
  }

  #[tokio::test]
  async fn test_list_pcs() {
    let (base, server) = serve_once("200 OK", r#"[{"id":"p1"},{"id":"p2"}]"#).await;

    let pcs = client(&base).list_pcs().await.unwrap();
    assert_eq!(pcs.len(), 2);
    assert_eq!(pcs[1].id, PcId::from("p2"));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /pcs HTTP/1.1"));
    assert!(request
      .to_lowercase()
      .contains("content-type: application/json"));
  }

  #[tokio::test]
  async fn test_server_error_is_transport_failure() {
    let (base, _server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

    let err = client(&base).list_pcs().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.http_status(), Some(500));
  }

  #[tokio::test]
  async fn test_status_checked_before_body() {
    let (base, _server) = serve_once("404 Not Found", "not json at all").await;

    let err = client(&base).get_pc(&PcId::from("p9")).await.unwrap_err();
    assert!(err.is_transport());
  }

  #[tokio::test]
  async fn test_unparseable_body_is_decode_failure() {
    let (base, _server) = serve_once("200 OK", "<html>oops</html>").await;

    let err = client(&base).list_pcs().await.unwrap_err();
    assert!(err.is_decode());
  }

  #[tokio::test]
  async fn test_wrong_shape_is_decode_failure() {
    let (base, _server) = serve_once("200 OK", r#"{"id":"p1","host":"bench"}"#).await;

    let err = client(&base).get_pc(&PcId::from("p1")).await.unwrap_err();
    assert!(err.is_decode());
  }

  #[tokio::test]
  async fn test_connection_refused_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&base).list_pcs().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.http_status(), None);
  }

  #[tokio::test]
  async fn test_update_notes_posts_body() {
    let (base, server) = serve_once("200 OK", r#"{"pc_id":"p1"}"#).await;

    let ack = client(&base)
      .update_notes(&PcId::from("p1"), "new fan")
      .await
      .unwrap();
    assert_eq!(ack.pc_id, PcId::from("p1"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /update_notes HTTP/1.1"));
    let body = request.split("\r\n\r\n").nth(1).unwrap();
    let body: Value = serde_json::from_str(body).unwrap();
    assert_eq!(body, json!({ "pc_id": "p1", "notes": "new fan" }));
  }

  #[tokio::test]
  async fn test_delete_path() {
    let (base, server) = serve_once("200 OK", r#"{"pc_id":42}"#).await;

    let ack = client(&base).delete_pc(&PcId::Num(42)).await.unwrap();
    assert_eq!(ack.pc_id, PcId::Num(42));

    let request = server.await.unwrap();
    assert!(request.starts_with("DELETE /pc/42/delete HTTP/1.1"));
  }

  #[tokio::test]
  async fn test_base_path_is_kept() {
    let (base, server) = serve_once("200 OK", "[]").await;

    let value = client(&format!("{}/api/", base))
      .request(Method::GET, "/pcs", None)
      .await
      .unwrap();
    assert_eq!(value, json!([]));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/pcs HTTP/1.1"));
  }

  #[test]
  fn test_rejects_non_base_url() {
    let result = ApiClient::new(&ApiConfig {
      url: "mailto:admin@example.com".to_string(),
      timeout_secs: None,
    });
    assert!(result.is_err());
  }
}
