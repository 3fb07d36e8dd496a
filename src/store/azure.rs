//! Azure Blob Storage destination over the REST API.
//!
//! Only two container operations are used:
//! - Get Container Properties (`GET ?restype=container`): 200 = exists, 404 = free
//! - Create Container (`PUT ?restype=container`): 201 = created, 409 = taken

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use super::auth::{sign, SharedKeyRequest};
use super::{blob_container_url, DestinationStore};
use crate::config::DestinationAccount;
use crate::errors::BackupError;

pub const API_VERSION: &str = "2021-06-08";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Destination account client authenticated with the account's Shared Key.
pub struct AzureBlobStore {
    account: String,
    decoded_key: Vec<u8>,
    client: Client,
    /// Base URL requests go to instead of the public account endpoint.
    endpoint: Option<String>,
}

impl std::fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl AzureBlobStore {
    pub fn new(destination: &DestinationAccount) -> Result<Self, BackupError> {
        let decoded_key = BASE64
            .decode(destination.storage_key.expose())
            .map_err(|e| {
                BackupError::Configuration(format!("destination storage_key is not valid base64: {e}"))
            })?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackupError::Store {
                context: "building HTTP client".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            account: destination.storage_account.clone(),
            decoded_key,
            client,
            endpoint: None,
        })
    }

    /// Send requests to `base` (e.g. `http://127.0.0.1:10000`) rather than the account host.
    /// `container_url` still reports the public URL handed to the copy tool.
    #[cfg(test)]
    pub(crate) fn with_endpoint(mut self, base: impl Into<String>) -> Self {
        self.endpoint = Some(base.into().trim_end_matches('/').to_string());
        // Local endpoints must not be routed through a proxy from the environment.
        if let Ok(client) = Client::builder().timeout(REQUEST_TIMEOUT).no_proxy().build() {
            self.client = client;
        }
        self
    }

    fn request_url(&self, container: &str) -> String {
        let base = match &self.endpoint {
            Some(ep) => format!("{ep}/{container}"),
            None => self.container_url(container),
        };
        format!("{base}?restype=container")
    }

    fn container_request(&self, method: Method, container: &str) -> Result<Response, BackupError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let ms_headers = [("x-ms-date", date.as_str()), ("x-ms-version", API_VERSION)];
        let auth = sign(
            &self.decoded_key,
            &SharedKeyRequest {
                method: method.as_str(),
                account: &self.account,
                path: container,
                query: &[("restype", "container")],
                ms_headers: &ms_headers,
                content_length: 0,
            },
        )?;

        let url = self.request_url(container);
        let mut rb = self
            .client
            .request(method.clone(), url.as_str())
            .header("Authorization", auth)
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION);
        if method == Method::PUT {
            rb = rb.header(CONTENT_LENGTH, "0").body(Vec::new());
        }
        debug!(method = %method, container, "blob request");

        rb.send().map_err(|e| BackupError::Store {
            context: format!("{method} container '{container}'"),
            reason: e.to_string(),
        })
    }
}

/// `<status> <x-ms-error-code>: <body>` for error reporting.
fn describe_failure(resp: Response) -> String {
    let status = resp.status();
    let code = resp
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = resp.text().unwrap_or_default();
    let body = body.trim();
    match (code.is_empty(), body.is_empty()) {
        (true, true) => status.to_string(),
        (true, false) => format!("{status}: {body}"),
        (false, true) => format!("{status} {code}"),
        (false, false) => format!("{status} {code}: {body}"),
    }
}

impl DestinationStore for AzureBlobStore {
    fn container_exists(&self, name: &str) -> Result<bool, BackupError> {
        let resp = self.container_request(Method::GET, name)?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(BackupError::Store {
                context: format!("checking container '{name}'"),
                reason: describe_failure(resp),
            }),
        }
    }

    fn create_container(&self, name: &str) -> Result<(), BackupError> {
        let resp = self.container_request(Method::PUT, name)?;
        match resp.status() {
            StatusCode::CREATED => {
                info!(container = name, account = %self.account, "Created destination container");
                Ok(())
            }
            _ => Err(BackupError::ContainerCreation {
                container: name.to_string(),
                reason: describe_failure(resp),
            }),
        }
    }

    fn container_url(&self, name: &str) -> String {
        blob_container_url(&self.account, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer one HTTP request with a canned response; yields the request head.
    fn serve_once(status: &'static str, headers: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = conn.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\n{headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            conn.write_all(resp.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });
        (base, handle)
    }

    fn store(base: &str) -> AzureBlobStore {
        AzureBlobStore::new(&DestinationAccount::new("dstacct", "a2V5"))
            .unwrap()
            .with_endpoint(base)
    }

    #[test]
    fn rejects_non_base64_key() {
        let err = AzureBlobStore::new(&DestinationAccount::new("dstacct", "%%%")).unwrap_err();
        assert!(matches!(err, BackupError::Configuration(_)));
    }

    #[test]
    fn container_url_uses_destination_account() {
        let store = AzureBlobStore::new(&DestinationAccount::new("dstacct", "a2V5")).unwrap();
        assert_eq!(
            store.container_url("20240315-0930-backup-mydata"),
            "https://dstacct.blob.core.windows.net/20240315-0930-backup-mydata"
        );
        assert!(!format!("{store:?}").contains("a2V5"));
    }

    #[test]
    fn ok_means_container_exists() {
        let (base, h) = serve_once("200 OK", "", "");
        assert!(store(&base).container_exists("c1").unwrap());
        let head = h.join().unwrap();
        assert!(head.starts_with("GET /c1?restype=container HTTP/1.1"), "{head}");
        let lower = head.to_ascii_lowercase();
        assert!(lower.contains("authorization: sharedkey dstacct:"), "{head}");
        assert!(lower.contains("x-ms-version: 2021-06-08"), "{head}");
    }

    #[test]
    fn not_found_means_name_is_free() {
        let (base, h) = serve_once("404 Not Found", "x-ms-error-code: ContainerNotFound\r\n", "");
        assert!(!store(&base).container_exists("c1").unwrap());
        h.join().unwrap();
    }

    #[test]
    fn other_probe_status_is_store_error() {
        let (base, h) = serve_once(
            "500 Internal Server Error",
            "x-ms-error-code: InternalError\r\n",
            "try later",
        );
        let err = store(&base).container_exists("c1").unwrap_err();
        h.join().unwrap();
        match err {
            BackupError::Store { reason, .. } => {
                assert!(reason.contains("500"), "{reason}");
                assert!(reason.contains("InternalError"), "{reason}");
                assert!(reason.contains("try later"), "{reason}");
            }
            other => panic!("expected Store error, got {other:?}"),
        }
    }

    #[test]
    fn created_means_container_created() {
        let (base, h) = serve_once("201 Created", "", "");
        store(&base).create_container("c1").unwrap();
        let head = h.join().unwrap();
        assert!(head.starts_with("PUT /c1?restype=container HTTP/1.1"), "{head}");
        assert!(head.to_ascii_lowercase().contains("content-length: 0"), "{head}");
    }

    #[test]
    fn conflict_is_creation_failure() {
        let (base, h) = serve_once(
            "409 Conflict",
            "x-ms-error-code: ContainerAlreadyExists\r\n",
            "",
        );
        let err = store(&base).create_container("c1").unwrap_err();
        h.join().unwrap();
        match err {
            BackupError::ContainerCreation { container, reason } => {
                assert_eq!(container, "c1");
                assert!(reason.contains("ContainerAlreadyExists"), "{reason}");
            }
            other => panic!("expected ContainerCreation, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_endpoint_is_store_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let err = store(&base).container_exists("c1").unwrap_err();
        assert!(matches!(err, BackupError::Store { .. }));
    }
}
