//! Screenshot upload through a link-code broker.
//!
//! Uploading is a two-step handshake: the broker hands out a short-lived
//! upload code, then the image is posted as a multipart form to the storage
//! API together with that code. There is no retry; any failure is returned to
//! the caller and nothing is kept locally.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub link_endpoint: Url,
    pub upload_endpoint: Url,
    pub folder: String,
}

impl UploadConfig {
    pub fn new(
        link_endpoint: &str,
        upload_endpoint: &str,
        folder: impl Into<String>,
    ) -> Result<Self> {
        let folder = folder.into();
        if folder.trim().is_empty() {
            bail!("upload folder must not be empty");
        }
        Ok(Self {
            link_endpoint: Url::parse(link_endpoint)
                .with_context(|| format!("invalid link endpoint '{link_endpoint}'"))?,
            upload_endpoint: Url::parse(upload_endpoint)
                .with_context(|| format!("invalid upload endpoint '{upload_endpoint}'"))?,
            folder,
        })
    }

    /// Storage URL carrying the upload code and target folder.
    pub fn upload_url(&self, code: &str) -> Url {
        let mut url = self.upload_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("code", code)
            .append_pair("names", &self.folder);
        url
    }
}

/// What the storage API reported for a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub file_name: String,
    pub bytes: usize,
    pub reply: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct UploadClient {
    http: Client,
    config: UploadConfig,
}

impl UploadClient {
    pub fn new(config: UploadConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Asks the broker for a one-off upload code.
    pub fn fetch_link_code(&self) -> Result<String> {
        let url = self.config.link_endpoint.clone();
        debug!(%url, "requesting upload link");
        let body = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .context("failed to get upload link")?
            .text()?;
        parse_link_code(&body)
    }

    /// Uploads one PNG under `file_name`.
    pub fn upload_png(&self, file_name: &str, png: Vec<u8>) -> Result<UploadReceipt> {
        let code = self.fetch_link_code()?;
        let url = self.config.upload_url(&code);
        let size = png.len();

        let part = Part::bytes(png)
            .file_name(file_name.to_string())
            .mime_str("image/png")?;
        let form = Form::new().part("file", part);

        debug!(url = %self.config.upload_endpoint, file = file_name, bytes = size, "uploading");
        let body = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .with_context(|| format!("uploading {file_name}"))?
            .error_for_status()
            .context("upload failed")?
            .text()?;
        let reply = parse_upload_reply(&body)?;

        info!(file = file_name, bytes = size, folder = %self.config.folder, "screenshot uploaded");
        Ok(UploadReceipt {
            file_name: file_name.to_string(),
            bytes: size,
            reply,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LinkReply {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageReply {
    result: i64,
    #[serde(default)]
    error: Option<String>,
}

fn parse_link_code(body: &str) -> Result<String> {
    let reply: LinkReply = serde_json::from_str(body).with_context(|| {
        let snippet = body.chars().take(200).collect::<String>();
        format!("invalid upload link response: {snippet}")
    })?;
    match reply.code {
        Some(code) if !code.trim().is_empty() => Ok(code),
        _ => Err(anyhow!("invalid upload link response: missing code")),
    }
}

fn parse_upload_reply(body: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(body).with_context(|| {
        let snippet = body.chars().take(200).collect::<String>();
        format!("unexpected storage API response: {snippet}")
    })?;
    let reply = StorageReply::deserialize(&value).context("storage API response has no result")?;
    if reply.result != 0 {
        bail!(
            "storage API error {}: {}",
            reply.result,
            reply.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(value)
}

/// `rivvon-screenshot-<timestamp>.png`, with the millisecond UTC timestamp
/// made filesystem safe.
pub fn capture_file_name(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("rivvon-screenshot-{stamp}.png")
}

/// [`capture_file_name`] for the current instant.
pub fn timestamped_file_name() -> String {
    capture_file_name(Utc::now())
}
