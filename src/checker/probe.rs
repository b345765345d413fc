// src/checker/probe.rs
// =============================================================================
// This module decides whether a single image URL actually loads.
//
// The check tries to behave like an <img> tag:
// - The URL must parse
// - data:image/... URLs load without any network access
// - Only http and https are fetched
// - The response must be 2xx AND look like an image: the first bytes of the
//   body are sniffed for image signatures, and an image/* Content-Type only
//   counts when the body is not empty or plain text/HTML
//
// A probe never fails. Every problem (bad URL, DNS, TLS, 404, HTML page
// instead of an image, ...) becomes a `Broken` outcome with a reason.
//
// Rust concepts:
// - Traits: `ImageProber` lets the validator work with a fake prober in tests
// - BoxFuture: a boxed, Send future so trait objects and tokio::spawn both work
// =============================================================================

use crate::config::ProbeSettings;
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// The result of probing one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The URL loads as an image
    Valid,
    /// Anything else
    Broken { reason: String },
}

impl ProbeOutcome {
    pub fn broken(reason: impl Into<String>) -> Self {
        ProbeOutcome::Broken {
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ProbeOutcome::Valid)
    }
}

/// Something that can check whether a URL is a reachable image
pub trait ImageProber: Send + Sync {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProbeOutcome>;
}

/// Probes image URLs over HTTP(S) with reqwest
#[derive(Debug, Clone)]
pub struct HttpImageProber {
    client: Client,
}

impl HttpImageProber {
    /// Builds the shared HTTP client. The client is reused for every probe
    /// (connection pooling).
    pub fn new(settings: &ProbeSettings) -> reqwest::Result<Self> {
        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .user_agent(settings.user_agent.clone());

        // 0 = no timeout
        if settings.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(settings.timeout_secs));
        }

        let client = builder.build()?;

        Ok(Self { client })
    }

    async fn probe_url(&self, raw: &str) -> ProbeOutcome {
        let url = match Url::parse(raw.trim()) {
            Ok(url) => url,
            Err(e) => return ProbeOutcome::broken(format!("malformed URL: {}", e)),
        };

        match url.scheme() {
            "http" | "https" => {}
            "data" => return probe_data_url(&url),
            other => return ProbeOutcome::broken(format!("unsupported scheme '{}'", other)),
        }

        match self.client.get(url).send().await {
            Ok(response) => analyze_response(response).await,
            Err(e) => categorize_error(e),
        }
    }
}

impl ImageProber for HttpImageProber {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProbeOutcome> {
        self.probe_url(url).boxed()
    }
}

// data:[<mediatype>][;base64],<data>
fn probe_data_url(url: &Url) -> ProbeOutcome {
    let media_type = url
        .path()
        .split([',', ';'])
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if media_type.starts_with("image/") {
        ProbeOutcome::Valid
    } else {
        ProbeOutcome::broken(format!("data URL is not an image ({})", media_type))
    }
}

/// Bytes of the body read for sniffing
const SNIFF_LEN: usize = 512;

// Looks at the status code first, then at what kind of body came back
async fn analyze_response(mut response: reqwest::Response) -> ProbeOutcome {
    let status = response.status();
    if !status.is_success() {
        return ProbeOutcome::broken(format!("HTTP {}", status.as_u16()));
    }

    // "image/png; charset=binary" -> "image/png"
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match read_head(&mut response).await {
        Ok(head) => judge_body(content_type.as_deref(), &head),
        Err(e) => categorize_error(e),
    }
}

// First SNIFF_LEN bytes of the body, or all of it if shorter
async fn read_head(response: &mut reqwest::Response) -> reqwest::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    while head.len() < SNIFF_LEN {
        match response.chunk().await? {
            Some(bytes) => head.extend_from_slice(&bytes),
            None => break,
        }
    }
    head.truncate(SNIFF_LEN);
    Ok(head)
}

/// Decides from the declared type and the leading bytes.
///
/// The bytes win when they carry a known image signature. Otherwise:
/// - image/svg+xml needs an `<svg` element somewhere in the head
/// - other image/* types pass unless the body is empty or reads as text
///   (the usual HTML error page served with an image type)
/// - octet-stream, binary/* or no type at all need a known signature
/// - any other declared type is not an image
fn judge_body(content_type: Option<&str>, head: &[u8]) -> ProbeOutcome {
    if looks_like_image(head) {
        return ProbeOutcome::Valid;
    }

    match content_type {
        Some("image/svg+xml") => {
            if contains_svg_element(head) {
                ProbeOutcome::Valid
            } else {
                ProbeOutcome::broken("body is not an SVG document (Content-Type: image/svg+xml)")
            }
        }
        Some(ct) if ct.starts_with("image/") => {
            if head.is_empty() {
                ProbeOutcome::broken(format!("empty body (Content-Type: {})", ct))
            } else if looks_like_text(head) {
                ProbeOutcome::broken(format!("body is text, not an image (Content-Type: {})", ct))
            } else {
                ProbeOutcome::Valid
            }
        }
        None | Some("application/octet-stream") => {
            ProbeOutcome::broken("response body is not a recognizable image")
        }
        Some(ct) if ct.starts_with("binary/") => {
            ProbeOutcome::broken("response body is not a recognizable image")
        }
        Some(ct) => ProbeOutcome::broken(format!("not an image (Content-Type: {})", ct)),
    }
}

/// Checks the leading bytes against common image file signatures
pub fn looks_like_image(bytes: &[u8]) -> bool {
    const SIGNATURES: [&[u8]; 8] = [
        b"\x89PNG\r\n\x1a\n",
        b"\xff\xd8\xff",
        b"GIF87a",
        b"GIF89a",
        b"BM",
        b"\x00\x00\x01\x00",
        b"II*\x00",
        b"MM\x00*",
    ];

    if SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        return true;
    }

    // RIFF....WEBP
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return true;
    }

    // ISO base media: ....ftyp<brand> for AVIF and HEIF
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return matches!(&bytes[8..12], b"avif" | b"avis" | b"heic" | b"heix" | b"mif1");
    }

    // SVG, bare or behind an XML prolog
    let head = String::from_utf8_lossy(bytes).to_ascii_lowercase();
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

fn contains_svg_element(bytes: &[u8]) -> bool {
    String::from_utf8_lossy(bytes)
        .to_ascii_lowercase()
        .contains("<svg")
}

// Markup, JSON, or plain printable text
fn looks_like_text(bytes: &[u8]) -> bool {
    let trimmed = match bytes.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(start) => &bytes[start..],
        None => return true,
    };
    trimmed.starts_with(b"<")
        || trimmed.starts_with(b"{")
        || trimmed
            .iter()
            .all(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
}

// Turns a reqwest error into a human-readable reason
fn categorize_error(error: reqwest::Error) -> ProbeOutcome {
    let error_string = error.to_string().to_lowercase();

    let reason = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "could not resolve hostname".to_string()
        } else {
            "connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error.to_string()
    };

    ProbeOutcome::Broken { reason }
}


// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why GET and not HEAD?
//    - Plenty of image CDNs answer HEAD with 403/405 but serve GET fine
//    - We only read the first 512 bytes of the body, so the cost stays small
//
// 2. Why BoxFuture in the trait?
//    - The validator spawns the probe loop with tokio::spawn, which needs
//      a Send future
//    - BoxFuture<'a, T> is Pin<Box<dyn Future<Output = T> + Send + 'a>>
//    - `.boxed()` (from FutureExt) turns any Send future into one
// -----------------------------------------------------------------------------
