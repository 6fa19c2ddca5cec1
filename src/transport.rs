//! Transport mapping.
//!
//! Decodes the inbound request document and maps a pipeline result to a
//! transport-neutral [`Response`]. No server lives here; a host framework
//! copies the status, headers and body onto its own response type.
//!
//! | Result | Status | Body |
//! |--------|--------|------|
//! | Modified | 200 | ZIP archive, stats in `X-Processing-Stats` |
//! | Unmodified | 200 | `{"warning": ..., "stats": {...}}` |
//! | Error | [`Error::status_code`] | `{"error": ..., "success": false}` |

use serde::Deserialize;
use serde_json::json;

use crate::manifest::BrandTokens;
use crate::pipeline::{PipelineOutcome, PipelineStats, RebrandRequest};
use crate::rewrite::ModificationLedger;
use crate::rules::ReplacementRule;
use crate::{Error, Result};

/// Header carrying run statistics on a modified response.
pub const STATS_HEADER: &str = "X-Processing-Stats";

/// Warning returned when a run changed nothing.
pub const UNMODIFIED_WARNING: &str = "No modifications made";

/// The inbound request document.
///
/// Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDocument {
    /// Icon URL.
    #[serde(default)]
    pub icon_url: Option<String>,
    /// URL rules.
    #[serde(default)]
    pub url_replacements: Vec<ReplacementRule>,
    /// Text rules.
    #[serde(default)]
    pub text_replacements: Vec<ReplacementRule>,
    /// Explicit brand tokens.
    #[serde(default)]
    pub brand: Option<BrandTokens>,
}

impl From<RequestDocument> for RebrandRequest {
    fn from(doc: RequestDocument) -> Self {
        RebrandRequest {
            icon_url: doc.icon_url.filter(|url| !url.is_empty()),
            url_rules: doc.url_replacements,
            text_rules: doc.text_replacements,
            brand: doc.brand,
        }
    }
}

/// Decodes a request body. An empty body is an empty request.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] if the body is not a valid document.
///
/// # Example
///
/// ```
/// use relabel::transport::decode_request;
///
/// let request = decode_request(br#"{"textReplacements": [{"old": "Foo", "new": "Bar"}]}"#)?;
/// assert_eq!(request.text_rules.len(), 1);
/// assert!(request.icon_url.is_none());
/// # Ok::<(), relabel::Error>(())
/// ```
pub fn decode_request(body: &[u8]) -> Result<RebrandRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RebrandRequest::default());
    }
    let doc: RequestDocument =
        serde_json::from_slice(body).map_err(|e| Error::InvalidRequest(e.to_string()))?;
    Ok(doc.into())
}

/// A transport-neutral response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string().into_bytes())
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Returns the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn stats_json(stats: &PipelineStats, ledger: Option<&ModificationLedger>) -> serde_json::Value {
    let mut value = json!({
        "crxSize": stats.container_size,
        "zipSize": stats.archive_size,
    });
    if let (Some(final_size), Some(ledger)) = (stats.final_size, ledger) {
        value["modifiedSize"] = json!(final_size);
        value["modifications"] = json!(ledger);
    }
    value
}

/// Maps a pipeline result to a response.
pub fn respond(extension_id: &str, result: Result<PipelineOutcome>) -> Response {
    match result {
        Ok(PipelineOutcome::Modified {
            archive,
            stats,
            ledger,
        }) => Response::new(200)
            .with_header("Content-Type", "application/zip")
            .with_header(
                "Content-Disposition",
                format!("attachment; filename=\"{extension_id}_modified.zip\""),
            )
            .with_header("Cache-Control", "no-cache")
            .with_header(STATS_HEADER, stats_json(&stats, Some(&ledger)).to_string())
            .with_body(archive),
        Ok(PipelineOutcome::Unmodified { stats }) => Response::json(
            200,
            &json!({
                "warning": UNMODIFIED_WARNING,
                "stats": stats_json(&stats, None),
            }),
        ),
        Err(e) => error_response(&e),
    }
}

/// Maps an error to a response.
pub fn error_response(error: &Error) -> Response {
    Response::json(
        error.status_code(),
        &json!({
            "error": error.to_string(),
            "success": false,
        }),
    )
}
