//! Remote retrieval of containers, icons and store pages.
//!
//! The pipeline talks to the network only through the [`Fetcher`] trait.
//! [`HttpFetcher`] (feature `http`) is the blocking `reqwest` implementation;
//! tests and the CLI's local mode plug in their own.

use crate::Result;

/// Default update service endpoint.
pub const DEFAULT_UPDATE_ENDPOINT: &str = "https://clients2.google.com/service/update2/crx";

/// Browser version reported to the update service.
pub const DEFAULT_PRODVERSION: &str = "135.0.0.0";

/// Extra headers sent with a container download.
pub const CONTAINER_HEADERS: &[(&str, &str)] = &[
    ("accept", "*/*"),
    ("accept-language", "pt-PT,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "none"),
];

/// Source of remote bytes.
///
/// Implementations report transport failures and non-success statuses as
/// [`Error::Fetch`](crate::Error::Fetch). Nothing is retried.
pub trait Fetcher {
    /// Downloads the raw container for an extension id.
    fn fetch_container(&self, extension_id: &str) -> Result<Vec<u8>>;

    /// Downloads an image.
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;

    /// Downloads a text document.
    fn fetch_text(&self, url: &str) -> Result<String>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch_container(&self, extension_id: &str) -> Result<Vec<u8>> {
        (**self).fetch_container(extension_id)
    }

    fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch_image(url)
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        (**self).fetch_text(url)
    }
}

/// Builds the container download URL for an extension id.
///
/// # Example
///
/// ```
/// use relabel::fetch::container_url;
///
/// let url = container_url("https://updates.test/crx", "135.0.0.0", "abc");
/// assert!(url.starts_with("https://updates.test/crx?response=redirect&prodversion=135.0.0.0"));
/// assert!(url.contains("x=id%3Dabc%26installsource%3Dondemand%26uc"));
/// ```
pub fn container_url(endpoint: &str, prodversion: &str, extension_id: &str) -> String {
    format!(
        "{endpoint}?response=redirect&prodversion={prodversion}\
         &x=id%3D{extension_id}%26installsource%3Dondemand%26uc\
         &nacl_arch=x86-64&acceptformat=crx2,crx3"
    )
}

#[cfg(feature = "http")]
pub use http::{HttpFetcher, HttpFetcherOptions, USER_AGENT};

#[cfg(feature = "http")]
mod http {
    use std::io::Read;
    use std::time::Duration;

    use reqwest::blocking::{Client, RequestBuilder, Response};

    use super::{CONTAINER_HEADERS, DEFAULT_PRODVERSION, DEFAULT_UPDATE_ENDPOINT, Fetcher, container_url};
    use crate::{Error, Result};

    /// Default HTTP user agent string.
    pub const USER_AGENT: &str = concat!("relabel/", env!("CARGO_PKG_VERSION"));

    /// Default request timeout.
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Options for [`HttpFetcher`].
    #[derive(Debug, Clone)]
    pub struct HttpFetcherOptions {
        /// Update service endpoint.
        pub endpoint: String,
        /// Browser version reported to the update service.
        pub prodversion: String,
        /// Per-request timeout.
        pub timeout: Duration,
        /// User agent header.
        pub user_agent: String,
    }

    impl Default for HttpFetcherOptions {
        fn default() -> Self {
            Self {
                endpoint: DEFAULT_UPDATE_ENDPOINT.to_string(),
                prodversion: DEFAULT_PRODVERSION.to_string(),
                timeout: DEFAULT_TIMEOUT,
                user_agent: USER_AGENT.to_string(),
            }
        }
    }

    impl HttpFetcherOptions {
        /// Creates default options.
        pub fn new() -> Self {
            Self::default()
        }

        /// Sets the update service endpoint.
        pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
            self.endpoint = endpoint.into();
            self
        }

        /// Sets the reported browser version.
        pub fn prodversion(mut self, prodversion: impl Into<String>) -> Self {
            self.prodversion = prodversion.into();
            self
        }

        /// Sets the per-request timeout.
        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        /// Sets the user agent.
        pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
            self.user_agent = user_agent.into();
            self
        }
    }

    /// Blocking HTTP fetcher.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: Client,
        options: HttpFetcherOptions,
    }

    impl HttpFetcher {
        /// Creates a fetcher with default options.
        pub fn new() -> Result<Self> {
            Self::with_options(HttpFetcherOptions::default())
        }

        /// Creates a fetcher with the given options.
        pub fn with_options(options: HttpFetcherOptions) -> Result<Self> {
            let client = Client::builder()
                .timeout(options.timeout)
                .user_agent(options.user_agent.clone())
                .build()
                .map_err(|e| Error::fetch(&options.endpoint, format!("failed to create HTTP client: {e}")))?;
            Ok(Self { client, options })
        }

        /// Returns the fetcher options.
        pub fn options(&self) -> &HttpFetcherOptions {
            &self.options
        }

        fn send(&self, url: &str, request: RequestBuilder) -> Result<Response> {
            let response = request.send().map_err(|e| Error::fetch(url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::fetch(url, format!("HTTP {status}")));
            }
            Ok(response)
        }

        fn read_body(url: &str, mut response: Response) -> Result<Vec<u8>> {
            let mut body = Vec::new();
            response
                .read_to_end(&mut body)
                .map_err(|e| Error::fetch(url, format!("failed to read response: {e}")))?;
            Ok(body)
        }
    }

    impl Fetcher for HttpFetcher {
        fn fetch_container(&self, extension_id: &str) -> Result<Vec<u8>> {
            let url = container_url(&self.options.endpoint, &self.options.prodversion, extension_id);
            log::info!("Downloading container for {}", extension_id);

            let request = CONTAINER_HEADERS
                .iter()
                .fold(self.client.get(&url), |request, (name, value)| request.header(*name, *value));
            let response = self.send(&url, request)?;
            let body = Self::read_body(&url, response)?;
            log::debug!("Downloaded {} bytes from {}", body.len(), url);
            Ok(body)
        }

        fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
            log::info!("Downloading image {}", url);
            let response = self.send(url, self.client.get(url))?;
            Self::read_body(url, response)
        }

        fn fetch_text(&self, url: &str) -> Result<String> {
            log::info!("Downloading {}", url);
            let response = self.send(url, self.client.get(url))?;
            response
                .text()
                .map_err(|e| Error::fetch(url, format!("failed to read response: {e}")))
        }
    }

}
