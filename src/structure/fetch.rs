//! Remote collaborators of the structure sources and the retry discipline around them.

use crate::config::RemoteSettings;
use crate::error::StructureError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Granularity at which a sleeping retry notices cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Cooperative cancellation shared by everything working for one query.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every operation holding a clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`Self::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`StructureError::Cancelled`] once the token has been triggered.
    pub fn check(&self) -> Result<(), StructureError> {
        if self.is_cancelled() {
            Err(StructureError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(CANCEL_POLL.min(deadline - now));
        }
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy configured by the remote settings; at least one attempt.
    pub fn from_settings(settings: &RemoteSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            delay: settings.retry_delay(),
        }
    }

    /// Run `op` until it succeeds, fails permanently, or the attempts are used up.
    /// Only transient [`StructureError::RemoteAccess`] failures are retried.
    pub fn run<T, F>(&self, cancel: &CancelToken, mut op: F) -> Result<T, StructureError>
    where
        F: FnMut(u32) -> Result<T, StructureError>,
    {
        let mut attempt = 1;
        loop {
            cancel.check()?;
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < self.max_attempts => {
                    warn!(
                        "Attempt {attempt}/{} failed, retrying in {:?}: {e}",
                        self.max_attempts, self.delay
                    );
                    if !cancel.sleep(self.delay) {
                        return Err(StructureError::Cancelled);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(err: &StructureError) -> bool {
    matches!(err, StructureError::RemoteAccess { transient: true, .. })
}

/// Opens a byte stream for a URL.
pub trait RemoteFetcher: Send + Sync {
    /// Open `url` for reading. Errors carry whether a retry may help.
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, StructureError>;
}

/// The two kinds of Interactome3D files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Structure or model of a single protein, e.g. `P04637-EXP-1a1u.pdb-A`
    Protein,
    /// Structure or model of an interacting pair, e.g. `P04637-Q00987-EXP-1ycr.pdb1-A-0-B-0.pdb`
    Interaction,
}

impl ModelKind {
    /// Read the kind from the identifier: single-protein files carry the
    /// `EXP-`/`MDL-` tag right after the first accession (and its isoform
    /// number, if any).
    pub fn from_identifier(id: &str) -> Result<Self, StructureError> {
        let malformed = || StructureError::MalformedIdentifier(id.to_string());
        if !id.is_ascii() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(malformed());
        }

        let mut tokens = id.split('-');
        let accession = tokens.next().unwrap_or_default();
        if !matches!(accession.len(), 6 | 10)
            || !accession.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(malformed());
        }
        let mut next = tokens.next().ok_or_else(malformed)?;
        if !next.is_empty() && next.bytes().all(|b| b.is_ascii_digit()) {
            next = tokens.next().ok_or_else(malformed)?;
        }
        match next {
            "" => Err(malformed()),
            "EXP" | "MDL" => Ok(ModelKind::Protein),
            _ => Ok(ModelKind::Interaction),
        }
    }

    /// Value of the `type` parameter of the Interactome3D file query.
    pub fn query_type(&self) -> &'static str {
        match self {
            ModelKind::Protein => "structure",
            ModelKind::Interaction => "interaction",
        }
    }
}

/// Client returning Interactome3D coordinate files inline.
pub trait Interactome3dClient: Send + Sync {
    /// Coordinates of model `id` as PDB text.
    fn fetch_model(&self, base_url: &str, id: &str, kind: ModelKind)
        -> Result<String, StructureError>;
}

fn build_client(settings: &RemoteSettings) -> Result<Client, StructureError> {
    Client::builder()
        .user_agent(concat!("interfacemap/", env!("CARGO_PKG_VERSION")))
        .timeout(settings.timeout())
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| StructureError::RemoteAccess {
            url: String::new(),
            reason: format!("failed to build HTTP client: {e}"),
            transient: false,
        })
}

fn remote_error(url: &str, reason: impl ToString, transient: bool) -> StructureError {
    StructureError::RemoteAccess {
        url: url.to_string(),
        reason: reason.to_string(),
        transient,
    }
}

/// Send a GET and classify the failure modes: connection problems and server
/// errors are transient, anything else (notably 404) is not.
fn get(client: &Client, url: &str) -> Result<reqwest::blocking::Response, StructureError> {
    debug!("GET {url}");
    let response = client
        .get(url)
        .send()
        .map_err(|e| remote_error(url, e, true))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let transient = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
        Err(remote_error(url, format!("HTTP status {status}"), transient))
    }
}

/// [`RemoteFetcher`] over blocking HTTP.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Fetcher with the timeout of `settings`.
    pub fn new(settings: &RemoteSettings) -> Result<Self, StructureError> {
        Ok(Self {
            client: build_client(settings)?,
        })
    }
}

impl RemoteFetcher for HttpFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, StructureError> {
        Ok(Box::new(get(&self.client, url)?))
    }
}

/// [`Interactome3dClient`] for the Interactome3D web API.
pub struct Interactome3dWebClient {
    client: Client,
}

impl Interactome3dWebClient {
    /// Client with the timeout of `settings`.
    pub fn new(settings: &RemoteSettings) -> Result<Self, StructureError> {
        Ok(Self {
            client: build_client(settings)?,
        })
    }
}

impl Interactome3dClient for Interactome3dWebClient {
    fn fetch_model(
        &self,
        base_url: &str,
        id: &str,
        kind: ModelKind,
    ) -> Result<String, StructureError> {
        let url = format!(
            "{}/getPdbFile?filename={id}&type={}",
            base_url.trim_end_matches('/'),
            kind.query_type()
        );
        get(&self.client, &url)?
            .text()
            .map_err(|e| remote_error(&url, e, true))
    }
}
