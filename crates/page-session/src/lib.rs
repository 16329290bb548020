//! Headless Chromium page session.
//!
//! Wraps chromiumoxide behind the small surface the monitor needs: launch a
//! fingerprinted browser, navigate one page, expose the page's network
//! responses as a broadcast stream, fetch bodies on demand, and capture a
//! diagnostic screenshot at the end. Response bodies are only read when a
//! caller asks for one, so irrelevant page traffic costs nothing beyond the
//! event fan-out.

pub mod detect;
pub mod stealth;

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::detect::detect_chrome_executable;
use crate::stealth::FingerprintProfile;

const RESPONSE_BUS_CAPACITY: usize = 512;
const LAUNCH_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-blink-features=AutomationControlled",
];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no Chromium executable found; install Chrome or set STOCKWATCH_CHROME")]
    ChromeNotFound,
    #[error("invalid browser configuration: {0}")]
    Config(String),
    #[error("cdp i/o failure: {0}")]
    CdpIo(#[from] CdpError),
    #[error("navigation timed out after {0:?}")]
    NavTimeout(Duration),
    #[error("response body unavailable for request {0}: {1}")]
    BodyUnavailable(String, String),
}

/// One `Network.responseReceived` notification, reduced to what the matcher
/// needs. The body is fetched separately via [`PageSession::response_body`].
#[derive(Clone, Debug)]
pub struct ResponseEvent {
    pub request_id: String,
    pub url: String,
    pub status: i64,
    pub mime_type: String,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Explicit Chromium binary; auto-detected when absent.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub viewport: (u32, u32),
    /// Echo in-page console output at debug level.
    pub debug_console: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            viewport: (1920, 1080),
            debug_console: false,
        }
    }
}

pub struct PageSession {
    browser: Mutex<Browser>,
    page: Page,
    events: broadcast::Sender<ResponseEvent>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    profile: FingerprintProfile,
}

impl PageSession {
    /// Launch a browser, open a blank page, apply the fingerprint profile and
    /// start forwarding response events.
    pub async fn launch(config: SessionConfig) -> Result<Self, SessionError> {
        let executable = match config.executable.clone() {
            Some(path) => path,
            None => detect_chrome_executable().ok_or(SessionError::ChromeNotFound)?,
        };

        let (width, height) = config.viewport;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .args(LAUNCH_ARGS.iter().copied())
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            });
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(SessionError::Config)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        let handler_token = cancel.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = handler_token.cancelled() => break,
                    event = handler.next() => match event {
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(target: "page-session", %err, "cdp handler error");
                            break;
                        }
                        None => break,
                    },
                }
            }
        }));

        let profile = FingerprintProfile::pick();
        info!(target: "page-session", profile = profile.name, "applying fingerprint profile");

        let page = browser.new_page("about:blank").await?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(profile.user_agent)
            .platform(profile.platform)
            .accept_language(profile.accept_language)
            .build()
            .map_err(SessionError::Config)?;
        page.set_user_agent(user_agent).await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            profile.init_script(),
        ))
        .await?;
        page.execute(EnableParams::default()).await?;

        let (events, _) = broadcast::channel(RESPONSE_BUS_CAPACITY);
        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let forward_tx = events.clone();
        let forward_token = cancel.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = forward_token.cancelled() => break,
                    event = responses.next() => match event {
                        Some(event) => {
                            let _ = forward_tx.send(ResponseEvent {
                                request_id: event.request_id.inner().clone(),
                                url: event.response.url.clone(),
                                status: event.response.status,
                                mime_type: event.response.mime_type.clone(),
                            });
                        }
                        None => break,
                    },
                }
            }
        }));

        if config.debug_console {
            let mut console = page.event_listener::<EventConsoleApiCalled>().await?;
            let console_token = cancel.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = console_token.cancelled() => break,
                        event = console.next() => match event {
                            Some(event) => {
                                let line = event
                                    .args
                                    .iter()
                                    .map(|arg| {
                                        arg.value
                                            .as_ref()
                                            .map(|v| v.to_string())
                                            .or_else(|| arg.description.clone())
                                            .unwrap_or_default()
                                    })
                                    .collect::<Vec<_>>()
                                    .join(" ");
                                debug!(target: "page-session", console = %line, "in-page console");
                            }
                            None => break,
                        },
                    }
                }
            }));
        }

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            events,
            cancel,
            tasks,
            profile,
        })
    }

    pub fn profile(&self) -> &FingerprintProfile {
        &self.profile
    }

    /// Subscribe to the response-event stream. Every subscriber sees every
    /// event from its subscription point onward.
    pub fn responses(&self) -> broadcast::Receiver<ResponseEvent> {
        self.events.subscribe()
    }

    /// Start navigation and wait for the page load, bounded by `timeout`.
    /// Response events keep flowing while this is pending.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        info!(target: "page-session", %url, "navigating");
        let load = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<(), CdpError>(())
        };
        match tokio::time::timeout(timeout, load).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SessionError::NavTimeout(timeout)),
        }
    }

    /// Fetch and decode the body of a previously observed response.
    pub async fn response_body(&self, request_id: &str) -> Result<String, SessionError> {
        let response = self
            .page
            .execute(GetResponseBodyParams::new(RequestId::new(request_id)))
            .await?;

        if response.base64_encoded {
            let bytes = STANDARD.decode(response.body.as_bytes()).map_err(|err| {
                SessionError::BodyUnavailable(request_id.to_string(), err.to_string())
            })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            Ok(response.body.clone())
        }
    }

    /// Best-effort diagnostic screenshot.
    pub async fn screenshot(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        self.page
            .save_screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
                path,
            )
            .await?;
        Ok(())
    }

    /// Shut the browser down and stop the background tasks. Safe to call with
    /// outstanding clones of the session still alive; they will only observe
    /// closed channels afterwards.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.cancel.cancel();
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            warn!(target: "page-session", %err, "browser close failed");
        }
        let _ = browser.wait().await;
        for task in &self.tasks {
            task.abort();
        }
        Ok(())
    }
}
