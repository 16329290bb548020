//! End-to-end run lifecycle.
//!
//! The controller wires the session's response stream through the match →
//! parse → aggregate pipeline, lets the completion gate pick exactly one
//! winner, fans the winner out to the notification stage, and finalizes
//! (screenshot, session close). Exit-code mapping stays in `main`; everything
//! here returns a typed [`RunOutcome`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use page_session::{PageSession, ResponseEvent, SessionConfig, SessionError};
use stockwatch_core::{
    aggregate, parse, AggregateSummary, AvailabilityRecord, CompletionGate, MatchRule,
    PayloadParseError, RunOutcome,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use webhook_notify::{NotificationComposer, WebhookSink};

use crate::config::RunConfig;

const SCREENSHOT_PATH: &str = "screenshot.png";
const VERDICT_BUFFER: usize = 4;

/// Lifecycle states; transitions are logged so a run can be reconstructed
/// from its output alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Starting,
    Navigating,
    Matched,
    TimedOut,
    ParseFailed,
    Finalizing,
    Done,
}

fn advance(state: &mut RunState, next: RunState) {
    debug!(target: "stockwatch", from = ?*state, to = ?next, "state transition");
    *state = next;
}

/// Where matched-response bodies come from. The indirection exists so the
/// consumer pipeline can run against canned bodies in tests.
#[async_trait]
pub(crate) trait BodySource: Send + Sync + 'static {
    async fn body(&self, request_id: &str) -> Result<String, SessionError>;
}

#[async_trait]
impl BodySource for PageSession {
    async fn body(&self, request_id: &str) -> Result<String, SessionError> {
        self.response_body(request_id).await
    }
}

/// The single report a run's candidate pipeline produces.
#[derive(Debug)]
pub(crate) enum Verdict {
    Matched {
        records: Vec<AvailabilityRecord>,
        summary: AggregateSummary,
        url: String,
    },
    ParseFailed {
        error: PayloadParseError,
        url: String,
    },
}

/// Consume the response stream: discard non-matches, race matching candidates
/// through body-fetch/parse/aggregate, and let the gate admit exactly one.
pub(crate) async fn consume_responses(
    mut events: broadcast::Receiver<ResponseEvent>,
    source: Arc<dyn BodySource>,
    rule: MatchRule,
    gate: Arc<CompletionGate>,
    verdicts: mpsc::Sender<Verdict>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(target: "stockwatch", skipped, "response stream lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if !rule.matches(&event.url) {
            continue;
        }
        if gate.is_closed() {
            break;
        }

        debug!(target: "stockwatch", url = %event.url, status = event.status, "stock response candidate");

        // Body fetch and parse are suspend points, so candidates genuinely
        // race each other to the gate; spawning keeps later responses flowing
        // while an earlier candidate is still parsing.
        let source = Arc::clone(&source);
        let gate = Arc::clone(&gate);
        let verdicts = verdicts.clone();
        tokio::spawn(async move {
            let body = match source.body(&event.request_id).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(
                        target: "stockwatch",
                        url = %event.url,
                        %err,
                        "body fetch failed; dropping candidate"
                    );
                    return;
                }
            };
            match parse(&body) {
                Ok(payload) => {
                    let aggregation = aggregate(&payload);
                    if gate.try_admit() {
                        let _ = verdicts
                            .send(Verdict::Matched {
                                records: aggregation.records,
                                summary: aggregation.summary,
                                url: event.url,
                            })
                            .await;
                    }
                }
                Err(error) => {
                    // A matched-but-unparseable response means the site
                    // contract changed; first completion wins either way.
                    if gate.try_admit() {
                        let _ = verdicts
                            .send(Verdict::ParseFailed {
                                error,
                                url: event.url,
                            })
                            .await;
                    }
                }
            }
        });
    }
}

/// Wait for the pipeline's verdict, bounded by the wait budget. On expiry the
/// gate is closed before reporting, so a late-resolving candidate is dropped
/// rather than notified.
pub(crate) async fn await_verdict(
    verdicts: &mut mpsc::Receiver<Verdict>,
    budget: Duration,
    gate: &CompletionGate,
) -> RunOutcome {
    let started = Instant::now();
    let deadline = tokio::time::sleep(budget);
    tokio::pin!(deadline);
    let mut channel_open = true;

    loop {
        tokio::select! {
            verdict = verdicts.recv(), if channel_open => match verdict {
                Some(Verdict::Matched { records, summary, url }) => {
                    info!(
                        target: "stockwatch",
                        %url,
                        total = summary.total_available,
                        records = records.len(),
                        "stock payload admitted"
                    );
                    break RunOutcome::Matched { records, summary };
                }
                Some(Verdict::ParseFailed { error, url }) => {
                    error!(target: "stockwatch", %url, %error, "matched response failed to parse");
                    break RunOutcome::ParseFailed(error);
                }
                None => {
                    warn!(target: "stockwatch", "response stream ended without a match");
                    channel_open = false;
                }
            },
            _ = &mut deadline => {
                gate.close();
                let waited = started.elapsed();
                error!(
                    target: "stockwatch",
                    waited_secs = waited.as_secs(),
                    "no stock response before the wait budget elapsed"
                );
                break RunOutcome::TimedOut { waited };
            }
        }
    }
}

/// Run the whole lifecycle for one process invocation.
pub async fn run(config: RunConfig) -> RunOutcome {
    let mut state = RunState::Starting;

    let session_config = SessionConfig {
        executable: config.chrome_path.clone(),
        headless: !config.headful,
        debug_console: config.debug,
        ..SessionConfig::default()
    };
    let session = match PageSession::launch(session_config).await {
        Ok(session) => Arc::new(session),
        Err(err) => {
            error!(target: "stockwatch", %err, "browser session failed to start");
            return RunOutcome::ConfigInvalid(err.to_string());
        }
    };

    let gate = Arc::new(CompletionGate::new());
    let (verdict_tx, mut verdict_rx) = mpsc::channel(VERDICT_BUFFER);
    let consumer = tokio::spawn(consume_responses(
        session.responses(),
        Arc::clone(&session) as Arc<dyn BodySource>,
        MatchRule::default(),
        Arc::clone(&gate),
        verdict_tx,
    ));

    advance(&mut state, RunState::Navigating);
    let navigation = {
        let session = Arc::clone(&session);
        let url = config.product_url.to_string();
        let budget = config.wait_timeout;
        tokio::spawn(async move {
            match session.navigate(&url, budget).await {
                Ok(()) => info!(target: "stockwatch", "page load complete"),
                Err(err) => warn!(
                    target: "stockwatch",
                    %err,
                    "navigation did not complete; still watching responses"
                ),
            }
        })
    };

    let outcome = await_verdict(&mut verdict_rx, config.wait_timeout, &gate).await;
    advance(
        &mut state,
        match &outcome {
            RunOutcome::Matched { .. } => RunState::Matched,
            RunOutcome::TimedOut { .. } => RunState::TimedOut,
            _ => RunState::ParseFailed,
        },
    );

    let outcome = match outcome {
        RunOutcome::Matched { records, summary } => notify(&config, records, summary).await,
        other => other,
    };

    advance(&mut state, RunState::Finalizing);
    match session.screenshot(SCREENSHOT_PATH).await {
        Ok(()) => info!(target: "stockwatch", path = SCREENSHOT_PATH, "diagnostic screenshot captured"),
        Err(err) => warn!(target: "stockwatch", %err, "screenshot capture failed"),
    }
    navigation.abort();
    consumer.abort();
    if let Err(err) = session.close().await {
        warn!(target: "stockwatch", %err, "session close failed");
    }
    advance(&mut state, RunState::Done);

    outcome
}

/// Compose the notification and deliver it when an endpoint is configured.
async fn notify(
    config: &RunConfig,
    records: Vec<AvailabilityRecord>,
    summary: AggregateSummary,
) -> RunOutcome {
    let composer = NotificationComposer::new(config.granularity, config.mention.clone());
    let message = composer.compose(&summary, &records, &config.metadata);

    let Some(endpoint) = &config.webhook_url else {
        match serde_json::to_string(&message) {
            Ok(json) => {
                info!(target: "stockwatch", message = %json, "webhook delivery disabled; composed message")
            }
            Err(err) => warn!(target: "stockwatch", %err, "composed message not serializable"),
        }
        return RunOutcome::Matched { records, summary };
    };

    let sink = match WebhookSink::new(endpoint.clone()) {
        Ok(sink) => sink,
        Err(err) => {
            error!(target: "stockwatch", %err, "webhook client construction failed");
            return RunOutcome::DeliveryFailed(err.to_string());
        }
    };
    if let Err(err) = sink.send(&message).await {
        error!(target: "stockwatch", %err, "webhook delivery failed");
        return RunOutcome::DeliveryFailed(err.to_string());
    }

    RunOutcome::Matched { records, summary }
}
