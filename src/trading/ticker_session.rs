use crate::core::{
    errors::ExchangeError,
    traits::{TickerFeed, TickerSubscription},
    types::{EndReason, FeedEvent, SessionReport, SessionState, TickerMetric, Valuation},
};
use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Receives the per-tick metrics and errors of a running session
pub trait TickerHandler: Send {
    fn on_update(&mut self, metric: &TickerMetric);

    fn on_error(&mut self, error: &ExchangeError);
}

/// Emits every metric as a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTickerHandler;

impl TickerHandler for LoggingTickerHandler {
    fn on_update(&mut self, metric: &TickerMetric) {
        info!(
            symbol = %metric.symbol,
            last_price = %metric.last_price,
            current_value = %metric.current_value,
            unrealized_profit = %metric.unrealized_profit,
            profit_percent = ?metric.profit_percent,
            "Ticker"
        );
    }

    fn on_error(&mut self, error: &ExchangeError) {
        warn!(error = %error, "Ticker stream error");
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub symbols: Vec<String>,
    /// Wall-clock lifetime of the whole session, not a per-message timeout
    pub lifetime: Duration,
    pub valuation: Valuation,
}

/// A bounded, cancellable ticker subscription that values each tick.
///
/// `run` consumes the session, so a session is started and torn down once.
pub struct TickerSession<F: TickerFeed> {
    feed: F,
    config: SessionConfig,
    stop: CancellationToken,
    state: SessionState,
    transitions: Vec<SessionState>,
}

impl<F: TickerFeed> TickerSession<F> {
    pub fn new(feed: F, config: SessionConfig) -> Self {
        Self {
            feed,
            config,
            stop: CancellationToken::new(),
            state: SessionState::Connecting,
            transitions: vec![SessionState::Connecting],
        }
    }

    /// Token the caller cancels to request an early drain
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Ticker session transition");
        self.state = next;
        self.transitions.push(next);
    }

    /// Subscribe, deliver ticks to `handler` until the lifetime elapses, the
    /// stop handle fires or the transport disconnects, then tear down.
    #[instrument(skip_all, fields(symbols = ?self.config.symbols, lifetime = ?self.config.lifetime))]
    pub async fn run<H: TickerHandler>(
        mut self,
        handler: &mut H,
    ) -> Result<SessionReport, ExchangeError> {
        let started_at = Utc::now();
        // Lifetimes too large to represent never expire
        let deadline = Instant::now().checked_add(self.config.lifetime);

        // Owned by this session alone; cancelled exactly once in `release`
        let subscription_token = CancellationToken::new();
        let TickerSubscription {
            mut events,
            delivery,
        } = match self
            .feed
            .subscribe_ticker(&self.config.symbols, subscription_token.clone())
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                handler.on_error(&e);
                self.transition(SessionState::Closed);
                return Err(e);
            }
        };
        self.transition(SessionState::Active);

        let symbols: HashSet<String> = self
            .config
            .symbols
            .iter()
            .map(|s| s.to_ascii_uppercase())
            .collect();
        let valuation = self.config.valuation;
        let mut updates_handled = 0u64;
        let mut errors_reported = 0u64;

        let end_reason = if self.config.lifetime.is_zero() {
            EndReason::Deadline
        } else {
            loop {
                tokio::select! {
                    biased;
                    () = expire(deadline) => break EndReason::Deadline,
                    () = self.stop.cancelled() => break EndReason::Stopped,
                    event = events.recv() => match event {
                        Some(FeedEvent::Update(update)) => {
                            if symbols.contains(&update.symbol.to_ascii_uppercase()) {
                                handler.on_update(&valuation.evaluate(&update));
                                updates_handled += 1;
                            } else {
                                debug!(symbol = %update.symbol, "Dropping update for unsubscribed symbol");
                            }
                        }
                        Some(FeedEvent::Error(e)) => {
                            errors_reported += 1;
                            handler.on_error(&e);
                        }
                        Some(FeedEvent::Disconnected(reason)) => {
                            errors_reported += 1;
                            handler.on_error(&ExchangeError::StreamDisconnected(reason));
                            break EndReason::Disconnected;
                        }
                        None => {
                            errors_reported += 1;
                            handler.on_error(&ExchangeError::StreamDisconnected(
                                "delivery ended without notice".to_string(),
                            ));
                            break EndReason::Disconnected;
                        }
                    },
                }
            }
        };

        if end_reason == EndReason::Disconnected {
            warn!("Ticker stream disconnected, closing session");
        } else {
            self.transition(SessionState::Draining);
        }

        release(subscription_token, events, delivery).await;
        self.transition(SessionState::Closed);

        let report = SessionReport {
            transitions: self.transitions,
            end_reason,
            updates_handled,
            errors_reported,
            started_at,
            closed_at: Utc::now(),
        };
        info!(
            end_reason = ?report.end_reason,
            updates = report.updates_handled,
            errors = report.errors_reported,
            "Ticker session closed"
        );
        Ok(report)
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Tear down a subscription: signal stop once, discard whatever is still
/// queued, then wait for the delivery task to finish. Takes ownership so it
/// cannot run twice for the same subscription.
async fn release(
    token: CancellationToken,
    mut events: mpsc::Receiver<FeedEvent>,
    delivery: JoinHandle<()>,
) {
    token.cancel();
    events.close();

    let mut discarded = 0usize;
    while events.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "Discarded queued ticker events");
    }

    if let Err(e) = delivery.await {
        warn!(error = %e, "Ticker delivery task ended abnormally");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TickerUpdate;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Replays a fixed script, then optionally stays open until cancelled
    struct ScriptedFeed {
        script: Mutex<Vec<FeedEvent>>,
        hold_open: bool,
        fail: bool,
        completions: Arc<AtomicUsize>,
    }

    impl ScriptedFeed {
        fn new(script: Vec<FeedEvent>, hold_open: bool) -> Self {
            Self {
                script: Mutex::new(script),
                hold_open,
                fail: false,
                completions: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new(), false)
            }
        }
    }

    #[async_trait]
    impl TickerFeed for ScriptedFeed {
        async fn subscribe_ticker(
            &self,
            _symbols: &[String],
            stop: CancellationToken,
        ) -> Result<TickerSubscription, ExchangeError> {
            if self.fail {
                return Err(ExchangeError::transport(
                    "websocket connect",
                    "connection refused",
                ));
            }

            let script = std::mem::take(&mut *self.script.lock().unwrap());
            let hold_open = self.hold_open;
            let completions = self.completions.clone();
            let (tx, events) = mpsc::channel(16);

            let delivery = tokio::spawn(async move {
                for event in script {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                if hold_open {
                    stop.cancelled().await;
                }
                completions.fetch_add(1, Ordering::SeqCst);
            });

            Ok(TickerSubscription { events, delivery })
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        metrics: Vec<TickerMetric>,
        errors: Vec<String>,
        stop_after_first: Option<CancellationToken>,
    }

    impl TickerHandler for RecordingHandler {
        fn on_update(&mut self, metric: &TickerMetric) {
            self.metrics.push(metric.clone());
            if let Some(stop) = &self.stop_after_first {
                stop.cancel();
            }
        }

        fn on_error(&mut self, error: &ExchangeError) {
            self.errors.push(error.to_string());
        }
    }

    fn update(symbol: &str, last_price: Decimal) -> FeedEvent {
        FeedEvent::Update(TickerUpdate {
            symbol: symbol.to_string(),
            last_price,
            received_at: Utc::now(),
        })
    }

    fn config(lifetime: Duration) -> SessionConfig {
        SessionConfig {
            symbols: vec!["BTCFDUSD".to_string()],
            lifetime,
            valuation: Valuation::new(dec!(100), dec!(0.002)),
        }
    }

    #[tokio::test]
    async fn test_zero_lifetime_never_calls_handler() {
        let feed = ScriptedFeed::new(vec![update("BTCFDUSD", dec!(50000))], true);
        let completions = feed.completions.clone();
        let session = TickerSession::new(feed, config(Duration::ZERO));

        let mut handler = RecordingHandler::default();
        let report = session.run(&mut handler).await.unwrap();

        assert_eq!(
            report.transitions,
            vec![
                SessionState::Connecting,
                SessionState::Active,
                SessionState::Draining,
                SessionState::Closed,
            ]
        );
        assert_eq!(report.end_reason, EndReason::Deadline);
        assert_eq!(report.updates_handled, 0);
        assert!(handler.metrics.is_empty());
        assert!(handler.errors.is_empty());
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lifetime_elapses_and_drains() {
        let feed = ScriptedFeed::new(Vec::new(), true);
        let completions = feed.completions.clone();
        let session = TickerSession::new(feed, config(Duration::from_millis(30)));

        let report = session.run(&mut RecordingHandler::default()).await.unwrap();

        assert_eq!(report.end_reason, EndReason::Deadline);
        assert_eq!(report.transitions.last(), Some(&SessionState::Closed));
        assert!(report.closed_at >= report.started_at);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_handle_drains_session() {
        let feed = ScriptedFeed::new(
            vec![update("BTCFDUSD", dec!(51000)), update("BTCFDUSD", dec!(52000))],
            true,
        );
        let completions = feed.completions.clone();
        let session = TickerSession::new(feed, config(Duration::from_secs(60)));

        let mut handler = RecordingHandler {
            stop_after_first: Some(session.stop_handle()),
            ..RecordingHandler::default()
        };
        let report = session.run(&mut handler).await.unwrap();

        assert_eq!(report.end_reason, EndReason::Stopped);
        assert_eq!(report.updates_handled, 1);
        assert_eq!(
            report.transitions,
            vec![
                SessionState::Connecting,
                SessionState::Active,
                SessionState::Draining,
                SessionState::Closed,
            ]
        );
        assert_eq!(handler.metrics[0].current_value, dec!(102));
        assert_eq!(handler.metrics[0].unrealized_profit, dec!(2));
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_do_not_end_session_but_disconnect_does() {
        let feed = ScriptedFeed::new(
            vec![
                FeedEvent::Error(ExchangeError::transport("decode ticker", "bad frame")),
                update("BTCFDUSD", dec!(49000)),
                FeedEvent::Disconnected("connection reset".to_string()),
                update("BTCFDUSD", dec!(50000)),
            ],
            false,
        );
        let session = TickerSession::new(feed, config(Duration::from_secs(60)));

        let mut handler = RecordingHandler::default();
        let report = session.run(&mut handler).await.unwrap();

        assert_eq!(report.end_reason, EndReason::Disconnected);
        assert_eq!(
            report.transitions,
            vec![
                SessionState::Connecting,
                SessionState::Active,
                SessionState::Closed,
            ]
        );
        assert_eq!(report.updates_handled, 1);
        assert_eq!(report.errors_reported, 2);
        assert_eq!(handler.metrics[0].unrealized_profit, dec!(-2));
        assert!(handler.errors[1].contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unsubscribed_symbols_are_ignored() {
        let feed = ScriptedFeed::new(
            vec![
                update("ETHUSDT", dec!(3000)),
                update("BTCFDUSD", dec!(50000)),
                FeedEvent::Disconnected("done".to_string()),
            ],
            false,
        );
        let session = TickerSession::new(feed, config(Duration::from_secs(60)));

        let mut handler = RecordingHandler::default();
        let report = session.run(&mut handler).await.unwrap();

        assert_eq!(report.updates_handled, 1);
        assert_eq!(handler.metrics.len(), 1);
        assert_eq!(handler.metrics[0].symbol, "BTCFDUSD");
    }

    #[tokio::test]
    async fn test_symbol_filter_ignores_case() {
        let feed = ScriptedFeed::new(
            vec![
                update("BTCFDUSD", dec!(50000)),
                FeedEvent::Disconnected("done".to_string()),
            ],
            false,
        );
        let session = TickerSession::new(
            feed,
            SessionConfig {
                symbols: vec!["btcfdusd".to_string()],
                ..config(Duration::from_secs(60))
            },
        );

        let mut handler = RecordingHandler::default();
        let report = session.run(&mut handler).await.unwrap();

        assert_eq!(report.updates_handled, 1);
        assert_eq!(handler.metrics[0].symbol, "BTCFDUSD");
    }

    #[tokio::test]
    async fn test_unbounded_lifetime_still_stops() {
        let feed = ScriptedFeed::new(Vec::new(), true);
        let completions = feed.completions.clone();
        let session = TickerSession::new(feed, config(Duration::MAX));
        session.stop_handle().cancel();

        let report = session.run(&mut RecordingHandler::default()).await.unwrap();

        assert_eq!(report.end_reason, EndReason::Stopped);
        assert_eq!(report.transitions.last(), Some(&SessionState::Closed));
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_reported_and_returned() {
        let session = TickerSession::new(ScriptedFeed::failing(), config(Duration::from_secs(1)));

        let mut handler = RecordingHandler::default();
        let err = session.run(&mut handler).await.unwrap_err();

        assert!(matches!(err, ExchangeError::TransportFailure { .. }));
        assert_eq!(handler.errors.len(), 1);
        assert!(handler.metrics.is_empty());
    }
}
