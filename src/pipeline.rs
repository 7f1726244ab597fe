//! Ordered gate evaluation around a downstream handler.

use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use crate::config::PipelineVariant;
use crate::event::{Event, EventKind};
use crate::gate::{AuthGate, Decision, Denial, Gate, IdentityStore, RateLimiter, ThrottleGate};
use crate::sink::NotificationSink;

/// Fixed reply for events whose originator is not authorized.
pub const FORBIDDEN_MESSAGE: &str =
    "Access denied. This service is restricted to authorized operators.";

/// Runs inbound events through an ordered list of gates before handing them
/// to a downstream handler.
///
/// The evaluation order is the declared order of the gate list. The first
/// denial short-circuits the chain: later gates are not evaluated, the sink
/// is notified, and the downstream handler is never invoked.
pub struct GatingPipeline {
    /// Gates in evaluation order
    gates: Vec<Arc<dyn Gate>>,
    /// Where denial notices are delivered
    sink: Arc<dyn NotificationSink>,
}

impl GatingPipeline {
    /// Build a pipeline from an explicit, ordered gate list.
    pub fn new(gates: Vec<Arc<dyn Gate>>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { gates, sink }
    }

    /// Authorization gate only.
    pub fn auth_only(identity: Arc<IdentityStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::new(vec![Arc::new(AuthGate::new(identity))], sink)
    }

    /// Throttle gate only.
    pub fn throttle_only(limiter: Arc<RateLimiter>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::new(vec![Arc::new(ThrottleGate::new(limiter))], sink)
    }

    /// Production default: throttle every event, authorized or not, then
    /// check the allow-list.
    pub fn throttle_then_auth(
        limiter: Arc<RateLimiter>,
        identity: Arc<IdentityStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::new(
            vec![
                Arc::new(ThrottleGate::new(limiter)),
                Arc::new(AuthGate::new(identity)),
            ],
            sink,
        )
    }

    /// Build the named chain selected by configuration.
    pub fn for_variant(
        variant: PipelineVariant,
        limiter: Arc<RateLimiter>,
        identity: Arc<IdentityStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        match variant {
            PipelineVariant::AuthOnly => Self::auth_only(identity, sink),
            PipelineVariant::ThrottleOnly => Self::throttle_only(limiter, sink),
            PipelineVariant::ThrottleThenAuth => Self::throttle_then_auth(limiter, identity, sink),
        }
    }

    /// Run `event` through the gates and, on full admission, invoke
    /// `downstream` exactly once with the unmodified event.
    ///
    /// Returns `None` when a gate denied the event, `Some` with the
    /// downstream result otherwise.
    pub async fn dispatch<F, Fut, T>(&self, event: Event, downstream: F) -> Option<T>
    where
        F: FnOnce(Event) -> Fut,
        Fut: Future<Output = T>,
    {
        for gate in &self.gates {
            if let Decision::Deny(denial) = gate.evaluate(&event) {
                self.report(&event, denial).await;
                return None;
            }
        }

        trace!(channel = %event.channel, "Event admitted");
        Some(downstream(event).await)
    }

    /// Deliver the denial notice for `event`.
    async fn report(&self, event: &Event, denial: Denial) {
        match denial {
            Denial::Throttled { remaining } => {
                let message = format!(
                    "Please wait {:.1} s before your next action.",
                    remaining.as_secs_f64()
                );
                self.sink.notify(event.channel, &message, false).await;
            }
            Denial::Forbidden => {
                // Interactions surface the refusal as an alert, matching
                // how button activations are answered
                let urgent = event.kind == EventKind::Interaction;
                self.sink.notify(event.channel, FORBIDDEN_MESSAGE, urgent).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::event::{ChannelRef, Principal};
    use crate::gate::{Clock, ManualClock};

    /// Sink that records every notification it receives.
    #[derive(Default)]
    struct RecordingSink {
        notices: Mutex<Vec<(ChannelRef, String, bool)>>,
    }

    impl RecordingSink {
        fn notices(&self) -> Vec<(ChannelRef, String, bool)> {
            self.notices.lock().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, channel: ChannelRef, message: &str, urgent: bool) {
            self.notices.lock().push((channel, message.to_string(), urgent));
        }
    }

    /// Gate wrapper that counts how often it is evaluated.
    struct ProbeGate {
        inner: Arc<dyn Gate>,
        evaluations: Arc<AtomicUsize>,
    }

    impl Gate for ProbeGate {
        fn evaluate(&self, event: &Event) -> Decision {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            self.inner.evaluate(event)
        }
    }

    fn message_from(principal: u64) -> Event {
        Event {
            channel: ChannelRef(principal),
            kind: EventKind::Message,
            principal: Some(Principal(principal)),
            payload: serde_json::Value::Null,
        }
    }

    fn counting_downstream(
        counter: Arc<AtomicUsize>,
    ) -> impl FnOnce(Event) -> std::future::Ready<Event> {
        move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(event)
        }
    }

    #[tokio::test]
    async fn test_admitted_event_reaches_downstream_unmodified() {
        let identity = Arc::new(IdentityStore::new([Principal(7)]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = GatingPipeline::auth_only(identity, Arc::clone(&sink) as Arc<dyn NotificationSink>);

        let event = message_from(7);
        let result = pipeline
            .dispatch(event.clone(), |e| std::future::ready(e))
            .await
            .expect("event should be admitted");

        assert_eq!(result.principal(), event.principal());
        assert_eq!(result.channel, event.channel);
        assert!(sink.notices().is_empty());
    }

    #[tokio::test]
    async fn test_throttle_denial_skips_auth_gate_and_downstream() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(RateLimiter::with_clock(
            Duration::from_secs(1),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let identity = Arc::new(IdentityStore::new([Principal(7)]));
        let sink = Arc::new(RecordingSink::default());

        let auth_evaluations = Arc::new(AtomicUsize::new(0));
        let pipeline = GatingPipeline::new(
            vec![
                Arc::new(ThrottleGate::new(limiter)),
                Arc::new(ProbeGate {
                    inner: Arc::new(AuthGate::new(identity)),
                    evaluations: Arc::clone(&auth_evaluations),
                }),
            ],
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
        );

        let handled = Arc::new(AtomicUsize::new(0));

        // First event admits and reaches downstream
        let _ = pipeline
            .dispatch(message_from(7), counting_downstream(Arc::clone(&handled)))
            .await;
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert_eq!(auth_evaluations.load(Ordering::SeqCst), 1);

        // Second event inside the window: downstream untouched, auth gate
        // never consulted
        let result = pipeline
            .dispatch(message_from(7), counting_downstream(Arc::clone(&handled)))
            .await;
        assert!(result.is_none());
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert_eq!(auth_evaluations.load(Ordering::SeqCst), 1);

        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].1.contains("wait"));
        assert!(!notices[0].2);
    }

    #[tokio::test]
    async fn test_forbidden_interaction_notified_urgently() {
        let identity = Arc::new(IdentityStore::new([Principal(7)]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = GatingPipeline::auth_only(identity, Arc::clone(&sink) as Arc<dyn NotificationSink>);

        let event = Event {
            channel: ChannelRef(42),
            kind: EventKind::Interaction,
            principal: Some(Principal(42)),
            payload: serde_json::Value::Null,
        };

        let result = pipeline.dispatch(event, |e| std::future::ready(e)).await;
        assert!(result.is_none());

        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].1, FORBIDDEN_MESSAGE);
        assert!(notices[0].2);
    }

    #[tokio::test]
    async fn test_event_without_principal_denied_by_auth_not_throttle() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
        let identity = Arc::new(IdentityStore::new([Principal(7)]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = GatingPipeline::throttle_then_auth(
            Arc::clone(&limiter),
            identity,
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
        );

        let event = Event {
            channel: ChannelRef(1),
            kind: EventKind::Message,
            principal: None,
            payload: serde_json::Value::Null,
        };

        let result = pipeline.dispatch(event, |e| std::future::ready(e)).await;
        assert!(result.is_none());

        // The throttle gate tracked nothing; the identity gate rejected
        assert_eq!(limiter.tracked_principals(), 0);
        assert_eq!(sink.notices()[0].1, FORBIDDEN_MESSAGE);
    }

    #[tokio::test]
    async fn test_end_to_end_gating_scenario() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(RateLimiter::with_clock(
            Duration::from_secs(1),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let identity = Arc::new(IdentityStore::new([Principal(7)]));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = GatingPipeline::throttle_then_auth(
            limiter,
            identity,
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
        );

        let handled = Arc::new(AtomicUsize::new(0));

        // Principal 42 is not in the authorized set: forbidden, no handler
        let _ = pipeline
            .dispatch(message_from(42), counting_downstream(Arc::clone(&handled)))
            .await;
        assert_eq!(handled.load(Ordering::SeqCst), 0);
        assert_eq!(sink.notices().last().unwrap().1, FORBIDDEN_MESSAGE);

        // Principal 7 at t=0: admitted, handled once
        let _ = pipeline
            .dispatch(message_from(7), counting_downstream(Arc::clone(&handled)))
            .await;
        assert_eq!(handled.load(Ordering::SeqCst), 1);

        // Principal 7 again at t=0.2: throttled with about 0.8 s remaining
        clock.advance(Duration::from_millis(200));
        let _ = pipeline
            .dispatch(message_from(7), counting_downstream(Arc::clone(&handled)))
            .await;
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert!(sink.notices().last().unwrap().1.contains("0.8"));

        // Principal 7 at t=1.0: the window has elapsed, admitted again
        clock.advance(Duration::from_millis(800));
        let _ = pipeline
            .dispatch(message_from(7), counting_downstream(Arc::clone(&handled)))
            .await;
        assert_eq!(handled.load(Ordering::SeqCst), 2);
    }
}
