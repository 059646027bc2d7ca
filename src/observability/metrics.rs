use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub booking_transitions_total: IntCounterVec,
    pub accept_conflicts_total: IntCounter,
    pub otp_verifications_total: IntCounterVec,
    pub realtime_events_total: IntCounterVec,
    pub realtime_subscribers: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let booking_transitions_total = IntCounterVec::new(
            Opts::new("booking_transitions_total", "Committed booking transitions"),
            &["transition"],
        )
        .expect("valid booking_transitions_total metric");

        let accept_conflicts_total = IntCounter::new(
            "accept_conflicts_total",
            "Accept attempts that lost the race or hit a non-pending booking",
        )
        .expect("valid accept_conflicts_total metric");

        let otp_verifications_total = IntCounterVec::new(
            Opts::new("otp_verifications_total", "Login code verifications by outcome"),
            &["outcome"],
        )
        .expect("valid otp_verifications_total metric");

        let realtime_events_total = IntCounterVec::new(
            Opts::new("realtime_events_total", "Events handed to the broadcaster"),
            &["event"],
        )
        .expect("valid realtime_events_total metric");

        let realtime_subscribers =
            IntGauge::new("realtime_subscribers", "Currently connected websocket subscribers")
                .expect("valid realtime_subscribers metric");

        registry
            .register(Box::new(booking_transitions_total.clone()))
            .expect("register booking_transitions_total");
        registry
            .register(Box::new(accept_conflicts_total.clone()))
            .expect("register accept_conflicts_total");
        registry
            .register(Box::new(otp_verifications_total.clone()))
            .expect("register otp_verifications_total");
        registry
            .register(Box::new(realtime_events_total.clone()))
            .expect("register realtime_events_total");
        registry
            .register(Box::new(realtime_subscribers.clone()))
            .expect("register realtime_subscribers");

        Self {
            registry,
            booking_transitions_total,
            accept_conflicts_total,
            otp_verifications_total,
            realtime_events_total,
            realtime_subscribers,
        }
    }

    pub fn record_transition(&self, transition: &str) {
        self.booking_transitions_total
            .with_label_values(&[transition])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
