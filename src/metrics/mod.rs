use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Registration outcomes (success / each error kind)
// - End-to-end registration latency
// - Password hashing cost
//
// All metrics are registered with one Registry and exposed via GET /metrics
// ============================================================================

/// Central metrics registry for the service
pub struct Metrics {
    registry: Registry,

    pub registrations_total: IntCounterVec,
    pub registration_duration: HistogramVec,
    pub password_hash_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let registrations_total = IntCounterVec::new(
            Opts::new("registrations_total", "Registration attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(registrations_total.clone()))?;

        let registration_duration = HistogramVec::new(
            HistogramOpts::new("registration_duration_seconds", "End-to-end registration duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(registration_duration.clone()))?;

        let password_hash_duration = Histogram::with_opts(
            HistogramOpts::new(
                "password_hash_duration_seconds",
                "Time spent deriving password hashes",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(password_hash_duration.clone()))?;

        Ok(Self {
            registry,
            registrations_total,
            registration_duration,
            password_hash_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// `outcome` is "success" or an `ErrorKind` name.
    pub fn record_registration(&self, outcome: &str, duration_secs: f64) {
        self.registrations_total.with_label_values(&[outcome]).inc();
        self.registration_duration.with_label_values(&[outcome]).observe(duration_secs);
    }

    pub fn record_password_hash(&self, duration_secs: f64) {
        self.password_hash_duration.observe(duration_secs);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
