//! Prometheus counters for logins and attendance changes

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    logins: IntCounterVec,
    updates: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let logins = Self::counter(&registry, "login_attempts_total", "login attempts by outcome")?;
        let updates = Self::counter(&registry, "attendance_updates_total", "attendance changes by outcome")?;

        Ok(Metrics {
            registry,
            logins,
            updates,
        })
    }

    fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounterVec> {
        tracing::trace!("creating counter {}", name);
        let counter = IntCounterVec::new(Opts::new(name, help), &["outcome"])?;
        registry.register(Box::new(counter.clone()))?;
        Ok(counter)
    }

    pub fn login(&self, outcome: Outcome) {
        self.logins.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn update(&self, outcome: Outcome) {
        self.updates.with_label_values(&[outcome.as_str()]).inc();
    }

    /// Text exposition format
    pub fn render(&self) -> String {
        let mut buffer = vec![];
        if let Err(error) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("cannot encode metrics {}", error);
        }
        String::from_utf8_lossy(&buffer).into()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Rejected,
    Failed,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        }
    }
}
