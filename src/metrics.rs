use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use serde::Serialize;

/// One timed phase of an execution.
#[derive(Debug, Clone, Serialize)]
pub struct PerfRecord {
    pub category: &'static str,
    pub subject: String,
    /// Offset from the start of the execution, in milliseconds.
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// The timings attached to a [`Response`](crate::Response) when the request
/// enabled metrics.
#[derive(Debug, Clone, Serialize)]
pub struct PerfRecords {
    pub duration_ms: f64,
    pub records: Vec<PerfRecord>,
}

struct MetricsInner {
    started: Instant,
    records: Mutex<Vec<PerfRecord>>,
}

/// The scoped-timing sink the executor feeds.
///
/// Disabled metrics are a `None` and every operation on them is a single
/// branch.
#[derive(Clone, Default)]
pub struct Metrics(Option<Arc<MetricsInner>>);

impl Metrics {
    pub fn enabled() -> Self {
        Self(Some(Arc::new(MetricsInner {
            started: Instant::now(),
            records: Mutex::new(Vec::new()),
        })))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    /// Start a timed subject. The span is recorded when the returned guard
    /// drops.
    pub fn subject(&self, category: &'static str, subject: impl Into<String>) -> MetricsSubject {
        MetricsSubject(self.0.as_ref().map(|inner| SubjectInner {
            metrics: Arc::clone(inner),
            category,
            subject: subject.into(),
            start: Instant::now(),
        }))
    }

    /// Total duration plus the recorded spans, if metrics were enabled.
    pub fn finish(&self) -> Option<PerfRecords> {
        self.0.as_ref().map(|inner| PerfRecords {
            duration_ms: duration_ms(inner.started.elapsed()),
            records: std::mem::take(&mut *inner.records.lock().unwrap()),
        })
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Metrics").field(&self.is_enabled()).finish()
    }
}

struct SubjectInner {
    metrics: Arc<MetricsInner>,
    category: &'static str,
    subject: String,
    start: Instant,
}

/// Guard returned by [`Metrics::subject`]; records its span on drop.
pub struct MetricsSubject(Option<SubjectInner>);

impl Drop for MetricsSubject {
    fn drop(&mut self) {
        if let Some(inner) = self.0.take() {
            let record = PerfRecord {
                category: inner.category,
                subject: inner.subject,
                start_ms: duration_ms(inner.start.duration_since(inner.metrics.started)),
                duration_ms: duration_ms(inner.start.elapsed()),
            };
            inner.metrics.records.lock().unwrap().push(record);
        }
    }
}

fn duration_ms(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_metrics_record_nothing() {
        let metrics = Metrics::disabled();
        drop(metrics.subject("execution", "Executing operation"));
        assert!(metrics.finish().is_none());
    }

    #[test]
    fn subjects_record_in_drop_order() {
        let metrics = Metrics::enabled();
        drop(metrics.subject("document", "Building document"));
        drop(metrics.subject("execution", "Executing operation"));
        let perf = metrics.finish().unwrap();
        let subjects: Vec<_> = perf.records.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, ["Building document", "Executing operation"]);
    }
}
