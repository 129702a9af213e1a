// Prometheus metrics for graded submissions

use grader_common::types::Verdict;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref VERDICTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "grader_verdicts_total",
        "Verdicts produced, by status",
        &["status"]
    )
    .expect("grader_verdicts_total registers once");
    pub static ref EXECUTION_TIME_MS: Histogram = register_histogram!(
        "grader_execution_time_ms",
        "Test execution time per submission in milliseconds",
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0]
    )
    .expect("grader_execution_time_ms registers once");
}

pub fn record(verdict: &Verdict) {
    VERDICTS_TOTAL
        .with_label_values(&[verdict.status().as_str()])
        .inc();
    EXECUTION_TIME_MS.observe(verdict.execution_time_ms() as f64);
}

/// Text exposition of every registered metric
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
