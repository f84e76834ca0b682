/// Metrics and telemetry for the Palisade auth service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Authentication outcomes (logins, lockouts, refreshes)
/// - Access-control rejections
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== Authentication Metrics ==========

    /// Accounts registered
    pub static ref REGISTRATIONS_TOTAL: IntCounter = register_int_counter!(
        "auth_registrations_total",
        "Total number of accounts registered"
    )
    .unwrap();

    /// Successful logins
    pub static ref LOGIN_SUCCESSES_TOTAL: IntCounter = register_int_counter!(
        "auth_login_successes_total",
        "Total number of successful logins"
    )
    .unwrap();

    /// Failed logins (bad credentials, locked, or unknown account)
    pub static ref LOGIN_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "auth_login_failures_total",
        "Total number of failed login attempts"
    )
    .unwrap();

    /// Accounts locked by the failed-attempt threshold
    pub static ref ACCOUNT_LOCKOUTS_TOTAL: IntCounter = register_int_counter!(
        "auth_account_lockouts_total",
        "Total number of account lockouts triggered"
    )
    .unwrap();

    /// Refresh-token rotations
    pub static ref TOKEN_REFRESHES_TOTAL: IntCounter = register_int_counter!(
        "auth_token_refreshes_total",
        "Total number of refresh-token rotations"
    )
    .unwrap();

    /// Password reset requests accepted
    pub static ref RESET_REQUESTS_TOTAL: IntCounter = register_int_counter!(
        "auth_reset_requests_total",
        "Total number of password reset requests"
    )
    .unwrap();

    /// Password resets completed with a valid code
    pub static ref RESETS_COMPLETED_TOTAL: IntCounter = register_int_counter!(
        "auth_resets_completed_total",
        "Total number of completed password resets"
    )
    .unwrap();

    // ========== Access Control Metrics ==========

    /// Requests rejected by the fixed-window limiter, by scope
    pub static ref RATE_LIMIT_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "auth_rate_limit_rejections_total",
        "Total number of requests rejected by rate limiting",
        &["scope"]
    )
    .unwrap();

    /// Non-admins submitting privileged fields
    pub static ref ESCALATION_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        "auth_escalation_attempts_total",
        "Total number of privilege escalation attempts"
    )
    .unwrap();

    /// Attempts to read or modify another account without admin role
    pub static ref IDOR_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        "auth_idor_attempts_total",
        "Total number of cross-account access attempts"
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap();

    // ========== Account Metrics ==========

    /// Total accounts (refreshed by the stats job)
    pub static ref ACCOUNTS_TOTAL: IntGauge = register_int_gauge!(
        "accounts_total",
        "Total number of accounts"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record a rate-limit rejection
pub fn record_rate_limit_rejection(scope: &str) {
    RATE_LIMIT_REJECTIONS_TOTAL
        .with_label_values(&[scope])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_background_job() {
        record_background_job("refresh_token_cleanup", "success", 0.2);
        let metrics = render_metrics();
        assert!(metrics.contains("background_jobs_total"));
        assert!(metrics.contains("background_job_duration_seconds"));
    }

    #[test]
    fn test_auth_counters_render() {
        LOGIN_FAILURES_TOTAL.inc();
        ACCOUNT_LOCKOUTS_TOTAL.inc();
        record_rate_limit_rejection("login");

        let metrics = render_metrics();
        assert!(metrics.contains("auth_login_failures_total"));
        assert!(metrics.contains("auth_account_lockouts_total"));
        assert!(metrics.contains("auth_rate_limit_rejections_total"));
    }
}
