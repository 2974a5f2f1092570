//! Shipway Health - deployment health probing
//!
//! After the scheduler reports a service stable, the deployed web container
//! is probed over HTTP before any route is published. A deployment is
//! healthy on the first `200 OK`; any other status, like any transport
//! error, consumes one attempt.
//!
//! Probing never returns an error; an unreachable service is an expected
//! intermediate state, reported as `false` once the attempt budget runs out.

#![deny(unsafe_code)]

use std::time::Duration;

use tracing::{debug, info};

/// Default seconds between probe attempts.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Default number of probe attempts before giving up.
pub const DEFAULT_MAX_TRIES: u32 = 10;

/// A fixed-interval HTTP health probe.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    path: String,
    interval: Duration,
    max_tries: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new("/", Duration::from_secs(DEFAULT_INTERVAL_SECS), DEFAULT_MAX_TRIES)
    }
}

impl HealthCheck {
    pub fn new(path: impl Into<String>, interval: Duration, max_tries: u32) -> Self {
        Self {
            path: path.into(),
            interval,
            max_tries,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Probe `http://{address}{path}` until a `200 OK` arrives or the
    /// attempt budget is exhausted. `on_attempt` fires before each probe
    /// with the 1-based attempt number.
    pub async fn wait_until_healthy<F>(&self, address: &str, on_attempt: F) -> bool
    where
        F: Fn(u32),
    {
        let url = format!("http://{}{}", address, self.path);
        let client = reqwest::Client::builder()
            .timeout(self.interval)
            .build()
            .unwrap_or_default();

        for attempt in 1..=self.max_tries {
            on_attempt(attempt);

            match client.get(&url).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {
                    info!(%url, attempt, "health check passed");
                    return true;
                }
                Ok(response) => {
                    debug!(%url, status = %response.status(), attempt, "unhealthy response");
                }
                Err(e) => {
                    debug!(%url, attempt, error = %e, "health check attempt failed");
                }
            }

            if attempt < self.max_tries {
                tokio::time::sleep(self.interval).await;
            }
        }

        false
    }
}
