//! Recurring trigger for sweeps.
//!
//! Knows nothing about what it runs: it sleeps until the next tick of its
//! [`Cadence`] and starts the job without waiting for earlier runs to finish.
//! Runs may overlap; the job itself decides what overlapping means.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use tracing::{debug, info};

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub enum Cadence {
    /// Six or seven field cron expression, seconds first.
    Cron(Box<Schedule>),
    /// `@every <duration>`.
    Every(Duration),
}

impl Cadence {
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let expr = expr.trim();
        let invalid = |reason: String| ConfigError::Schedule { expr: expr.to_string(), reason };

        if let Some(rest) = expr.strip_prefix("@every") {
            let every = parse_duration(rest.trim()).map_err(invalid)?;
            if every.is_zero() {
                return Err(invalid("interval must be positive".into()));
            }
            return Ok(Cadence::Every(every));
        }

        Schedule::from_str(expr)
            .map(|s| Cadence::Cron(Box::new(s)))
            .map_err(|e| invalid(e.to_string()))
    }

    /// Time until the next tick after `now`, or `None` if the schedule has
    /// no further occurrences. Cron fields are read in `now`'s time zone.
    pub fn next_delay<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<Duration> {
        match self {
            Cadence::Every(every) => Some(*every),
            Cadence::Cron(schedule) => schedule
                .after(now)
                .next()
                .map(|next| next.signed_duration_since(now.clone()).to_std().unwrap_or_default()),
        }
    }
}

/// Parses Go-style compound durations such as `30s`, `5m` or `1h30m`.
fn parse_duration(text: &str) -> Result<Duration, String> {
    if text.is_empty() {
        return Err("missing interval".into());
    }

    let mut total = Duration::ZERO;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("expected a number at '{}'", rest));
        }
        let too_large = || format!("interval too large in '{}'", text);
        let value: u64 = rest[..digits].parse().map_err(|_| too_large())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(too_large)?),
            "h" => Duration::from_secs(value.checked_mul(3600).ok_or_else(too_large)?),
            "" => return Err(format!("missing unit in '{}'", text)),
            other => return Err(format!("unknown unit '{}'", other)),
        };
        total = total.checked_add(unit).ok_or_else(too_large)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

pub struct Scheduler {
    cadence: Cadence,
}

impl Scheduler {
    pub fn new(cadence: Cadence) -> Self {
        Self { cadence }
    }

    /// Runs `job` on every tick until the cadence is exhausted.
    pub async fn run<F, Fut>(self, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        info!("Scheduler started: {:?}", self.cadence);

        while let Some(delay) = self.cadence.next_delay(&Local::now()) {
            debug!("Next sweep in {:?}", delay);
            tokio::time::sleep(delay).await;
            tokio::spawn(job());
        }

        info!("Schedule has no further occurrences, scheduler stopped");
    }
}
