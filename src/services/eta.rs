//! Completion estimates calibrated from earlier runs of the same report shape.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::ReportShape;

/// `now` plus the previous generation time, or plus `default_secs` without one.
pub fn eta_from(now: DateTime<Utc>, previous_generation_time: Option<i64>, default_secs: i64) -> DateTime<Utc> {
    now + Duration::seconds(previous_generation_time.unwrap_or(default_secs))
}

/// Estimate when a new report of `shape` will be ready.
///
/// Only the most recently created other report of the same shape is
/// consulted. If it is still pending the default applies.
pub async fn estimate(
    pool: &DbPool,
    shape: &ReportShape,
    exclude: Uuid,
    now: DateTime<Utc>,
    default_secs: i64,
) -> AppResult<DateTime<Utc>> {
    let previous = pool.latest_report_for_shape(shape, Some(exclude)).await?;
    Ok(eta_from(
        now,
        previous.and_then(|r| r.generation_time),
        default_secs,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_uses_default() {
        let now = Utc::now();
        assert_eq!(eta_from(now, None, 180), now + Duration::seconds(180));
    }

    #[test]
    fn test_previous_generation_time_wins() {
        let now = Utc::now();
        assert_eq!(eta_from(now, Some(42), 180), now + Duration::seconds(42));
        assert_eq!(eta_from(now, Some(0), 180), now);
    }
}
