//! Arrival-time estimation and human-readable formatting.

use chrono::{DateTime, Duration, Utc};

use super::{travel_time_min, TravelMode};

/// Estimated arrival timestamp for covering `distance_km` from `now`.
///
/// Arrivals beyond the representable range clamp to
/// [`DateTime::<Utc>::MAX_UTC`]; a NaN distance yields `now`.
pub fn eta(now: DateTime<Utc>, distance_km: f64, mode: TravelMode) -> DateTime<Utc> {
    let minutes = travel_time_min(distance_km, mode);
    let millis = (minutes * 60_000.0).round();
    if millis.is_nan() {
        return now;
    }
    let overflow = if millis > 0.0 {
        DateTime::<Utc>::MAX_UTC
    } else {
        now
    };
    // `as` saturates at the i64 bounds.
    Duration::try_milliseconds(millis as i64)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(overflow)
}

/// Format an ETA relative to the current wall clock.
pub fn format_eta(eta: DateTime<Utc>) -> String {
    format_eta_from(eta, Utc::now())
}

/// Format an ETA relative to `now`.
///
/// Uses whole-minute rounding:
/// - under a minute (or in the past): "Less than a minute"
/// - "1 minute", "N minutes"
/// - an hour or more: "H hr" or "H hr M min"
pub fn format_eta_from(eta: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining_secs = (eta - now).num_milliseconds() as f64 / 1000.0;
    let minutes = (remaining_secs / 60.0).round() as i64;

    if minutes < 1 {
        return "Less than a minute".to_string();
    }
    if minutes == 1 {
        return "1 minute".to_string();
    }
    if minutes < 60 {
        return format!("{} minutes", minutes);
    }

    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins == 0 {
        format!("{} hr", hours)
    } else {
        format!("{} hr {} min", hours, mins)
    }
}
