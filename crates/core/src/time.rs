use chrono::{DateTime, Utc};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Formats how long ago `created_at` was, relative to `now`, in Arabic.
///
/// Elapsed time is floored into minute, hour and day bands; anything under
/// one minute (including timestamps slightly in the future because of clock
/// skew) renders as "الآن".
pub fn format_relative(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at).num_milliseconds();
    let minutes = elapsed.div_euclid(MINUTE_MS);
    if minutes < 1 {
        return "الآن".to_string();
    }
    if minutes < 60 {
        return format!("منذ {minutes} دقيقة");
    }

    let hours = elapsed.div_euclid(HOUR_MS);
    if hours < 24 {
        return format!("منذ {hours} ساعة");
    }

    let days = elapsed.div_euclid(DAY_MS);
    format!("منذ {days} يوم")
}
