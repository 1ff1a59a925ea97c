//! Domain Services
//!
//! Pure functions shared by the entities and both repository implementations.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

use crate::domain::entities::Job;

/// End of the visibility window that starts at `published_at`
pub fn expiry_for(published_at: DateTime<Utc>, visibility_days: i32) -> DateTime<Utc> {
    published_at + Duration::days(i64::from(visibility_days))
}

/// Public listing order: higher tier first, then most recently published
pub fn listing_order(a: &Job, b: &Job) -> Ordering {
    b.tier
        .cmp(&a.tier)
        .then_with(|| b.published_at.cmp(&a.published_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expiry_for_thirty_days() {
        let published = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expires = expiry_for(published, 30);
        assert_eq!(expires, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_expiry_across_leap_day() {
        let published = Utc.with_ymd_and_hms(2024, 2, 28, 12, 0, 0).unwrap();
        assert_eq!(
            expiry_for(published, 2),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }
}
