//! Per-day request quota for the email endpoint.

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

/// Counts calls per UTC day and refuses them once `limit` is reached.
///
/// A limit of `0` disables the quota.
#[derive(Debug)]
pub struct DailyQuota {
    limit: u32,
    used: Mutex<(NaiveDate, u32)>,
}

impl DailyQuota {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: Mutex::new((Utc::now().date_naive(), 0)) }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Take one call from today's allowance. Returns `false` when it is spent.
    pub async fn try_acquire(&self) -> bool {
        self.try_acquire_on(Utc::now().date_naive()).await
    }

    pub async fn try_acquire_on(&self, today: NaiveDate) -> bool {
        if self.limit == 0 {
            return true;
        }
        let mut used = self.used.lock().await;
        if used.0 != today {
            *used = (today, 0);
        }
        if used.1 >= self.limit {
            return false;
        }
        used.1 += 1;
        true
    }

    /// Calls left today.
    pub async fn remaining(&self) -> Option<u32> {
        if self.limit == 0 {
            return None;
        }
        let today = Utc::now().date_naive();
        let used = self.used.lock().await;
        Some(if used.0 == today { self.limit.saturating_sub(used.1) } else { self.limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn limit_resets_at_day_boundary() {
        let quota = DailyQuota::new(2);
        assert!(quota.try_acquire_on(day(1)).await);
        assert!(quota.try_acquire_on(day(1)).await);
        assert!(!quota.try_acquire_on(day(1)).await);
        assert!(quota.try_acquire_on(day(2)).await);
    }

    #[tokio::test]
    async fn zero_disables_the_quota() {
        let quota = DailyQuota::new(0);
        for _ in 0..100 {
            assert!(quota.try_acquire().await);
        }
        assert_eq!(quota.remaining().await, None);
    }

    #[tokio::test]
    async fn remaining_counts_down() {
        let quota = DailyQuota::new(3);
        assert!(quota.try_acquire().await);
        assert_eq!(quota.remaining().await, Some(2));
    }
}
