use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached value and the time it was written.
///
/// A record is fresh while `now - ts < ttl`. Records are only ever replaced
/// wholesale, so `ts` is always the time of the latest write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub data: T,
    pub ts: DateTime<Utc>,
}

impl<T> CacheRecord<T> {
    pub fn new(data: T) -> Self {
        Self::with_timestamp(data, Utc::now())
    }

    pub fn with_timestamp(data: T, ts: DateTime<Utc>) -> Self {
        Self { data, ts }
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.ts
    }

    /// Records written "in the future" (clock skew) count as fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) < ttl
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(Utc::now(), ttl)
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_fresh() {
        let record = CacheRecord::new(vec![1, 2, 3]);
        assert!(record.is_fresh(Duration::minutes(10)));
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let ttl = Duration::minutes(10);

        let just_inside = CacheRecord::with_timestamp((), now - ttl + Duration::milliseconds(1));
        assert!(just_inside.is_fresh_at(now, ttl));

        // Exactly TTL old is stale
        let at_boundary = CacheRecord::with_timestamp((), now - ttl);
        assert!(!at_boundary.is_fresh_at(now, ttl));

        let old = CacheRecord::with_timestamp((), now - Duration::minutes(11));
        assert!(!old.is_fresh_at(now, ttl));
    }

    #[test]
    fn test_clock_skew_counts_as_fresh() {
        let now = Utc::now();
        let future = CacheRecord::with_timestamp((), now + Duration::minutes(5));
        assert!(future.is_fresh_at(now, Duration::minutes(10)));
    }

    #[test]
    fn test_record_json_shape() {
        let record = CacheRecord::new("hello".to_string());
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["data"], "hello");
        assert!(json["ts"].is_string());
    }
}
