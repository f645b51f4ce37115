use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use serde_json::Value;

use super::Endpoint;
use crate::consts::{
    DAILY_SCHEDULE_CACHE, MATCH_SUMMARY_CACHE, PLAYER_PROFILE_CACHE, TEAM_PROFILE_CACHE,
};

/// Maximum entries kept per endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCapacities {
    pub daily_schedule: u64,
    pub match_summary: u64,
    pub player_profile: u64,
    pub team_profile: u64,
}

impl Default for CacheCapacities {
    fn default() -> Self {
        Self {
            daily_schedule: DAILY_SCHEDULE_CACHE,
            match_summary: MATCH_SUMMARY_CACHE,
            player_profile: PLAYER_PROFILE_CACHE,
            team_profile: TEAM_PROFILE_CACHE,
        }
    }
}

type Bucket = Mutex<LruCache<Endpoint, Arc<Value>>>;

/// A zero capacity still keeps one entry.
fn bucket(capacity: u64) -> Bucket {
    let capacity = usize::try_from(capacity)
        .ok()
        .and_then(NonZeroUsize::new)
        .unwrap_or(NonZeroUsize::MIN);
    Mutex::new(LruCache::new(capacity))
}

/// Memoized upstream bodies, keyed by [`Endpoint`].
///
/// One bounded cache per endpoint class so a burst of schedule lookups
/// cannot push out match summaries. A full bucket always admits the new
/// entry and drops its least recently used one. Entries never expire by
/// time; the live schedule has no bucket and is always fetched fresh.
pub struct ResponseCache {
    daily_schedule: Bucket,
    match_summary: Bucket,
    player_profile: Bucket,
    team_profile: Bucket,
}

impl ResponseCache {
    pub fn new(capacities: CacheCapacities) -> Self {
        Self {
            daily_schedule: bucket(capacities.daily_schedule),
            match_summary: bucket(capacities.match_summary),
            player_profile: bucket(capacities.player_profile),
            team_profile: bucket(capacities.team_profile),
        }
    }

    fn bucket(&self, endpoint: &Endpoint) -> Option<&Bucket> {
        match endpoint {
            Endpoint::DailySchedule(_) => Some(&self.daily_schedule),
            Endpoint::LiveSchedule => None,
            Endpoint::MatchSummary(_) => Some(&self.match_summary),
            Endpoint::PlayerProfile(_) => Some(&self.player_profile),
            Endpoint::TeamProfile(_) => Some(&self.team_profile),
        }
    }

    pub fn is_cacheable(&self, endpoint: &Endpoint) -> bool {
        self.bucket(endpoint).is_some()
    }

    /// A hit marks the entry as most recently used.
    pub fn get(&self, endpoint: &Endpoint) -> Option<Arc<Value>> {
        let mut bucket = self
            .bucket(endpoint)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        bucket.get(endpoint).cloned()
    }

    /// Store a body. No-op for uncached endpoints.
    pub fn insert(&self, endpoint: Endpoint, body: Arc<Value>) {
        if let Some(bucket) = self.bucket(&endpoint) {
            bucket
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .put(endpoint, body);
        }
    }

    /// Entries currently held for the endpoint's class.
    pub fn len(&self, endpoint: &Endpoint) -> usize {
        self.bucket(endpoint).map_or(0, |bucket| {
            bucket.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheCapacities::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn summary(id: &str) -> Endpoint {
        Endpoint::MatchSummary(id.to_string())
    }

    #[test]
    fn default_capacities() {
        let caps = CacheCapacities::default();
        assert_eq!(caps.daily_schedule, 32);
        assert_eq!(caps.match_summary, 10);
        assert_eq!(caps.player_profile, 10);
        assert_eq!(caps.team_profile, 5);
    }

    #[test]
    fn miss_then_hit() {
        let cache = ResponseCache::default();
        assert!(cache.get(&summary("sr:match:1")).is_none());

        cache.insert(summary("sr:match:1"), Arc::new(json!({"id": 1})));
        assert_eq!(*cache.get(&summary("sr:match:1")).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn live_schedule_is_never_stored() {
        let cache = ResponseCache::default();
        assert!(!cache.is_cacheable(&Endpoint::LiveSchedule));

        cache.insert(Endpoint::LiveSchedule, Arc::new(json!({"sport_events": []})));
        assert!(cache.get(&Endpoint::LiveSchedule).is_none());
    }

    #[test]
    fn identities_with_same_id_do_not_collide() {
        let cache = ResponseCache::default();
        cache.insert(
            Endpoint::PlayerProfile("sr:x:1".into()),
            Arc::new(json!("player")),
        );
        cache.insert(
            Endpoint::TeamProfile("sr:x:1".into()),
            Arc::new(json!("team")),
        );

        assert_eq!(
            *cache.get(&Endpoint::PlayerProfile("sr:x:1".into())).unwrap(),
            json!("player")
        );
        assert_eq!(
            *cache.get(&Endpoint::TeamProfile("sr:x:1".into())).unwrap(),
            json!("team")
        );
    }

    #[test]
    fn schedules_keyed_by_date() {
        let cache = ResponseCache::default();
        let monday = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 2, 17).unwrap();

        cache.insert(Endpoint::DailySchedule(monday), Arc::new(json!("mon")));
        assert!(cache.get(&Endpoint::DailySchedule(tuesday)).is_none());
        assert!(cache.get(&Endpoint::DailySchedule(monday)).is_some());
    }

    fn small() -> ResponseCache {
        ResponseCache::new(CacheCapacities {
            daily_schedule: 2,
            match_summary: 3,
            player_profile: 2,
            team_profile: 1,
        })
    }

    #[test]
    fn one_over_capacity_evicts_only_least_recent() {
        let cache = small();
        for i in 0..3 {
            cache.insert(summary(&format!("sr:match:{i}")), Arc::new(json!(i)));
        }
        // Touch 0 so 1 becomes the least recently used.
        assert!(cache.get(&summary("sr:match:0")).is_some());

        cache.insert(summary("sr:match:3"), Arc::new(json!(3)));

        assert_eq!(cache.len(&summary("sr:match:0")), 3);
        assert!(cache.get(&summary("sr:match:1")).is_none());
        for i in [0, 2, 3] {
            assert_eq!(
                *cache.get(&summary(&format!("sr:match:{i}"))).unwrap(),
                json!(i)
            );
        }
    }

    #[test]
    fn new_entries_are_admitted_past_frequently_read_ones() {
        let cache = ResponseCache::default();
        for i in 0..10 {
            cache.insert(summary(&format!("hot:{i}")), Arc::new(json!(i)));
        }
        for _ in 0..50 {
            for i in 0..10 {
                assert!(cache.get(&summary(&format!("hot:{i}"))).is_some());
            }
        }

        for i in 0..10 {
            cache.insert(summary(&format!("new:{i}")), Arc::new(json!(i)));
            assert!(cache.len(&summary("any")) <= 10);
        }

        for i in 0..10 {
            assert!(cache.get(&summary(&format!("new:{i}"))).is_some());
            assert!(cache.get(&summary(&format!("hot:{i}"))).is_none());
        }
    }

    #[test]
    fn buckets_fill_independently() {
        let cache = small();
        let day = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        cache.insert(Endpoint::DailySchedule(day), Arc::new(json!("mon")));
        for i in 0..5 {
            cache.insert(
                Endpoint::TeamProfile(format!("sr:competitor:{i}")),
                Arc::new(json!(i)),
            );
        }

        assert_eq!(cache.len(&Endpoint::TeamProfile(String::new())), 1);
        assert!(cache.get(&Endpoint::TeamProfile("sr:competitor:4".into())).is_some());
        assert!(cache.get(&Endpoint::DailySchedule(day)).is_some());
    }

    #[test]
    fn reinserting_refreshes_recency_and_value() {
        let cache = small();
        let player = |id: &str| Endpoint::PlayerProfile(id.to_string());
        cache.insert(player("a"), Arc::new(json!("old")));
        cache.insert(player("b"), Arc::new(json!("b")));
        cache.insert(player("a"), Arc::new(json!("new")));
        cache.insert(player("c"), Arc::new(json!("c")));

        assert!(cache.get(&player("b")).is_none());
        assert_eq!(*cache.get(&player("a")).unwrap(), json!("new"));
    }

    #[test]
    fn zero_capacity_keeps_latest_entry() {
        let cache = ResponseCache::new(CacheCapacities {
            daily_schedule: 0,
            match_summary: 0,
            player_profile: 0,
            team_profile: 0,
        });
        cache.insert(summary("sr:match:1"), Arc::new(json!(1)));
        cache.insert(summary("sr:match:2"), Arc::new(json!(2)));
        assert!(cache.get(&summary("sr:match:1")).is_none());
        assert!(cache.get(&summary("sr:match:2")).is_some());
    }
}
