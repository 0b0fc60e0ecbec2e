use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::clock::Clock;

/// Daily budget of outbound provider calls, shared across all endpoints.
pub const DAILY_LIMIT: u32 = 990;

const STORAGE_KEY: &str = "api_usage";

#[derive(Error, Debug)]
#[error("daily API limit exceeded")]
pub struct QuotaExceeded;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("budget storage failed: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Persisted call counter for the current day window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudget {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Durable store for the rate budget. A single record under a fixed key.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn load(&self) -> Result<Option<RateBudget>, StoreError>;
    async fn save(&self, budget: &RateBudget) -> Result<(), StoreError>;
}

pub struct SqliteBudgetStore {
    pool: SqlitePool,
}

impl SqliteBudgetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_table(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_budget (
                storage_key TEXT PRIMARY KEY,
                count INTEGER NOT NULL,
                window_start TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BudgetStore for SqliteBudgetStore {
    async fn load(&self) -> Result<Option<RateBudget>, StoreError> {
        let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT count, window_start FROM api_budget WHERE storage_key = $1",
        )
        .bind(STORAGE_KEY)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(count, window_start)| RateBudget {
            count: count.max(0) as u32,
            window_start,
        }))
    }

    async fn save(&self, budget: &RateBudget) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO api_budget (storage_key, count, window_start)
            VALUES ($1, $2, $3)
            ON CONFLICT(storage_key) DO UPDATE SET
                count = excluded.count,
                window_start = excluded.window_start
            "#,
        )
        .bind(STORAGE_KEY)
        .bind(budget.count as i64)
        .bind(budget.window_start)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory store, used in tests and as the degraded fallback shape.
pub struct MemoryBudgetStore {
    slot: RwLock<Option<RateBudget>>,
}

impl MemoryBudgetStore {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }
}

#[async_trait]
impl BudgetStore for MemoryBudgetStore {
    async fn load(&self) -> Result<Option<RateBudget>, StoreError> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, budget: &RateBudget) -> Result<(), StoreError> {
        *self.slot.write().await = Some(budget.clone());
        Ok(())
    }
}

/// Enforces the fixed daily quota of outbound network calls.
///
/// The whole read-modify-write of `reserve` runs under one mutex so two
/// interleaved resolutions cannot both pass a stale `count < limit` check.
pub struct RateLimiter {
    store: Arc<dyn BudgetStore>,
    clock: Arc<dyn Clock>,
    limit: u32,
    budget: Mutex<Option<RateBudget>>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn BudgetStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_limit(store, clock, DAILY_LIMIT)
    }

    pub fn with_limit(store: Arc<dyn BudgetStore>, clock: Arc<dyn Clock>, limit: u32) -> Self {
        Self {
            store,
            clock,
            limit,
            budget: Mutex::new(None),
        }
    }

    /// Reserves one call against the daily budget.
    ///
    /// The window resets only when the boundary is crossed forward; a clock
    /// that moves backward leaves the counter untouched. On `QuotaExceeded`
    /// nothing is incremented or persisted.
    pub async fn reserve(&self) -> Result<(), QuotaExceeded> {
        let mut guard = self.budget.lock().await;
        let now = self.clock.now();

        let mut budget = match guard.take() {
            Some(budget) => budget,
            None => match self.store.load().await {
                Ok(Some(budget)) => budget,
                Ok(None) => fresh_budget(now),
                Err(e) => {
                    tracing::warn!("budget store unavailable, starting cold: {}", e);
                    fresh_budget(now)
                }
            },
        };

        if now - budget.window_start >= Duration::hours(24) {
            budget.count = 0;
            budget.window_start = start_of_day(now);
        }

        if budget.count >= self.limit {
            *guard = Some(budget);
            return Err(QuotaExceeded);
        }

        budget.count += 1;
        if let Err(e) = self.store.save(&budget).await {
            tracing::warn!("failed to persist rate budget: {}", e);
        }
        *guard = Some(budget);

        Ok(())
    }
}

fn fresh_budget(now: DateTime<Utc>) -> RateBudget {
    RateBudget {
        count: 0,
        window_start: start_of_day(now),
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn limiter(limit: u32) -> (RateLimiter, Arc<MemoryBudgetStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryBudgetStore::new());
        let clock = Arc::new(ManualClock::new(noon()));
        let limiter = RateLimiter::with_limit(store.clone(), clock.clone(), limit);
        (limiter, store, clock)
    }

    #[tokio::test]
    async fn denies_after_limit_reached() {
        let (limiter, _, _) = limiter(3);

        for _ in 0..3 {
            assert!(limiter.reserve().await.is_ok());
        }
        assert!(limiter.reserve().await.is_err());
        // Denial must not consume budget or flip state.
        assert!(limiter.reserve().await.is_err());
    }

    #[tokio::test]
    async fn resets_after_day_boundary() {
        let (limiter, _, clock) = limiter(2);

        assert!(limiter.reserve().await.is_ok());
        assert!(limiter.reserve().await.is_ok());
        assert!(limiter.reserve().await.is_err());

        clock.advance(Duration::hours(24));
        assert!(limiter.reserve().await.is_ok());
    }

    #[tokio::test]
    async fn backward_clock_does_not_reset() {
        let (limiter, _, clock) = limiter(1);

        assert!(limiter.reserve().await.is_ok());
        clock.advance(Duration::hours(-36));
        assert!(limiter.reserve().await.is_err());
    }

    #[tokio::test]
    async fn counter_survives_restart_within_same_day() {
        let store = Arc::new(MemoryBudgetStore::new());
        let clock = Arc::new(ManualClock::new(noon()));

        let first = RateLimiter::with_limit(store.clone(), clock.clone(), 2);
        assert!(first.reserve().await.is_ok());
        assert!(first.reserve().await.is_ok());

        // Same store, new limiter: the persisted count still binds.
        let second = RateLimiter::with_limit(store.clone(), clock.clone(), 2);
        assert!(second.reserve().await.is_err());
    }

    #[tokio::test]
    async fn persists_each_successful_reserve() {
        let (limiter, store, _) = limiter(10);

        limiter.reserve().await.unwrap();
        limiter.reserve().await.unwrap();

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.count, 2);
    }

    #[tokio::test]
    async fn concurrent_reserves_never_exceed_limit() {
        let store = Arc::new(MemoryBudgetStore::new());
        let clock = Arc::new(ManualClock::new(noon()));
        let limiter = Arc::new(RateLimiter::with_limit(store.clone(), clock, 5));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.reserve().await.is_ok() }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5);
        assert_eq!(store.load().await.unwrap().unwrap().count, 5);
    }
}
