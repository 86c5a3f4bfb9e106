use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::{ActivityEvent, LockAction};
use lockly_activity::{ActivityError, ActivityPoller, ActivityQuery, refresh};
use tokio::sync::RwLock;

/// 第 n 次调用按脚本返回成功或失败。
struct FlakyQuery {
    calls: AtomicUsize,
    fail_after: usize,
}

#[async_trait]
impl ActivityQuery for FlakyQuery {
    async fn recent_activity(
        &self,
        entry_id: &str,
        max_events: usize,
    ) -> Result<Vec<ActivityEvent>, ActivityError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_after {
            return Err(ActivityError::Query("host unavailable".to_string()));
        }
        let events = (0..max_events.min(3))
            .map(|index| ActivityEvent::new(entry_id, LockAction::Lock, index as i64))
            .collect();
        Ok(events)
    }
}

#[tokio::test]
async fn failed_refresh_keeps_previous_cache() {
    let query = FlakyQuery {
        calls: AtomicUsize::new(0),
        fail_after: 1,
    };
    let cache = RwLock::new(Vec::new());

    assert!(refresh(&query, "Front Door", 20, &cache).await);
    assert_eq!(cache.read().await.len(), 3);

    assert!(!refresh(&query, "Front Door", 20, &cache).await);
    assert_eq!(cache.read().await.len(), 3);
}

#[tokio::test]
async fn poller_fills_cache_and_stops() {
    let query = Arc::new(FlakyQuery {
        calls: AtomicUsize::new(0),
        fail_after: usize::MAX,
    });
    let mut poller = ActivityPoller::spawn(query.clone(), "Garage", 2, Duration::from_millis(10));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = poller.events().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].lock, "Garage");
    assert!(poller.is_running());

    poller.stop();
    tokio::task::yield_now().await;
    let calls = query.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(query.calls.load(Ordering::SeqCst), calls);
    assert!(!poller.is_running());
    assert_eq!(poller.events().await.len(), 2);
}
