//! Expiry janitor: periodically deletes decided research requests whose
//! retention has run out.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use heritage_core::store::HeritageStore;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

/// Run [`sweep`] every `every`, starting immediately.
pub fn spawn_janitor<S>(store: Arc<S>, every: Duration) -> JoinHandle<()>
where
  S: HeritageStore + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = every.as_secs(), "expiry janitor started");
    loop {
      ticker.tick().await;
      sweep(store.as_ref(), Utc::now()).await;
    }
  })
}

/// Delete every record expired at `now`. Errors are logged; the next tick
/// tries again.
pub async fn sweep<S: HeritageStore>(store: &S, now: DateTime<Utc>) -> usize {
  match store.delete_expired(now).await {
    Ok(0) => {
      debug!("expiry sweep found nothing to delete");
      0
    }
    Ok(deleted) => {
      info!(deleted, "expired research requests deleted");
      deleted
    }
    Err(e) => {
      warn!(error = %e, "expiry sweep failed");
      0
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration as ChronoDuration;
  use heritage_core::{
    site::Site,
    staging::{Action, EntryKind, NewTempSite, Review, Status},
  };
  use heritage_store_sqlite::SqliteStore;
  use uuid::Uuid;

  use super::*;

  async fn staged(store: &SqliteStore, site_id: &str) -> Uuid {
    store
      .insert_temp_site(NewTempSite {
        site:               Site {
          site_id: site_id.into(),
          ..Default::default()
        },
        research_expert_id: Uuid::new_v4(),
        action:             Action::Add,
        kind:               EntryKind::Site,
        uploads:            vec![],
      })
      .await
      .unwrap()
      .id
  }

  #[tokio::test]
  async fn sweep_deletes_only_expired_records() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let now = Utc::now();

    let old = staged(&store, "OLD").await;
    let fresh = staged(&store, "FRESH").await;
    let pending = staged(&store, "PENDING").await;

    store
      .record_review(old, Review {
        status:         Status::Approved,
        admin_feedback: None,
        expires_at:     Some(now - ChronoDuration::seconds(1)),
      })
      .await
      .unwrap();
    store
      .record_review(fresh, Review {
        status:         Status::Rejected,
        admin_feedback: None,
        expires_at:     Some(now + ChronoDuration::days(30)),
      })
      .await
      .unwrap();

    assert_eq!(sweep(&store, now).await, 1);
    assert!(store.get_temp_site(old).await.unwrap().is_none());
    assert!(store.get_temp_site(fresh).await.unwrap().is_some());
    assert!(store.get_temp_site(pending).await.unwrap().is_some());

    // Thirty days on, the rejected record goes too.
    assert_eq!(sweep(&store, now + ChronoDuration::days(31)).await, 1);
    assert!(store.get_temp_site(pending).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn spawned_janitor_sweeps_at_startup() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let id = staged(&store, "OLD").await;
    store
      .record_review(id, Review {
        status:         Status::Rejected,
        admin_feedback: None,
        expires_at:     Some(Utc::now() - ChronoDuration::minutes(5)),
      })
      .await
      .unwrap();

    let handle = spawn_janitor(store.clone(), Duration::from_secs(3600));
    for _ in 0..50 {
      if store.get_temp_site(id).await.unwrap().is_none() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();
    assert!(store.get_temp_site(id).await.unwrap().is_none());
  }
}
