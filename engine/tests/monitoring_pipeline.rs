use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, NamedTempFile};
use thermowatch_engine::dedup::DedupState;
use thermowatch_engine::feed::{ChannelFeed, FeedPublisher, SimulatedFeed};
use thermowatch_engine::notify::ChannelNotifier;
use thermowatch_engine::store::{FileStore, MemoryStore, ThresholdStore};
use thermowatch_engine::{EngineSnapshot, InputError, Lifecycle, MonitoringEngine};
use thermowatch_shared::{Notification, ThresholdField, Thresholds};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Pipeline {
    engine: MonitoringEngine,
    publisher: FeedPublisher,
    notifications: UnboundedReceiver<Notification>,
}

async fn pipeline(store: Arc<dyn ThresholdStore>) -> Result<Pipeline> {
    let (publisher, feed) = ChannelFeed::create("bench sensor");
    let (notifier, notifications) = ChannelNotifier::create();
    let engine = MonitoringEngine::new(Arc::new(feed), store, Arc::new(notifier));
    engine.start().await?;
    Ok(Pipeline {
        engine,
        publisher,
        notifications,
    })
}

async fn wait_for_history(engine: &MonitoringEngine, len: usize) -> Result<EngineSnapshot> {
    let mut rx = engine.watch();
    let snapshot = timeout(WAIT, rx.wait_for(|s| s.history.len() == len)).await??;
    Ok(snapshot.clone())
}

async fn next_notification(rx: &mut UnboundedReceiver<Notification>) -> Result<Notification> {
    timeout(WAIT, rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("notifier channel closed"))
}

#[tokio::test]
async fn test_feed_to_notifier() -> Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(FileStore::new(dir.path().join("thresholds.json")));
    let mut p = pipeline(store).await?;

    for value in [22.0, 35.0, 35.0, 18.0, 35.0] {
        p.publisher.publish_value(value)?;
    }

    let snapshot = wait_for_history(&p.engine, 5).await?;
    assert_eq!(snapshot.current_reading.unwrap().value(), 35.0);
    assert!(!snapshot.within_thresholds);
    assert_eq!(snapshot.dedup, DedupState::Alerted(35.0));

    let bodies = [
        next_notification(&mut p.notifications).await?.body,
        next_notification(&mut p.notifications).await?.body,
        next_notification(&mut p.notifications).await?.body,
    ];
    assert_eq!(bodies[0], "Temperature (35°C) is above the maximum (30°C)");
    assert_eq!(bodies[1], "Temperature (18°C) is below the minimum (20°C)");
    assert_eq!(bodies[2], "Temperature (35°C) is above the maximum (30°C)");

    p.engine.stop().await;
    assert!(p.notifications.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_commit_rearms_alerting() -> Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(FileStore::new(dir.path().join("thresholds.json")));
    let mut p = pipeline(store).await?;

    p.publisher.publish_value(35.0)?;
    p.publisher.publish_value(35.0)?;
    wait_for_history(&p.engine, 2).await?;
    next_notification(&mut p.notifications).await?;
    assert!(p.notifications.try_recv().is_err());

    p.engine.commit_threshold(ThresholdField::Max, "33").await?;
    p.publisher.publish_value(35.0)?;
    wait_for_history(&p.engine, 3).await?;

    let note = next_notification(&mut p.notifications).await?;
    assert_eq!(note.body, "Temperature (35°C) is above the maximum (33°C)");

    p.engine.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_thresholds_survive_restart() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("thresholds.json");

    let first = pipeline(Arc::new(FileStore::new(&path))).await?;
    first.engine.commit_threshold(ThresholdField::Min, "12.5").await?;
    first.engine.commit_threshold(ThresholdField::Max, "19").await?;
    first.engine.stop().await;

    let raw = std::fs::read_to_string(&path)?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(json["min"], "12.5");
    assert_eq!(json["max"], "19");

    let second = pipeline(Arc::new(FileStore::new(&path))).await?;
    assert_eq!(second.engine.committed_thresholds(), Thresholds::new(12.5, 19.0)?);
    assert_eq!(second.engine.threshold_inputs().max, "19");
    second.engine.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_corrupt_store_falls_back_to_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("thresholds.json");
    std::fs::write(&path, "{ not json")?;

    let p = pipeline(Arc::new(FileStore::new(&path))).await?;
    assert_eq!(p.engine.committed_thresholds(), Thresholds::default());
    p.engine.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_unwritable_store_rejects_commit() -> Result<()> {
    // Parent "directory" is a regular file, so every save fails
    let blocker = NamedTempFile::new()?;
    let store = Arc::new(FileStore::new(blocker.path().join("thresholds.json")));
    let p = pipeline(store).await?;

    p.engine.update_threshold_input(ThresholdField::Max, "28");
    let err = p
        .engine
        .commit_threshold(ThresholdField::Max, "28")
        .await
        .unwrap_err();
    assert!(matches!(err, InputError::Persist(_)));
    assert_eq!(p.engine.committed_thresholds(), Thresholds::default());
    assert_eq!(p.engine.threshold_inputs().max, "30");
    assert_eq!(
        p.engine.input_error_message().as_deref(),
        Some("Failed to save thresholds")
    );

    p.engine.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_stop_ignores_late_readings() -> Result<()> {
    let dir = tempdir()?;
    let p = pipeline(Arc::new(FileStore::new(dir.path().join("t.json")))).await?;

    p.publisher.publish_value(25.0)?;
    wait_for_history(&p.engine, 1).await?;

    p.engine.stop().await;
    assert_eq!(p.engine.lifecycle(), Lifecycle::Stopped);
    p.publisher.publish_value(40.0)?;
    tokio::task::yield_now().await;

    let history = p.engine.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].value(), 25.0);
    assert!(p.engine.start().await.is_err());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_simulated_feed_fills_bounded_history() -> Result<()> {
    let feed = SimulatedFeed::new(15.0, 35.0, Duration::from_secs(5));
    let (notifier, _notifications) = ChannelNotifier::create();
    let engine = MonitoringEngine::new(
        Arc::new(feed),
        Arc::new(MemoryStore::new()),
        Arc::new(notifier),
    );
    engine.start().await?;

    tokio::time::sleep(Duration::from_secs(60)).await;

    let history = engine.history();
    assert_eq!(history.len(), 6);
    assert!(history
        .iter()
        .all(|r| (15.0..=35.0).contains(&r.value())));
    assert!(history
        .windows(2)
        .all(|w| w[0].observed_at() <= w[1].observed_at()));

    engine.stop().await;
    Ok(())
}
