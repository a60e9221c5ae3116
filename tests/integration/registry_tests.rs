use anyhow::Result;
use linkwatch::{ChangeToken, ManualClock, PollingRegistry, WatchOptions};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::helpers::{touch, wait_until};

fn fast_options() -> WatchOptions {
    WatchOptions::default().with_polling_interval(Duration::from_millis(20))
}

#[test]
fn test_independent_watches_both_fire() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("config.json");
    fs::write(&file, "{}")?;

    let clock = ManualClock::new();
    let options = WatchOptions::default()
        .with_polling_interval(Duration::from_secs(3600))
        .with_clock(Arc::new(clock.clone()));
    let registry = PollingRegistry::new(temp_dir.path(), options);

    let first = registry.watch("config.json");
    let second = registry.watch("config.json");
    assert!(!first.has_changed());
    assert!(!second.has_changed());

    touch(&file, Duration::from_secs(60));
    clock.advance(Duration::from_secs(3600));

    assert!(first.has_changed());
    assert!(second.has_changed());
    Ok(())
}

#[test]
fn test_background_tick_fires_passive_holders() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("config.json");
    fs::write(&file, "{}")?;
    let registry = PollingRegistry::new(temp_dir.path(), fast_options());

    let fired = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&fired);
    let token = registry.watch("config.json");
    let _registration = token.register_callback(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    touch(&file, Duration::from_secs(60));
    assert!(wait_until(Duration::from_secs(10), || fired
        .load(Ordering::SeqCst)
        == 1));
    assert!(wait_until(Duration::from_secs(10), || registry.active_tokens() == 0));
    assert!(token.has_changed());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_wildcard_watch_through_registry() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let registry = PollingRegistry::new(temp_dir.path(), fast_options());

    let json = registry.watch("*.json");
    let notes = registry.watch("notes/");
    fs::write(temp_dir.path().join("added.json"), "{}")?;

    assert!(wait_until(Duration::from_secs(10), || json.has_changed()));
    assert!(!notes.has_changed());
    Ok(())
}

#[test]
fn test_invalid_keys_never_fire() {
    let temp_dir = TempDir::new().unwrap();
    let registry = PollingRegistry::new(temp_dir.path(), fast_options());

    for key in ["../escape.json", "a\"b", "", "/"] {
        let token = registry.watch(key);
        assert!(matches!(token, ChangeToken::Null), "{key:?} should be null");
        assert!(!token.active_change_callbacks());
    }
    assert!(!registry.is_timer_running());
}

#[test]
fn test_dispose_on_drop_stops_timer_thread() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("config.json");
    fs::write(&file, "{}")?;

    let token = {
        let registry = PollingRegistry::new(temp_dir.path(), fast_options());
        let token = registry.watch("config.json");
        assert!(registry.is_timer_running());
        token
    };

    touch(&file, Duration::from_secs(60));
    std::thread::sleep(Duration::from_millis(100));
    assert!(!token.has_changed());
    Ok(())
}

#[test]
fn test_on_change_rearms_across_fires() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("config.json");
    fs::write(&file, "{}")?;
    let registry = Arc::new(PollingRegistry::new(temp_dir.path(), fast_options()));

    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let producer = Arc::clone(&registry);
    let _subscription = linkwatch::on_change(
        move || producer.watch("config.json"),
        move || {
            seen.fetch_add(1, Ordering::SeqCst);
        },
    );

    touch(&file, Duration::from_secs(60));
    assert!(wait_until(Duration::from_secs(10), || count.load(Ordering::SeqCst) >= 1));

    touch(&file, Duration::from_secs(120));
    assert!(wait_until(Duration::from_secs(10), || count.load(Ordering::SeqCst) >= 2));
    Ok(())
}
