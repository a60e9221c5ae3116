use anyhow::Result;
use linkwatch::{LinkedFile, WatchOptions};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::helpers::{touch, wait_until};

fn fast_options() -> WatchOptions {
    WatchOptions::default().with_polling_interval(Duration::from_millis(20))
}

#[tokio::test]
async fn test_plain_config_file_reload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir(temp_dir.path().join("config"))?;
    let file = temp_dir.path().join("config").join("appsettings.json");
    fs::write(&file, "{\"v\":1}")?;

    let linked = LinkedFile::locate(temp_dir.path(), "config/appsettings.json", fast_options())?;
    let token = linked.watch();

    fs::write(&file, "{\"v\":2}")?;
    touch(&file, Duration::from_secs(60));

    assert!(wait_until(Duration::from_secs(10), || token.has_changed()));
    assert_eq!(linked.read_to_string().await?.as_deref(), Some("{\"v\":2}"));
    Ok(())
}

/// Config-map style deploy: `..data` is repointed at a new version directory
#[cfg(unix)]
#[tokio::test]
async fn test_swapping_link_target_is_detected() -> Result<()> {
    use std::os::unix::fs::symlink;

    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    let v1 = root.join("v1");
    let v2 = root.join("v2");
    fs::create_dir(&v1)?;
    fs::create_dir(&v2)?;
    fs::write(v1.join("appsettings.json"), "{\"v\":1}")?;
    fs::write(v2.join("appsettings.json"), "{\"v\":2}")?;
    touch(&v2.join("appsettings.json"), Duration::from_secs(60));

    let mount = root.join("mount");
    fs::create_dir(&mount)?;
    symlink(&v1, mount.join("..data"))?;
    symlink(
        mount.join("..data").join("appsettings.json"),
        mount.join("appsettings.json"),
    )?;

    let linked = LinkedFile::locate(root, "mount/appsettings.json", fast_options())?;
    assert!(linked.is_linked());

    let changes = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&changes);
    let _subscription = linked.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let staged = mount.join("..data_tmp");
    symlink(&v2, &staged)?;
    fs::rename(&staged, mount.join("..data"))?;

    assert!(wait_until(Duration::from_secs(10), || changes
        .load(Ordering::SeqCst)
        >= 1));
    assert_eq!(linked.read_to_string().await?.as_deref(), Some("{\"v\":2}"));
    Ok(())
}
