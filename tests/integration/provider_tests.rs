use anyhow::Result;
use linkwatch::{ExclusionFilters, FileInfo, PollingFileProvider, WatchOptions};
use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use super::helpers::{touch, wait_until};

fn layout() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    fs::create_dir_all(temp_dir.path().join("conf").join("env"))?;
    fs::write(temp_dir.path().join("appsettings.json"), "{}")?;
    fs::write(temp_dir.path().join(".env"), "SECRET=1")?;
    fs::write(temp_dir.path().join("conf").join("base.json"), "{}")?;
    fs::write(temp_dir.path().join("conf").join("env").join("prod.json"), "{}")?;
    Ok(temp_dir)
}

#[test]
fn test_lookups_stay_inside_root() -> Result<()> {
    let temp_dir = layout()?;
    let provider = PollingFileProvider::new(temp_dir.path(), WatchOptions::default())?;

    let info = provider.get_file_info("conf/env/../base.json");
    let physical = info.physical().expect("base.json is visible");
    assert_eq!(physical.name, "base.json");
    assert!(!physical.is_directory);

    assert!(matches!(
        provider.get_file_info("conf/../../appsettings.json"),
        FileInfo::NotFound { .. }
    ));
    assert!(!provider.get_file_info(".env").exists());
    Ok(())
}

#[test]
fn test_exclusions_can_be_disabled() -> Result<()> {
    let temp_dir = layout()?;
    let options = WatchOptions::default().with_exclusions(ExclusionFilters::NONE);
    let provider = PollingFileProvider::new(temp_dir.path(), options)?;

    assert!(provider.get_file_info(".env").exists());
    let names: Vec<String> = provider
        .get_directory_contents("/")
        .expect("root lists")
        .iter()
        .map(|info| info.name().to_string())
        .collect();
    assert_eq!(names, vec![".env", "appsettings.json", "conf"]);
    Ok(())
}

#[test]
fn test_directory_listing_marks_directories() -> Result<()> {
    let temp_dir = layout()?;
    let provider = PollingFileProvider::new(temp_dir.path(), WatchOptions::default())?;

    let contents = provider.get_directory_contents("conf").expect("conf lists");
    let summary: Vec<(String, bool)> = contents
        .iter()
        .filter_map(|info| info.physical())
        .map(|info| (info.name.clone(), info.is_directory))
        .collect();
    assert_eq!(
        summary,
        vec![("base.json".to_string(), false), ("env".to_string(), true)]
    );
    Ok(())
}

#[test]
fn test_watch_through_provider_fires() -> Result<()> {
    let temp_dir = layout()?;
    let options = WatchOptions::default().with_polling_interval(Duration::from_millis(20));
    let provider = PollingFileProvider::new(temp_dir.path(), options)?;

    let file_token = provider.watch("/conf/base.json");
    let tree_token = provider.watch("conf/");
    touch(
        &temp_dir.path().join("conf").join("env").join("prod.json"),
        Duration::from_secs(60),
    );

    assert!(wait_until(Duration::from_secs(10), || tree_token.has_changed()));
    assert!(!file_token.has_changed());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_linked_entries_report_target_metadata() -> Result<()> {
    let temp_dir = layout()?;
    let target = temp_dir.path().join("conf").join("base.json");
    fs::write(&target, "{\"key\":\"value\"}")?;
    std::os::unix::fs::symlink(&target, temp_dir.path().join("linked.json"))?;

    let provider = PollingFileProvider::new(temp_dir.path(), WatchOptions::default())?;
    let info = provider.get_file_info("linked.json");
    let physical = info.physical().expect("link is visible");
    assert!(physical.is_symlink);
    assert_eq!(physical.length, 15);
    assert_eq!(physical.last_modified, Some(fs::metadata(&target)?.modified()?));
    Ok(())
}
