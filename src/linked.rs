//! Configuration files reached through a symbolic link
//!
//! Mounted configuration (Kubernetes config maps, Docker secrets) usually
//! arrives as a link whose target is swapped atomically. Watching the link's
//! own directory and keying the watch by the link name makes every poll
//! re-resolve the chain, so the swap is seen as a change.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::change_token::{on_change, ChangeSubscription, ChangeToken};
use crate::core::errors::LinkWatchError;
use crate::provider::{FileInfo, PollingFileProvider};
use crate::watcher::WatchOptions;

#[derive(Debug)]
pub struct LinkedFile {
    provider: Arc<PollingFileProvider>,
    key: String,
    physical_path: PathBuf,
    linked: bool,
}

impl LinkedFile {
    /// Locate `relative_path` below `base_dir` and set up its watch
    pub fn locate(
        base_dir: impl AsRef<Path>,
        relative_path: &str,
        options: WatchOptions,
    ) -> Result<Self, LinkWatchError> {
        let base_dir = base_dir.as_ref();
        let physical_path = base_dir.join(relative_path);
        let resolver = options.resolver();

        let link_dir = physical_path
            .parent()
            .zip(physical_path.file_name())
            .filter(|_| resolver.is_symlink(&physical_path));

        let (provider, key, linked) = match link_dir {
            Some((dir, name)) => {
                let key = name.to_string_lossy().into_owned();
                info!(
                    "{} is a symbolic link, watching {} in {}",
                    physical_path.display(),
                    key,
                    dir.display()
                );
                (PollingFileProvider::new(dir, options)?, key, true)
            }
            None => {
                debug!("{} is not a symbolic link", physical_path.display());
                (
                    PollingFileProvider::new(base_dir, options)?,
                    relative_path.to_string(),
                    false,
                )
            }
        };

        Ok(Self {
            provider: Arc::new(provider),
            key,
            physical_path,
            linked,
        })
    }

    pub fn provider(&self) -> &Arc<PollingFileProvider> {
        &self.provider
    }

    /// Path as configured, before any link is followed
    pub fn physical_path(&self) -> &Path {
        &self.physical_path
    }

    /// Whether the configured path was a symbolic link when located
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Key the provider watches, relative to its root
    pub fn watch_key(&self) -> &str {
        &self.key
    }

    pub fn file_info(&self) -> FileInfo {
        self.provider.get_file_info(&self.key)
    }

    pub fn watch(&self) -> ChangeToken {
        self.provider.watch(&self.key)
    }

    /// Call `consumer` after every change until the subscription is dropped
    pub fn subscribe<C>(&self, consumer: C) -> ChangeSubscription
    where
        C: Fn() + Send + Sync + 'static,
    {
        let provider = Arc::clone(&self.provider);
        let key = self.key.clone();
        on_change(move || provider.watch(&key), consumer)
    }

    /// Current contents through the link chain, or `None` if the target is missing
    pub async fn read_to_string(&self) -> Result<Option<String>, LinkWatchError> {
        match tokio::fs::read_to_string(&self.physical_path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LinkWatchError::Read {
                path: self.physical_path.clone(),
                source,
            }),
        }
    }
}
