//! Config file watch with a debounced logging reload.
//!
//! The first relevant change event arms a [`DEBOUNCE`] timer; events that
//! arrive while it is armed are absorbed. When the timer fires the whole
//! file is re-read and its `logging` section handed to
//! [`LoggerHandle::reload`]. Failures are logged and the loop goes back to
//! idle without retrying.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::{LoggerHandle, WatchError};

pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// A running watch. Dropping it stops the watcher, which closes the event
/// channel and ends the reload loop.
pub struct ConfigWatch {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatch {
    /// Stop watching and wait for the reload loop to finish.
    pub async fn stop(self) {
        drop(self._watcher);
        if let Err(e) = self.task.await {
            warn!(error = %e, "config watch task ended abnormally");
        }
    }
}

/// Start watching `path`. Must be called inside a tokio runtime.
///
/// The parent directory is watched and events are filtered by file name,
/// so editors that replace the file on save are still observed.
pub fn watch(path: impl AsRef<Path>, handle: LoggerHandle) -> Result<ConfigWatch, WatchError> {
    let path = path.as_ref().to_path_buf();
    let file_name = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| WatchError::InvalidPath(path.clone()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // The receiver is gone only once the loop has ended.
        let _ = tx.send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "watching config file");

    let task = tokio::spawn(run_loop(path, file_name, rx, handle));
    Ok(ConfigWatch {
        _watcher: watcher,
        task,
    })
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    let kind = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    );
    kind && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

fn apply(path: &Path, handle: &LoggerHandle) {
    let config = match settings::load(path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config reload failed");
            return;
        }
    };
    if let Err(e) = handle.reload(&config.logging) {
        error!(error = %e, "logger reload failed");
    }
}

pub(crate) async fn run_loop(
    path: PathBuf,
    file_name: OsString,
    mut events: UnboundedReceiver<notify::Result<Event>>,
    handle: LoggerHandle,
) {
    let timer = sleep(DEBOUNCE);
    tokio::pin!(timer);
    let mut pending = false;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                None => break,
                Some(Err(e)) => warn!(error = %e, "config watcher error"),
                Some(Ok(event)) => {
                    if pending || !is_relevant(&event, &file_name) {
                        continue;
                    }
                    debug!(kind = ?event.kind, "config change, reload armed");
                    timer.as_mut().reset(Instant::now() + DEBOUNCE);
                    pending = true;
                }
            },
            () = &mut timer, if pending => {
                pending = false;
                apply(&path, &handle);
            }
        }
    }
    debug!("config watch loop stopped");
}
