use crate::domain::workflow::DisplayRef;
use crate::ports::display::DisplayPort;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Publishes videos as files in a scratch directory and hands out `file://`
/// references to them. Clones share the same set of live files.
#[derive(Clone, Debug)]
pub struct TempFileDisplay {
    dir: PathBuf,
    live: Arc<Mutex<HashSet<PathBuf>>>,
}

impl TempFileDisplay {
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            live: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Number of published references not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "mp4",
    }
}

impl DisplayPort for TempFileDisplay {
    fn publish(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<DisplayRef, Box<dyn Error + Send + Sync>> {
        let path = self
            .dir
            .join(format!("reel-{}.{}", Uuid::new_v4(), extension_for(mime_type)));
        std::fs::write(&path, bytes)?;

        debug!("Published {} bytes at {:?}", bytes.len(), path);
        let display = DisplayRef(format!("file://{}", path.display()));
        self.live.lock().insert(path);
        Ok(display)
    }

    fn release(&self, display: &DisplayRef) {
        let Some(path) = display.as_str().strip_prefix("file://").map(PathBuf::from) else {
            return;
        };
        // Unknown references were never ours to delete
        if !self.live.lock().remove(&path) {
            return;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            warn!("Failed to remove displayed video {:?}: {}", path, e);
        }
    }
}
