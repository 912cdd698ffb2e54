use std::path::PathBuf;
use std::time::Duration;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

const DEFAULT_CONCURRENT_IO: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Upper bound on directory listings in flight during a scan.
    pub max_concurrent_io: usize,
    pub follow_symlinks: bool,
    /// Pause after every attempted file. Zero disables throttling.
    pub file_delay_ms: u64,
    /// Wait after persisting a new collection before it is used as a parent.
    pub settle_delay_ms: u64,
    /// Extensions that are never copied into managed storage.
    pub shortcut_extensions: Vec<CompactString>,
    pub library_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let library_dir = dirs_data_dir().unwrap_or_else(|| PathBuf::from(".folder-import"));

        Self {
            max_concurrent_io: cap_by_fd_limit(DEFAULT_CONCURRENT_IO),
            follow_symlinks: false,
            file_delay_ms: 10,
            settle_delay_ms: 10,
            shortcut_extensions: vec![CompactString::from("lnk")],
            library_dir,
        }
    }
}

impl Settings {
    pub fn file_delay(&self) -> Option<Duration> {
        (self.file_delay_ms > 0).then(|| Duration::from_millis(self.file_delay_ms))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library/Application Support/folder-import"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("folder-import"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Some(PathBuf::from(".folder-import"))
    }
}

/// Cap concurrency based on the system's file descriptor soft limit.
/// Half of the descriptors stay available for the library store.
fn cap_by_fd_limit(max_io: usize) -> usize {
    #[cfg(unix)]
    {
        let mut rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        let ret = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) };
        if ret == 0 && rlim.rlim_cur != libc::RLIM_INFINITY {
            let usable = rlim.rlim_cur as usize / 2;
            return max_io.min(usable).max(8);
        }
    }
    max_io
}
