use crate::CoreError;
use devcluster_runtime::CancelHandle;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

pub const LOCK_FILE: &str = ".devcluster.lock";

/// Exclusive advisory lock on a work directory. Environments are not safe to
/// drive from two places at once; the CLI holds this for mutating commands.
#[derive(Debug)]
pub struct WorkDirLock {
    lock_file: File,
}

impl WorkDirLock {
    pub fn acquire(work_dir: &Path) -> Result<Self, CoreError> {
        let file = open_lock_file(work_dir)?;
        file.lock_exclusive().map_err(CoreError::Lock)?;
        Ok(Self { lock_file: file })
    }

    pub fn try_acquire(work_dir: &Path) -> Result<Option<Self>, CoreError> {
        let file = open_lock_file(work_dir)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(e) if held_elsewhere(&e) => Ok(None),
            Err(e) => Err(CoreError::Lock(e)),
        }
    }
}

/// Whether a failed non-blocking lock means another holder, as opposed to the
/// filesystem refusing locks altogether (e.g. ENOLCK on some network mounts).
fn held_elsewhere(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || (err.raw_os_error().is_some()
            && err.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}

fn open_lock_file(work_dir: &Path) -> Result<File, CoreError> {
    std::fs::create_dir_all(work_dir).map_err(|source| CoreError::CreateWorkDir {
        path: work_dir.to_path_buf(),
        source,
    })?;
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(work_dir.join(LOCK_FILE))
        .map_err(CoreError::Lock)
}

impl Drop for WorkDirLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C cancels `handle` (killing the running kind process); a second
/// one exits immediately.
pub fn install_signal_handler(handle: CancelHandle) {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        handle.cancel();
        eprintln!("\ninterrupt received, stopping current operation...");
    });
}
