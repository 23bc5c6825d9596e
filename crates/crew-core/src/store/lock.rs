//! Advisory file locking with backoff retry

use crate::error::CrewError;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Exclusive lock guard that automatically releases on drop
pub struct FileLock {
    #[allow(dead_code)]
    file: File,
    #[cfg(unix)]
    fd: i32,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            unsafe {
                libc::flock(self.fd, libc::LOCK_UN);
            }
        }
    }
}

/// Acquire an exclusive lock on a file with exponential backoff.
///
/// Attempts: no wait, then 50ms, 100ms, 200ms, 400ms, 800ms. Returns a
/// [`FileLock`] guard that releases on drop, or `CrewError::LockTimeout`
/// if every attempt finds the lock held.
pub fn acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, CrewError> {
    #[cfg(unix)]
    {
        unix_acquire_lock(path, max_retries)
    }

    #[cfg(not(unix))]
    {
        fallback_acquire_lock(path, max_retries)
    }
}

#[cfg(unix)]
fn unix_acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, CrewError> {
    use std::fs::OpenOptions;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| CrewError::io(path, e))?;

    let fd = file.as_raw_fd();

    for attempt in 0..=max_retries {
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };

        if result == 0 {
            return Ok(FileLock { file, fd });
        }

        let err = std::io::Error::last_os_error();
        let would_block = err.raw_os_error() == Some(libc::EWOULDBLOCK)
            || err.raw_os_error() == Some(libc::EAGAIN);

        if !would_block {
            return Err(CrewError::io(path, err));
        }

        if attempt < max_retries {
            let wait_ms = 50u64 * (1 << attempt);
            std::thread::sleep(Duration::from_millis(wait_ms));
        }
    }

    Err(CrewError::LockTimeout {
        path: path.to_path_buf(),
        retries: max_retries,
    })
}

#[cfg(not(unix))]
fn fallback_acquire_lock(path: &Path, max_retries: u32) -> Result<FileLock, CrewError> {
    use std::fs::OpenOptions;

    // No flock on this platform; use exclusive file creation as the lock.
    let marker = path.with_extension("held");
    for attempt in 0..=max_retries {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&marker)
        {
            Ok(file) => return Ok(FileLock { file }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if attempt < max_retries {
                    let wait_ms = 50u64 * (1 << attempt);
                    std::thread::sleep(Duration::from_millis(wait_ms));
                }
            }
            Err(e) => return Err(CrewError::io(path, e)),
        }
    }

    Err(CrewError::LockTimeout {
        path: path.to_path_buf(),
        retries: max_retries,
    })
}
