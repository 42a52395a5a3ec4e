use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, IoSlice, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::poller::{ChannelPoller, PollOutcome, DEFAULT_CHUNK_SIZE};

/// Default permission mode for created FIFO nodes (subject to the umask).
pub const DEFAULT_FIFO_MODE: u32 = 0o600;

/// Create a FIFO node at `path`.
///
/// An existing FIFO at `path` is reused. Any other existing file type is
/// rejected with [`TransportError::NotAFifo`] and left untouched.
pub fn create_fifo(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| TransportError::Create {
        path: path.to_path_buf(),
        source: std::io::Error::new(ErrorKind::InvalidInput, e),
    })?;

    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
    if rc == 0 {
        info!(?path, mode, "created fifo");
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.kind() != ErrorKind::AlreadyExists {
        return Err(TransportError::Create {
            path: path.to_path_buf(),
            source: err,
        });
    }

    let metadata = std::fs::metadata(path).map_err(|e| TransportError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.file_type().is_fifo() {
        return Err(TransportError::NotAFifo {
            path: path.to_path_buf(),
        });
    }

    debug!(?path, "reusing existing fifo");
    Ok(())
}

/// Inbound end of a FIFO, opened for non-blocking reads.
///
/// Opening never waits for a writer. Each [`poll`](ChannelPoller::poll) does a
/// zero-timeout readiness check followed by at most one read of
/// `chunk_size` bytes.
pub struct FifoReader {
    file: File,
    path: PathBuf,
    chunk: Vec<u8>,
}

impl FifoReader {
    /// Open `path` for non-blocking reads with the default chunk size.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_chunk_size(path, DEFAULT_CHUNK_SIZE)
    }

    /// Open `path` for non-blocking reads, reading at most `chunk_size` bytes per poll.
    pub fn with_chunk_size(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_nonblocking(&path)?;
        debug!(?path, chunk_size, "opened inbound fifo");
        Ok(Self {
            file,
            path,
            chunk: vec![0u8; chunk_size.max(1)],
        })
    }

    /// The path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maximum number of bytes returned by a single poll.
    pub fn chunk_size(&self) -> usize {
        self.chunk.len()
    }

    /// Zero-timeout readiness check.
    ///
    /// Hang-up and error conditions count as ready so the following read can
    /// report them.
    pub fn is_ready(&self) -> Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: `fds` is a single valid pollfd and the descriptor is owned by `self.file`.
            let rc = unsafe { libc::poll(&mut fds, 1, 0) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(TransportError::Poll(err));
            }
            if fds.revents & libc::POLLNVAL != 0 {
                return Err(TransportError::Poll(std::io::Error::from_raw_os_error(
                    libc::EBADF,
                )));
            }
            return Ok(rc > 0 && fds.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0);
        }
    }
}

impl ChannelPoller for FifoReader {
    fn poll(&mut self) -> Result<PollOutcome> {
        if !self.is_ready()? {
            return Ok(PollOutcome::NotReady);
        }

        loop {
            match self.file.read(&mut self.chunk) {
                Ok(0) => {
                    debug!(path = ?self.path, "writer closed fifo");
                    return Ok(PollOutcome::Closed);
                }
                Ok(n) => {
                    trace!(path = ?self.path, bytes = n, "read chunk");
                    return Ok(PollOutcome::Ready(Bytes::copy_from_slice(&self.chunk[..n])));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(PollOutcome::NotReady),
                Err(err) => return Err(TransportError::Read(err)),
            }
        }
    }

    fn reopen(&mut self) -> Result<()> {
        // The old descriptor is closed when it is replaced.
        self.file = open_nonblocking(&self.path)?;
        debug!(path = ?self.path, "reopened inbound fifo");
        Ok(())
    }
}

impl std::fmt::Debug for FifoReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoReader")
            .field("path", &self.path)
            .field("chunk_size", &self.chunk.len())
            .finish()
    }
}

/// Outbound end of a FIFO, opened for blocking writes.
#[derive(Debug)]
pub struct FifoWriter {
    file: File,
    path: PathBuf,
}

impl FifoWriter {
    /// Open `path` for writing.
    ///
    /// Blocks until a reader has the other end open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;
        debug!(?path, "opened outbound fifo");
        Ok(Self { file, path })
    }

    /// The path this writer was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for FifoWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
        self.file.write_vectored(bufs)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn open_nonblocking(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|e| TransportError::Open {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fifoframe-transport-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn create_fifo_is_idempotent() {
        let dir = unique_temp_dir("create");
        let path = dir.join("in.fifo");

        create_fifo(&path, DEFAULT_FIFO_MODE).unwrap();
        create_fifo(&path, DEFAULT_FIFO_MODE).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.file_type().is_fifo());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_fifo_rejects_regular_file() {
        let dir = unique_temp_dir("not-fifo");
        let path = dir.join("plain.txt");
        std::fs::write(&path, b"keep me").unwrap();

        let err = create_fifo(&path, DEFAULT_FIFO_MODE).unwrap_err();
        assert!(matches!(err, TransportError::NotAFifo { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn open_missing_path_fails() {
        let dir = unique_temp_dir("missing");
        let err = FifoReader::open(dir.join("nope.fifo")).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn poll_without_writer_is_not_ready() {
        let dir = unique_temp_dir("idle");
        let path = dir.join("in.fifo");
        create_fifo(&path, DEFAULT_FIFO_MODE).unwrap();

        let mut reader = FifoReader::open(&path).unwrap();
        assert_eq!(reader.poll().unwrap(), PollOutcome::NotReady);
        assert_eq!(reader.poll().unwrap(), PollOutcome::NotReady);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn poll_reads_bounded_chunks_then_reports_close() {
        let dir = unique_temp_dir("chunks");
        let path = dir.join("in.fifo");
        create_fifo(&path, DEFAULT_FIFO_MODE).unwrap();

        let mut reader = FifoReader::with_chunk_size(&path, 4).unwrap();
        let mut writer = FifoWriter::open(&path).unwrap();
        assert_eq!(reader.poll().unwrap(), PollOutcome::NotReady);

        writer.write_all(b"0123456789").unwrap();
        drop(writer);

        let mut received = Vec::new();
        loop {
            match reader.poll().unwrap() {
                PollOutcome::Ready(chunk) => {
                    assert!(chunk.len() <= 4);
                    received.extend_from_slice(&chunk);
                }
                PollOutcome::Closed => break,
                PollOutcome::NotReady => panic!("data and hang-up should already be pending"),
            }
        }
        assert_eq!(received, b"0123456789");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reopen_clears_hang_up() {
        let dir = unique_temp_dir("reopen");
        let path = dir.join("in.fifo");
        create_fifo(&path, DEFAULT_FIFO_MODE).unwrap();

        let mut reader = FifoReader::open(&path).unwrap();
        drop(FifoWriter::open(&path).unwrap());

        assert!(reader.poll().unwrap().is_closed());
        reader.reopen().unwrap();
        assert_eq!(reader.poll().unwrap(), PollOutcome::NotReady);

        let mut writer = FifoWriter::open(&path).unwrap();
        writer
            .write_vectored(&[IoSlice::new(b"ab"), IoSlice::new(b"cd")])
            .unwrap();
        assert_eq!(
            reader.poll().unwrap(),
            PollOutcome::Ready(Bytes::from_static(b"abcd"))
        );
        let _ = std::fs::remove_dir_all(&dir);
    }
}
