//! A synchronous in-memory pipe for streaming rendered output from a
//! producer thread to a reader.

use std::io::{self, Read, Write};
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

/// Number of chunks that may be in flight before the writer blocks.
const PIPE_DEPTH: usize = 4;

/// Bytes buffered by the writer before a chunk is sent.
const CHUNK_SIZE: usize = 8 * 1024;

enum Message {
    Data(Vec<u8>),
    Failed(io::Error),
}

/// Creates a connected reader and writer.
///
/// Dropping the writer closes the pipe; the reader sees end of file after
/// draining what was written. Dropping the reader causes further writes to
/// fail with [`io::ErrorKind::BrokenPipe`].
pub fn pipe() -> (PipeReader, PipeWriter) {
    let (tx, rx) = sync_channel(PIPE_DEPTH);
    let closed = Arc::new(AtomicBool::new(false));
    let reader = PipeReader {
        rx,
        closed: Arc::clone(&closed),
        chunk: Vec::new(),
        pos: 0,
        failed: None,
    };
    let writer = PipeWriter {
        tx,
        closed,
        buf: Vec::with_capacity(CHUNK_SIZE),
    };
    (reader, writer)
}

pub struct PipeReader {
    rx: Receiver<Message>,
    closed: Arc<AtomicBool>,
    chunk: Vec<u8>,
    pos: usize,
    /// Set once the writer closed with an error; repeated on every read.
    failed: Option<(io::ErrorKind, String)>,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.chunk.len() {
                let n = out.len().min(self.chunk.len() - self.pos);
                out[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if let Some((kind, msg)) = &self.failed {
                return Err(io::Error::new(*kind, msg.clone()));
            }
            if out.is_empty() {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Message::Data(data)) => {
                    self.chunk = data;
                    self.pos = 0;
                }
                Ok(Message::Failed(err)) => {
                    self.failed = Some((err.kind(), err.to_string()));
                    return Err(err);
                }
                // Writer is gone.
                Err(_) => return Ok(0),
            }
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "fragment reader closed")
}

pub struct PipeWriter {
    tx: SyncSender<Message>,
    /// Set when the reader is dropped, so buffered writes fail right away.
    closed: Arc<AtomicBool>,
    buf: Vec<u8>,
}

impl PipeWriter {
    /// Closes the pipe, delivering `err` to the reader after any data that
    /// was already written.
    pub fn close_with_error(mut self, err: io::Error) {
        if self.send_buffered().is_ok() {
            let _ = self.tx.send(Message::Failed(err));
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            self.buf.clear();
            return Err(broken_pipe());
        }
        if self.buf.is_empty() {
            return Ok(());
        }
        let data = mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
        self.tx.send(Message::Data(data)).map_err(|_| broken_pipe())
    }
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.closed.load(Ordering::Acquire) {
            self.buf.clear();
            return Err(broken_pipe());
        }
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        let _ = self.send_buffered();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_after_reader_dropped_fails() {
        let (reader, mut writer) = pipe();
        assert_eq!(writer.write(b"early").unwrap(), 5);
        drop(reader);
        let err = writer.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(writer.flush().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn small_writes_reach_reader() {
        let (mut reader, mut writer) = pipe();
        writer.write_all(b"one ").unwrap();
        writer.write_all(b"two").unwrap();
        drop(writer);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "one two");
    }

    #[test]
    fn error_follows_written_data() {
        let (mut reader, mut writer) = pipe();
        writer.write_all(b"partial").unwrap();
        writer.close_with_error(io::Error::other("render failed"));
        let mut out = [0u8; 16];
        assert_eq!(reader.read(&mut out).unwrap(), 7);
        assert_eq!(&out[..7], b"partial");
        let err = reader.read(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "render failed");
        assert!(reader.read(&mut out).is_err());
    }
}
