//! Streaming gzip decompression into text lines
//!
//! [`LineReader`] is the blocking building block: a fused iterator over the
//! lines of a gzip file. [`LineStream`] runs a `LineReader` on the blocking
//! thread pool and hands lines to async code through a bounded channel, so a
//! long decompression never stalls the runtime.
//!
//! Both are single-pass. Once the end of the stream (or a decompression
//! error) has been reported they only ever return `None`.

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Lines buffered between the decompression thread and the consumer
const LINE_BUFFER: usize = 64;

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Blocking line iterator over a (possibly multi-member) gzip stream
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    done: bool,
}

impl LineReader<BufReader<MultiGzDecoder<File>>> {
    /// Open a gzip file on disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(
            READ_BUFFER_BYTES,
            MultiGzDecoder::new(file),
        )))
    }
}

impl<R: BufRead> LineReader<R> {
    /// Wrap an already decompressing reader
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            },
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            },
            Err(e) => {
                self.done = true;
                Some(Err(IngestError::CorruptArtifact(e.to_string())))
            },
        }
    }
}

impl<R: BufRead> FusedIterator for LineReader<R> {}

/// Async, single-pass sequence of lines from a local gzip artifact
///
/// Dropping the stream stops the decompression thread at its next line.
pub struct LineStream {
    rx: mpsc::Receiver<Result<String>>,
    finished: bool,
}

impl LineStream {
    /// Start decompressing `path` in the background
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel(LINE_BUFFER);

        tokio::task::spawn_blocking(move || {
            let reader = match LineReader::open(&path) {
                Ok(reader) => reader,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    return;
                },
            };

            let mut sent: u64 = 0;
            for line in reader {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() {
                    debug!(lines = sent, "Line consumer went away, stopping decompression");
                    return;
                }
                if failed {
                    warn!(path = %path.display(), lines = sent, "Decompression stopped on error");
                    return;
                }
                sent += 1;
            }
            debug!(lines = sent, "Decompression reached end of stream");
        });

        Self {
            rx,
            finished: false,
        }
    }

    /// Next line, `Some(Err(CorruptArtifact))` on a decompression failure,
    /// `None` once the stream is exhausted
    pub async fn next_line(&mut self) -> Option<Result<String>> {
        if self.finished {
            return None;
        }

        match self.rx.recv().await {
            Some(Ok(line)) => Some(Ok(line)),
            Some(Err(e)) => {
                self.finished = true;
                self.rx.close();
                Some(Err(e))
            },
            None => {
                self.finished = true;
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    fn gzip(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    fn reader(bytes: Vec<u8>) -> LineReader<BufReader<MultiGzDecoder<Cursor<Vec<u8>>>>> {
        LineReader::new(BufReader::new(MultiGzDecoder::new(Cursor::new(bytes))))
    }

    #[test]
    fn test_lines_have_terminators_stripped() {
        let lines: Vec<String> = reader(gzip(b"{\"code\":\"1\"}\r\n{\"code\":\"2\"}\n{\"code\":\"3\"}"))
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec![r#"{"code":"1"}"#, r#"{"code":"2"}"#, r#"{"code":"3"}"#]);
    }

    #[test]
    fn test_reader_is_fused_after_end() {
        let mut lines = reader(gzip(b"only\n"));
        assert_eq!(lines.next().unwrap().unwrap(), "only");
        assert!(lines.next().is_none());
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_concatenated_gzip_members() {
        let mut bytes = gzip(b"first\n");
        bytes.extend(gzip(b"second\n"));
        let lines: Vec<String> = reader(bytes).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_not_gzip_is_corrupt_artifact() {
        let mut lines = reader(b"plain text, not gzip\n".to_vec());
        assert!(matches!(lines.next(), Some(Err(IngestError::CorruptArtifact(_)))));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_truncated_stream_ends_with_error() {
        let content: String = (0..2000)
            .map(|i| format!("{{\"code\":\"{:013}\",\"name\":\"product {}\"}}\n", i, i))
            .collect();
        let mut bytes = gzip(content.as_bytes());
        bytes.truncate(bytes.len() / 2);

        let results: Vec<Result<String>> = reader(bytes).collect();
        assert!(matches!(results.last(), Some(Err(IngestError::CorruptArtifact(_)))));
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let lines: Vec<String> = reader(gzip(b"caf\xe9\nok\n")).map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "ok");
    }

    #[tokio::test]
    async fn test_line_stream_reads_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json.gz");
        std::fs::write(&path, gzip(b"a\nb\n")).unwrap();

        let mut stream = LineStream::open(&path);
        assert_eq!(stream.next_line().await.unwrap().unwrap(), "a");
        assert_eq!(stream.next_line().await.unwrap().unwrap(), "b");
        assert!(stream.next_line().await.is_none());
        assert!(stream.next_line().await.is_none());
    }

    #[tokio::test]
    async fn test_line_stream_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = LineStream::open(dir.path().join("absent.gz"));
        assert!(matches!(stream.next_line().await, Some(Err(IngestError::Io(_)))));
        assert!(stream.next_line().await.is_none());
    }
}
