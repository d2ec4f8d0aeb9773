use std::time::Instant;

use bytes::Bytes;
use futures_util::StreamExt;
use tracing::debug;
use trove_fs::StagingFile;

use crate::core::{admit, below_minimum};
use crate::data::{FetchOptions, FetchPhase, Progress};
use crate::diagnostics::{DiagnosticSink, Notice};
use crate::effects::http::BoxStream;
use crate::error::Result;

/// What [`drain`] staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrainOutcome {
    pub bytes_written: u64,
    /// The last chunk polled carried bytes past the ceiling, which were dropped.
    pub truncated:     bool,
}

/// Everything [`drain`] reports to besides the staging file.
pub(crate) struct DrainContext<'a> {
    pub url:             &'a str,
    pub options:         &'a FetchOptions,
    pub sink:            &'a dyn DiagnosticSink,
    pub declared_length: Option<u64>,
}

/// Copy `body` into `staging` until EOF or until `required_length` bytes are staged.
///
/// The ceiling is enforced before each write and the stream is not polled
/// once it is reached, so `staging` never holds more than `required_length`
/// bytes and an endless body is cut off. Writes are split into pieces of at
/// most `chunk_size` bytes. The stream is dropped on return, which closes
/// the connection.
pub(crate) async fn drain(
    mut body: BoxStream<'_, Result<Bytes>>,
    required_length: u64,
    staging: &mut StagingFile,
    ctx: &DrainContext<'_>,
) -> Result<DrainOutcome> {
    let chunk_size = ctx.options.chunk_size.max(1);
    let started = Instant::now();
    let mut slow_reported = false;
    let mut truncated = false;

    while staging.bytes_written() < required_length {
        let Some(chunk) = body.next().await else {
            debug!("{}: end of body after {} bytes", ctx.url, staging.bytes_written());
            break;
        };
        let chunk = chunk?;

        let admitted = admit(chunk.len(), staging.bytes_written(), required_length);
        if admitted < chunk.len() {
            debug!(
                "{}: ceiling of {required_length} bytes reached, dropping {} bytes",
                ctx.url,
                chunk.len() - admitted
            );
            truncated = true;
        }
        for piece in chunk[..admitted].chunks(chunk_size) {
            staging.write(piece).await?;
        }

        ctx.options.report(Progress {
            phase:           FetchPhase::Downloading,
            bytes_staged:    staging.bytes_written(),
            required_length,
            declared_length: ctx.declared_length,
        });

        if slow_reported {
            continue;
        }
        let slow = ctx.options.min_average_speed.and_then(|minimum| {
            below_minimum(
                staging.bytes_written(),
                started.elapsed(),
                ctx.options.slow_start_grace,
                minimum,
            )
        });
        if let Some(average_bps) = slow {
            ctx.sink.notice(Notice::SlowRetrieval {
                url: ctx.url.to_string(),
                received: staging.bytes_written(),
                average_bps,
            });
            slow_reported = true;
        }
    }

    Ok(DrainOutcome {
        bytes_written: staging.bytes_written(),
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Poll;
    use std::time::Duration;

    use futures_util::stream;

    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::error::FetchError;

    fn body(chunks: &[&'static [u8]]) -> BoxStream<'static, Result<Bytes>> {
        let chunks: Vec<Result<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from_static(*c))).collect();
        Box::pin(stream::iter(chunks))
    }

    fn context<'a>(options: &'a FetchOptions, sink: &'a RecordingSink) -> DrainContext<'a> {
        DrainContext {
            url: "http://mirror.example/a",
            options,
            sink,
            declared_length: None,
        }
    }

    async fn staged(staging: StagingFile) -> Vec<u8> {
        staging.seal().await.unwrap().read_all().await.unwrap()
    }

    #[tokio::test]
    async fn test_drains_until_eof() {
        let options = FetchOptions::default();
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();

        let outcome = drain(body(&[b"hello ", b"world"]), 100, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(outcome, DrainOutcome {
            bytes_written: 11,
            truncated:     false,
        });
        assert_eq!(staged(staging).await, b"hello world");
    }

    #[tokio::test]
    async fn test_truncates_at_ceiling() {
        let options = FetchOptions::default();
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();

        let outcome = drain(body(&[b"0123", b"456789"]), 6, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(outcome.bytes_written, 6);
        assert!(outcome.truncated);
        assert_eq!(staged(staging).await, b"012345");
    }

    #[tokio::test]
    async fn test_endless_body_is_cut_off() {
        let options = FetchOptions::default();
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();
        let endless: BoxStream<'static, Result<Bytes>> =
            Box::pin(stream::repeat_with(|| Ok(Bytes::from_static(&[0x5a; 1000]))));

        let outcome = drain(endless, 64 * 1024 + 1, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(outcome.bytes_written, 64 * 1024 + 1);
        assert_eq!(staging.bytes_written(), 64 * 1024 + 1);
    }

    #[tokio::test]
    async fn test_zero_length_never_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let counted: BoxStream<'static, Result<Bytes>> = Box::pin(stream::poll_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Poll::Ready(Some(Ok(Bytes::from_static(b"never"))))
        }));

        let options = FetchOptions::default();
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();
        let outcome = drain(counted, 0, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(outcome.bytes_written, 0);
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stops_polling_once_full() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let counted: BoxStream<'static, Result<Bytes>> = Box::pin(stream::poll_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Poll::Ready(Some(Ok(Bytes::from_static(b"abcd"))))
        }));

        let options = FetchOptions::default();
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();
        drain(counted, 8, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_small_chunk_size() {
        let options = FetchOptions::default().chunk_size(3);
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();

        drain(body(&[b"abcdefghij"]), 10, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(staged(staging).await, b"abcdefghij");
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let failing: BoxStream<'static, Result<Bytes>> = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(FetchError::Timeout {
                url: "http://mirror.example/a".into(),
            }),
        ]));

        let options = FetchOptions::default();
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();
        let err = drain(failing, 100, &mut staging, &context(&options, &sink))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
        assert_eq!(staging.bytes_written(), 7);
    }

    #[tokio::test]
    async fn test_progress_reported_per_chunk() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let options = FetchOptions::default().on_progress(move |progress| {
            record.lock().unwrap().push(progress.bytes_staged);
        });
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();

        drain(body(&[b"ab", b"cd", b"ef"]), 5, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![2, 4, 5]);
    }

    #[tokio::test]
    async fn test_slow_retrieval_reported_once() {
        let options = FetchOptions::default()
            .min_average_speed(Some(u64::MAX))
            .slow_start_grace(Duration::ZERO);
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();

        let outcome = drain(body(&[b"slow", b"er"]), 6, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert_eq!(outcome.bytes_written, 6);
        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0], Notice::SlowRetrieval { received: 4, .. }));
    }

    #[tokio::test]
    async fn test_no_speed_check_by_default() {
        let options = FetchOptions::default();
        let sink = RecordingSink::new();
        let mut staging = StagingFile::create().unwrap();

        drain(body(&[b"fast"]), 4, &mut staging, &context(&options, &sink))
            .await
            .unwrap();

        assert!(sink.is_empty());
    }
}
