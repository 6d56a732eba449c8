//! Console producer and consumer at the edges of the pipeline.
//!
//! The producer turns text lines into items; the consumer prints every item
//! that leaves the pipeline. Both are generic over their streams so they run
//! against in-memory buffers in tests.

use crate::error::{PipelineError, Result};
use crate::observer::{PipelineEvent, PipelineObserver};
use crate::shutdown::ShutdownSignal;
use crate::Item;
use crossbeam::channel::{select, Receiver, Sender};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub const START_MESSAGE: &str = "Программа запущена. Начинайте вводить целые числа:";
pub const INVALID_INPUT_MESSAGE: &str = "Некорректный ввод. Введите целое число:";
pub const INPUT_FINISHED_MESSAGE: &str = "Ввод завершен.";
pub const OUTPUT_HEADER: &str = "Обработанные данные:";
pub const FAREWELL_MESSAGE: &str = "Программа завершена по запросу пользователя.";

/// Parse one input line into an item, ignoring surrounding whitespace
pub fn parse_line(line: &str) -> Option<Item> {
    line.trim().parse().ok()
}

/// What the producer did before it stopped
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProducerSummary {
    /// Lines parsed and handed to the pipeline
    pub accepted: usize,
    /// Lines rejected as malformed
    pub invalid: usize,
    /// Whether the loop ended because of shutdown rather than end of input
    pub interrupted: bool,
}

/// Read lines from `reader` and send every integer into `input`.
///
/// Malformed lines, including ones that are not valid UTF-8, get a
/// diagnostic on `prompt` and are skipped. The loop
/// ends at end of input, when the pipeline stops accepting items, or once
/// `shutdown` has fired; `input` is dropped, closing the queue, on return.
pub fn run_producer<R, W>(
    reader: R,
    mut prompt: W,
    input: Sender<Item>,
    shutdown: &ShutdownSignal,
    observer: &dyn PipelineObserver,
) -> Result<ProducerSummary>
where
    R: BufRead,
    W: Write,
{
    let listener = shutdown.listener();
    let mut summary = ProducerSummary::default();

    for raw in reader.split(b'\n') {
        if shutdown.is_triggered() {
            summary.interrupted = true;
            break;
        }
        // Bytes that are not UTF-8 make the line malformed, not the stream.
        let raw = raw?;
        let line = String::from_utf8_lossy(&raw);

        let Some(value) = parse_line(&line) else {
            observer.on_event(&PipelineEvent::InvalidInput {
                line: line.trim().to_string(),
            });
            summary.invalid += 1;
            writeln!(prompt, "{INVALID_INPUT_MESSAGE}")?;
            continue;
        };

        observer.on_event(&PipelineEvent::InputParsed { value });
        let delivered = select! {
            send(input, value) -> res => res.is_ok(),
            recv(listener) -> _ => false,
        };
        if !delivered {
            summary.interrupted = true;
            break;
        }
        summary.accepted += 1;
    }

    if !summary.interrupted {
        writeln!(prompt, "{INPUT_FINISHED_MESSAGE}")?;
        observer.on_event(&PipelineEvent::InputExhausted);
    }
    Ok(summary)
}

/// Run [`run_producer`] on its own thread
pub fn spawn_producer<R, W>(
    reader: R,
    prompt: W,
    input: Sender<Item>,
    shutdown: ShutdownSignal,
    observer: Arc<dyn PipelineObserver>,
) -> Result<JoinHandle<Result<ProducerSummary>>>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    thread::Builder::new()
        .name("producer".into())
        .spawn(move || {
            let result = run_producer(reader, prompt, input, &shutdown, observer.as_ref());
            if let Err(e) = &result {
                tracing::error!(error = %e, "producer stopped");
            }
            result
        })
        .map_err(|e| PipelineError::ThreadError(e.to_string()))
}

/// Write one pipeline result line
pub fn write_item<W: Write>(out: &mut W, value: Item) -> std::io::Result<()> {
    writeln!(out, "Получены данные: {value}")
}

/// Print `value` and report the delivery
pub fn deliver<W: Write>(out: &mut W, value: Item, observer: &dyn PipelineObserver) -> Result<()> {
    write_item(out, value)?;
    observer.on_event(&PipelineEvent::ItemDelivered { value });
    Ok(())
}

/// Print pipeline output until shutdown fires or the output queue closes.
///
/// Returns the number of items printed.
pub fn run_consumer<W: Write>(
    output: &Receiver<Item>,
    shutdown: &ShutdownSignal,
    mut out: W,
    observer: &dyn PipelineObserver,
) -> Result<usize> {
    let listener = shutdown.listener();
    let mut delivered = 0;

    loop {
        select! {
            recv(output) -> msg => match msg {
                Ok(value) => {
                    deliver(&mut out, value, observer)?;
                    delivered += 1;
                }
                Err(_) => break,
            },
            recv(listener) -> _ => break,
        }
    }
    out.flush()?;
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use crossbeam::channel;
    use std::io::Cursor;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("  42 \n"), Some(42));
        assert_eq!(parse_line("-7"), Some(-7));
        assert_eq!(parse_line("+3"), Some(3));
        assert_eq!(parse_line("abc"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("1.5"), None);
    }

    #[test]
    fn test_producer_skips_malformed_lines() {
        let (tx, rx) = channel::unbounded();
        let shutdown = ShutdownSignal::new();
        let recorder = RecordingObserver::new();
        let mut prompt = Vec::new();

        let summary = run_producer(
            Cursor::new("-3\n0\nabc\n 6 \n9\n15\n"),
            &mut prompt,
            tx,
            &shutdown,
            &recorder,
        )
        .unwrap();

        assert_eq!(
            summary,
            ProducerSummary {
                accepted: 5,
                invalid: 1,
                interrupted: false
            }
        );
        // The producer dropped its sender, so the queue is closed.
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![-3, 0, 6, 9, 15]);

        let prompt = String::from_utf8(prompt).unwrap();
        assert_eq!(prompt.matches(INVALID_INPUT_MESSAGE).count(), 1);
        assert!(prompt.ends_with(&format!("{INPUT_FINISHED_MESSAGE}\n")));
        assert!(recorder
            .events()
            .contains(&PipelineEvent::InvalidInput { line: "abc".into() }));
    }

    #[test]
    fn test_producer_recovers_from_invalid_utf8() {
        let (tx, rx) = channel::unbounded();
        let recorder = RecordingObserver::new();
        let mut prompt = Vec::new();

        let summary = run_producer(
            Cursor::new(b"3\n\xff\xfe\n6\n9\n".to_vec()),
            &mut prompt,
            tx,
            &ShutdownSignal::new(),
            &recorder,
        )
        .unwrap();

        assert_eq!(
            summary,
            ProducerSummary {
                accepted: 3,
                invalid: 1,
                interrupted: false
            }
        );
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![3, 6, 9]);

        let prompt = String::from_utf8(prompt).unwrap();
        assert_eq!(prompt.matches(INVALID_INPUT_MESSAGE).count(), 1);
        assert!(prompt.ends_with(&format!("{INPUT_FINISHED_MESSAGE}\n")));
        assert_eq!(
            recorder.count(|e| matches!(e, PipelineEvent::InvalidInput { .. })),
            1
        );
    }

    #[test]
    fn test_producer_handles_crlf_lines() {
        let (tx, rx) = channel::unbounded();
        let summary = run_producer(
            Cursor::new("6\r\n-1\r\n9"),
            Vec::new(),
            tx,
            &ShutdownSignal::new(),
            &RecordingObserver::new(),
        )
        .unwrap();
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.invalid, 0);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![6, -1, 9]);
    }

    #[test]
    fn test_producer_stops_after_shutdown() {
        let (tx, rx) = channel::bounded(0);
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let summary = run_producer(
            Cursor::new("1\n2\n"),
            Vec::new(),
            tx,
            &shutdown,
            &RecordingObserver::new(),
        )
        .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.accepted, 0);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_producer_stops_when_pipeline_gone() {
        let (tx, rx) = channel::bounded(0);
        drop(rx);
        let summary = run_producer(
            Cursor::new("1\n2\n"),
            Vec::new(),
            tx,
            &ShutdownSignal::new(),
            &RecordingObserver::new(),
        )
        .unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.accepted, 0);
    }

    #[test]
    fn test_write_item_format() {
        let mut out = Vec::new();
        write_item(&mut out, 15).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Получены данные: 15\n");
    }

    #[test]
    fn test_consumer_prints_until_output_closes() {
        let (tx, rx) = channel::unbounded();
        for value in [6, 9, 15] {
            tx.send(value).unwrap();
        }
        drop(tx);

        let recorder = RecordingObserver::new();
        let mut out = Vec::new();
        let delivered = run_consumer(&rx, &ShutdownSignal::new(), &mut out, &recorder).unwrap();

        assert_eq!(delivered, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Получены данные: 6\nПолучены данные: 9\nПолучены данные: 15\n"
        );
        assert_eq!(
            recorder.count(|e| matches!(e, PipelineEvent::ItemDelivered { .. })),
            3
        );
    }

    #[test]
    fn test_consumer_returns_on_shutdown() {
        let (_tx, rx) = channel::bounded::<Item>(0);
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let delivered =
            run_consumer(&rx, &shutdown, Vec::new(), &RecordingObserver::new()).unwrap();
        assert_eq!(delivered, 0);
    }
}
