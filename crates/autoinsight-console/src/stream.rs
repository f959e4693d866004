//! Incremental consumer for `data: <json>` line streams.
//!
//! Response bodies arrive as arbitrary byte chunks. [`FrameDecoder`] buffers
//! them until full lines are available and [`event_stream`] turns the decoded
//! frames into classified [`StreamEvent`]s, lazily, one chunk at a time.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::event::{StreamEvent, parse_frame};

/// Prefix that marks a frame line.
pub const FRAME_PREFIX: &str = "data: ";
/// Frame body that terminates the stream.
pub const TERMINATOR: &str = "[DONE]";

/// Boxed stream of classified events, as handed to the renderer.
pub type EventStream = Pin<Box<dyn futures::Stream<Item = StreamEvent> + Send + 'static>>;

/// One meaningful line of a streamed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text after the `data: ` prefix.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Splits a chunked byte body into frames.
///
/// Bytes are kept until a newline arrives, so chunk boundaries may fall
/// anywhere, including inside a multi-byte UTF-8 sequence.
#[derive(Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    /// Feeds one chunk and returns the frames completed by it.
    ///
    /// After a [`Frame::Done`] is returned the decoder drops all further input.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.finished {
            return Vec::new();
        }
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while !self.finished {
            let Some(idx) = self.buf.iter().position(|b| *b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buf.drain(..=idx).collect();
            if let Some(frame) = self.take_line(&line[..idx]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.finished || self.buf.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        self.take_line(&line)
    }

    /// True once the terminator has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn take_line(&mut self, raw: &[u8]) -> Option<Frame> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim_end_matches('\r');
        if line.trim().is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix(FRAME_PREFIX) else {
            debug!(
                event = "stream.line_skipped",
                domain = "stream",
                line_bytes = line.len() as u64,
                "non-frame line ignored"
            );
            return None;
        };
        if rest.trim() == TERMINATOR {
            self.finished = true;
            self.buf.clear();
            return Some(Frame::Done);
        }
        Some(Frame::Data(rest.to_string()))
    }
}

struct ConsumerState<S> {
    body: Pin<Box<S>>,
    decoder: FrameDecoder,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

impl<S> ConsumerState<S> {
    fn enqueue(&mut self, frames: impl IntoIterator<Item = Frame>) {
        for frame in frames {
            match frame {
                Frame::Done => {
                    self.done = true;
                    return;
                }
                Frame::Data(text) => match parse_frame(&text) {
                    Ok(Some(event)) => self.pending.push_back(event),
                    Ok(None) => {}
                    Err(err) => warn!(
                        event = "stream.frame_malformed",
                        domain = "stream",
                        error = %err,
                        frame_bytes = text.len() as u64,
                        "skipping malformed frame"
                    ),
                },
            }
        }
    }
}

/// Turns a response body into a lazy sequence of classified events.
///
/// * malformed frames are logged and skipped,
/// * the terminator ends the sequence even when more input follows,
/// * a read error yields one synthetic error event and ends the sequence.
pub fn event_stream<S, E>(body: S) -> impl futures::Stream<Item = StreamEvent> + Send + 'static
where
    S: futures::Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    stream::unfold(
        ConsumerState {
            body: Box::pin(body),
            decoder: FrameDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Some((event, state));
                }
                if state.done {
                    return None;
                }

                match state.body.next().await {
                    Some(Ok(chunk)) => {
                        let frames = state.decoder.push_chunk(&chunk);
                        state.enqueue(frames);
                    }
                    Some(Err(e)) => {
                        warn!(
                            event = "stream.read_failed",
                            domain = "stream",
                            error = %e,
                            "response stream read failed"
                        );
                        state.pending.push_back(StreamEvent::read_failure());
                        state.done = true;
                    }
                    None => {
                        let tail = state.decoder.finish();
                        state.enqueue(tail);
                        state.done = true;
                    }
                }
            }
        },
    )
}
