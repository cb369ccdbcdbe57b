use std::pin::pin;

use bytes::Bytes;
use futures::{Stream, StreamExt as _};
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{CHAT_STREAM_PATH, ClientConfig};
use crate::errors::ClientError;
use crate::event::{EventKind, RawEvent};
use crate::model::{SessionId, StreamRequest};
use crate::sse::SseDecoder;

/// An open event stream that can be shut down.
pub trait Connection: Send {
    /// Stops delivery. Called at most once per connection.
    fn close(&mut self);
}

/// Opens one event stream per session.
pub trait Transport {
    fn open(
        &mut self,
        session: SessionId,
        request: &StreamRequest,
    ) -> Result<Box<dyn Connection>, ClientError>;
}

/// A frame tagged with the session whose connection produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: RawEvent,
}

/// HTTP server-sent-events transport.
///
/// Each `open` spawns a task that reads the response body, splits it into
/// frames and pushes them, tagged with their session, into one bounded
/// channel. The caller drains that channel from its own loop and hands each
/// frame to [`ChatController::dispatch`](crate::ChatController::dispatch), so
/// state is only ever mutated from that loop.
pub struct SseTransport {
    http: reqwest::Client,
    stream_url: String,
    tx: mpsc::Sender<SessionEvent>,
}

impl SseTransport {
    /// Builds the transport and the receiver the caller must drain.
    pub fn new(config: &ClientConfig) -> Result<(Self, mpsc::Receiver<SessionEvent>), ClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        let (tx, rx) = mpsc::channel(config.stream_buffer_capacity);
        Ok((
            Self {
                http,
                stream_url: config.endpoint(CHAT_STREAM_PATH),
                tx,
            },
            rx,
        ))
    }
}

impl Transport for SseTransport {
    fn open(
        &mut self,
        session: SessionId,
        request: &StreamRequest,
    ) -> Result<Box<dyn Connection>, ClientError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| ClientError::Transport(format!("no async runtime: {err}")))?;
        let builder = self
            .http
            .get(&self.stream_url)
            .query(&request.query_pairs())
            .header(ACCEPT, "text/event-stream");
        debug!(session = %session, url = %self.stream_url, rt_mode = %request.rt_mode, "opening event stream");
        let task = runtime.spawn(pump(builder, session, self.tx.clone()));
        Ok(Box::new(TaskConnection { task }))
    }
}

struct TaskConnection {
    task: JoinHandle<()>,
}

impl Connection for TaskConnection {
    fn close(&mut self) {
        self.task.abort();
    }
}

async fn pump(request: reqwest::RequestBuilder, session: SessionId, tx: mpsc::Sender<SessionEvent>) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            forward_failure(&tx, session, ClientError::from(err)).await;
            return;
        }
    };
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        forward_failure(
            &tx,
            session,
            ClientError::Http {
                status: status.as_u16(),
                body,
            },
        )
        .await;
        return;
    }
    forward_frames(response.bytes_stream(), session, &tx).await;
}

/// Decodes a byte stream into frames and forwards them until a terminal
/// frame, a read error, or end of body.
///
/// Anything other than a terminal frame ending the stream is reported as a
/// synthetic `error` frame so the session still closes.
pub(crate) async fn forward_frames<S, E>(stream: S, session: SessionId, tx: &mpsc::Sender<SessionEvent>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut stream = pin!(stream);
    let mut decoder = SseDecoder::default();
    while let Some(next) = stream.next().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(err) => {
                forward_failure(tx, session, ClientError::transport(err)).await;
                return;
            }
        };
        for event in decoder.push_chunk(&chunk) {
            if !forward(tx, session, event).await {
                return;
            }
        }
    }
    if let Some(event) = decoder.finish()
        && !forward(tx, session, event).await
    {
        return;
    }
    forward_failure(
        tx,
        session,
        ClientError::Transport("stream ended before done".into()),
    )
    .await;
}

/// Sends one frame; `false` once the stream should stop.
async fn forward(tx: &mpsc::Sender<SessionEvent>, session: SessionId, event: RawEvent) -> bool {
    let terminal = event.is_terminal();
    if tx.send(SessionEvent { session, event }).await.is_err() {
        debug!(session = %session, "event receiver dropped");
        return false;
    }
    !terminal
}

async fn forward_failure(tx: &mpsc::Sender<SessionEvent>, session: SessionId, err: ClientError) {
    warn!(session = %session, error = %err, "event stream failed");
    let event = RawEvent::new(EventKind::Error.as_str(), err.to_string());
    let _ = tx.send(SessionEvent { session, event }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        let owned: Vec<Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(owned)
    }

    fn collect(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<RawEvent> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            out.push(item.event);
        }
        out
    }

    #[tokio::test]
    async fn frames_split_across_chunks_are_reassembled() {
        let (tx, mut rx) = mpsc::channel(16);
        let session = SessionId::new();
        forward_frames(
            chunks(&[
                "event: tok",
                "en\ndata: \"Hel\"\n\nevent: rt\ndata: line one\ndata: line two\n\n",
                "event: done\ndata: {}\n\n",
            ]),
            session,
            &tx,
        )
        .await;

        assert_eq!(
            collect(&mut rx),
            vec![
                RawEvent::new("token", "\"Hel\""),
                RawEvent::new("rt", "line one\nline two"),
                RawEvent::new("done", "{}"),
            ]
        );
    }

    #[tokio::test]
    async fn stops_after_terminal_frame() {
        let (tx, mut rx) = mpsc::channel(16);
        forward_frames(
            chunks(&["event: error\ndata: \"bad\"\n\nevent: token\ndata: \"late\"\n\n"]),
            SessionId::new(),
            &tx,
        )
        .await;
        assert_eq!(collect(&mut rx), vec![RawEvent::new("error", "\"bad\"")]);
    }

    #[tokio::test]
    async fn body_ending_without_done_becomes_error_frame() {
        let (tx, mut rx) = mpsc::channel(16);
        let session = SessionId::new();
        forward_frames(chunks(&["event: token\ndata: \"a\"\n\n"]), session, &tx).await;

        let events = collect(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event, "error");
        assert!(events[1].data.contains("stream ended before done"));
    }

    #[tokio::test]
    async fn read_error_becomes_error_frame() {
        let (tx, mut rx) = mpsc::channel(16);
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"event: rt\ndata: x\n\n")),
            Err(std::io::Error::other("reset by peer")),
        ];
        forward_frames(stream::iter(items), SessionId::new(), &tx).await;

        let events = collect(&mut rx);
        assert_eq!(events[0], RawEvent::new("rt", "x"));
        assert_eq!(events[1].event, "error");
        assert!(events[1].data.contains("reset by peer"));
    }

    #[tokio::test]
    async fn frames_carry_their_session() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = SessionId::new();
        forward_frames(chunks(&["event: done\ndata: {}\n\n"]), session, &tx).await;
        let item = rx.try_recv().expect("frame");
        assert_eq!(item.session, session);
    }

    #[test]
    fn open_without_runtime_fails() {
        let (mut transport, _rx) = SseTransport::new(&ClientConfig::default()).expect("transport");
        let err = transport
            .open(SessionId::new(), &StreamRequest::new("hi", Default::default()))
            .err()
            .expect("no runtime");
        assert!(matches!(err, ClientError::Transport(msg) if msg.contains("runtime")));
    }
}
