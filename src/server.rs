//! # Request server
//!
//! Remote calls reach the controller as [Request]s. A [RequestServer] drains the requests already
//! queued, hands them one after the other to a [RequestHandler] and routes each [Reply] back to its
//! caller.
//!
//! [ChannelServer] is an in-process server built on tokio channels, [MirrorClient] is the matching
//! caller side.

use crate::{snapshot::Snapshot, Error, Result};
use chrono::{DateTime, Local};
use std::fmt;
use tokio::sync::{
    mpsc::{self, error::TryRecvError},
    oneshot,
};

/// Remotely invocable controller operations
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SetShape(Vec<f64>),
    GetShape,
    GetSnapshot(String),
    IsTerminated,
    Terminate,
    ServerInfo,
}
impl Request {
    /// Operation name
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetShape(_) => "setShape",
            Self::GetShape => "getShape",
            Self::GetSnapshot(_) => "getSnapshot",
            Self::IsTerminated => "isTerminated",
            Self::Terminate => "terminate",
            Self::ServerInfo => "serverInfo",
        }
    }
}

/// Replies to [Request]s
#[derive(Debug, Clone)]
pub enum Reply {
    Done,
    Shape(Option<Vec<f64>>),
    Snapshot(Snapshot),
    Terminated(bool),
    ServerInfo(ServerInfo),
}

/// Server identification
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub started: DateTime<Local>,
}
impl ServerInfo {
    /// Creates the server info of server `name` started now
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started: Local::now(),
        }
    }
}
impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} started {}",
            self.name,
            self.version,
            self.started.to_rfc3339()
        )
    }
}

/// Interface to the receiver of [Request]s
pub trait RequestHandler {
    fn handle(&mut self, request: Request) -> Result<Reply>;
}

/// Interface to request servers
pub trait RequestServer: Send {
    /// Dispatches the pending requests to `handler` and returns how many were served
    ///
    /// The server must not wait for requests that have not arrived yet.
    fn serve(&mut self, handler: &mut dyn RequestHandler) -> Result<usize>;
}

struct Envelope {
    request: Request,
    reply: oneshot::Sender<Result<Reply>>,
}

/// In-process request server
pub struct ChannelServer {
    rx: mpsc::Receiver<Envelope>,
    batch: usize,
}
impl ChannelServer {
    /// Default maximum number of requests served per call to [serve](RequestServer::serve)
    pub const BATCH: usize = 64;
    /// Creates a server with a request queue of size `capacity` and its client
    pub fn new(capacity: usize) -> (Self, MirrorClient) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                rx,
                batch: Self::BATCH,
            },
            MirrorClient { tx },
        )
    }
    /// Sets the maximum number of requests served per call to [serve](RequestServer::serve)
    pub fn batch(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }
}
impl RequestServer for ChannelServer {
    fn serve(&mut self, handler: &mut dyn RequestHandler) -> Result<usize> {
        let mut n_request = 0;
        while n_request < self.batch {
            let Envelope { request, reply } = match self.rx.try_recv() {
                Ok(envelope) => envelope,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            let name = request.name();
            let result = handler.handle(request);
            if let Err(e) = &result {
                log::debug!("{name} request failed: {e}");
            }
            if reply.send(result).is_err() {
                log::debug!("{name} caller went away before the reply");
            }
            n_request += 1;
        }
        Ok(n_request)
    }
}

/// Client to a [ChannelServer]
#[derive(Clone)]
pub struct MirrorClient {
    tx: mpsc::Sender<Envelope>,
}
impl MirrorClient {
    /// Sends `request` and waits for the reply
    pub async fn request(&self, request: Request) -> Result<Reply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| Error::Disconnected)?;
        rx.await.map_err(|_| Error::Disconnected)?
    }
    pub async fn set_shape(&self, command: Vec<f64>) -> Result<()> {
        match self.request(Request::SetShape(command)).await? {
            Reply::Done => Ok(()),
            _ => Err(Error::UnexpectedReply("setShape")),
        }
    }
    pub async fn get_shape(&self) -> Result<Option<Vec<f64>>> {
        match self.request(Request::GetShape).await? {
            Reply::Shape(shape) => Ok(shape),
            _ => Err(Error::UnexpectedReply("getShape")),
        }
    }
    pub async fn get_snapshot<S: Into<String>>(&self, prefix: S) -> Result<Snapshot> {
        match self.request(Request::GetSnapshot(prefix.into())).await? {
            Reply::Snapshot(snapshot) => Ok(snapshot),
            _ => Err(Error::UnexpectedReply("getSnapshot")),
        }
    }
    pub async fn is_terminated(&self) -> Result<bool> {
        match self.request(Request::IsTerminated).await? {
            Reply::Terminated(terminated) => Ok(terminated),
            _ => Err(Error::UnexpectedReply("isTerminated")),
        }
    }
    pub async fn terminate(&self) -> Result<()> {
        match self.request(Request::Terminate).await? {
            Reply::Done => Ok(()),
            _ => Err(Error::UnexpectedReply("terminate")),
        }
    }
    pub async fn server_info(&self) -> Result<ServerInfo> {
        match self.request(Request::ServerInfo).await? {
            Reply::ServerInfo(info) => Ok(info),
            _ => Err(Error::UnexpectedReply("serverInfo")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Echo {
        shape: Option<Vec<f64>>,
        handled: Vec<&'static str>,
    }
    impl RequestHandler for Echo {
        fn handle(&mut self, request: Request) -> Result<Reply> {
            self.handled.push(request.name());
            match request {
                Request::SetShape(shape) if shape.is_empty() => {
                    Err(Error::Device("empty command".into()))
                }
                Request::SetShape(shape) => {
                    self.shape = Some(shape);
                    Ok(Reply::Done)
                }
                Request::GetShape => Ok(Reply::Shape(self.shape.clone())),
                Request::IsTerminated => Ok(Reply::Terminated(false)),
                _ => Ok(Reply::Done),
            }
        }
    }

    fn envelope(request: Request) -> (Envelope, oneshot::Receiver<Result<Reply>>) {
        let (reply, rx) = oneshot::channel();
        (Envelope { request, reply }, rx)
    }

    #[test]
    fn serve_without_requests() {
        let (mut server, _client) = ChannelServer::new(4);
        let mut echo = Echo::default();
        assert_eq!(server.serve(&mut echo).unwrap(), 0);
        assert!(echo.handled.is_empty());
    }

    #[test]
    fn serves_a_bounded_batch() {
        let (server, client) = ChannelServer::new(8);
        let mut server = server.batch(3);
        let mut replies = vec![];
        for _ in 0..5 {
            let (envelope, rx) = envelope(Request::IsTerminated);
            assert!(client.tx.try_send(envelope).is_ok());
            replies.push(rx);
        }
        let mut echo = Echo::default();
        assert_eq!(server.serve(&mut echo).unwrap(), 3);
        assert_eq!(server.serve(&mut echo).unwrap(), 2);
        assert_eq!(server.serve(&mut echo).unwrap(), 0);
        for mut rx in replies {
            assert!(matches!(rx.try_recv(), Ok(Ok(Reply::Terminated(false)))));
        }
    }

    #[test]
    fn failure_goes_to_its_caller_only() {
        let (mut server, client) = ChannelServer::new(8);
        let (bad, mut bad_rx) = envelope(Request::SetShape(vec![]));
        let (good, mut good_rx) = envelope(Request::SetShape(vec![1.]));
        assert!(client.tx.try_send(bad).is_ok());
        assert!(client.tx.try_send(good).is_ok());
        let mut echo = Echo::default();
        assert_eq!(server.serve(&mut echo).unwrap(), 2);
        assert!(matches!(bad_rx.try_recv(), Ok(Err(Error::Device(_)))));
        assert!(matches!(good_rx.try_recv(), Ok(Ok(Reply::Done))));
        assert_eq!(echo.shape, Some(vec![1.]));
    }

    #[tokio::test]
    async fn client_round_trip() {
        let (mut server, client) = ChannelServer::new(4);
        let caller = tokio::spawn(async move {
            client.set_shape(vec![0.5; 2]).await?;
            client.get_shape().await
        });
        let mut echo = Echo::default();
        while echo.handled.len() < 2 {
            server.serve(&mut echo).unwrap();
            tokio::task::yield_now().await;
        }
        assert_eq!(caller.await.unwrap().unwrap(), Some(vec![0.5; 2]));
        assert_eq!(echo.handled, vec!["setShape", "getShape"]);
    }

    #[tokio::test]
    async fn client_of_a_dropped_server() {
        let (server, client) = ChannelServer::new(4);
        drop(server);
        assert!(matches!(
            client.is_terminated().await,
            Err(Error::Disconnected)
        ));
    }
}
