//! # Status publisher

use crate::{status::DeformableMirrorStatus, Error, Result};
use std::str::FromStr;
use tokio::sync::broadcast::{self, error::RecvError};

/// Interface to status publishers
///
/// Publishing is fire-and-forget: delivery failures stay inside the publisher.
pub trait StatusPublisher: Send {
    fn publish(&mut self, status: &DeformableMirrorStatus);
}

/// Status wire encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusEncoding {
    #[default]
    Pickle,
    Bincode,
}
impl StatusEncoding {
    pub fn encode(&self, status: &DeformableMirrorStatus) -> Result<Vec<u8>> {
        Ok(match self {
            Self::Pickle => serde_pickle::to_vec(status, serde_pickle::SerOptions::new())?,
            Self::Bincode => bincode::serialize(status)?,
        })
    }
    pub fn decode(&self, bytes: &[u8]) -> Result<DeformableMirrorStatus> {
        Ok(match self {
            Self::Pickle => serde_pickle::from_slice(bytes, serde_pickle::DeOptions::new())?,
            Self::Bincode => bincode::deserialize(bytes)?,
        })
    }
}
impl FromStr for StatusEncoding {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pickle" => Ok(Self::Pickle),
            "bincode" => Ok(Self::Bincode),
            _ => Err(Error::Config(format!("unknown status encoding {s}"))),
        }
    }
}

/// Publishes encoded statuses on a tokio broadcast channel
///
/// Without subscribers the status is dropped, subscribers that fall behind lose the oldest ones.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<Vec<u8>>,
    encoding: StatusEncoding,
}
impl BroadcastPublisher {
    pub fn new(capacity: usize, encoding: StatusEncoding) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, encoding }
    }
    /// Returns a new subscriber to the statuses
    pub fn subscribe(&self) -> StatusSubscriber {
        StatusSubscriber {
            rx: self.tx.subscribe(),
            encoding: self.encoding,
        }
    }
}
impl StatusPublisher for BroadcastPublisher {
    fn publish(&mut self, status: &DeformableMirrorStatus) {
        let bytes = match self.encoding.encode(status) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to encode mirror status: {e}");
                return;
            }
        };
        if self.tx.send(bytes).is_err() {
            log::trace!("no status subscriber");
        }
    }
}

/// Receiver of the statuses of a [BroadcastPublisher]
pub struct StatusSubscriber {
    rx: broadcast::Receiver<Vec<u8>>,
    encoding: StatusEncoding,
}
impl StatusSubscriber {
    /// Waits for the next status
    ///
    /// Statuses missed because the subscriber lagged behind are skipped.
    pub async fn recv(&mut self) -> Result<DeformableMirrorStatus> {
        loop {
            match self.rx.recv().await {
                Ok(bytes) => return self.encoding.decode(&bytes),
                Err(RecvError::Lagged(n)) => log::debug!("status subscriber skipped {n} statuses"),
                Err(RecvError::Closed) => return Err(Error::Disconnected),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(counter: u64) -> DeformableMirrorStatus {
        DeformableMirrorStatus::new(4, 4, Some(vec![0.25; 4]), counter)
    }

    #[test]
    fn encodings() {
        for encoding in [StatusEncoding::Pickle, StatusEncoding::Bincode] {
            let bytes = encoding.encode(&status(3)).unwrap();
            assert_eq!(encoding.decode(&bytes).unwrap(), status(3));
        }
        let unset = DeformableMirrorStatus::new(10, 10, None, 0);
        let bytes = StatusEncoding::Pickle.encode(&unset).unwrap();
        assert_eq!(StatusEncoding::Pickle.decode(&bytes).unwrap(), unset);
        assert!("json".parse::<StatusEncoding>().is_err());
    }

    #[test]
    fn publish_without_subscriber() {
        let mut publisher = BroadcastPublisher::new(4, StatusEncoding::Bincode);
        publisher.publish(&status(0));
    }

    #[tokio::test]
    async fn lagging_subscriber_gets_latest() {
        let mut publisher = BroadcastPublisher::new(2, StatusEncoding::Pickle);
        let mut subscriber = publisher.subscribe();
        for counter in 0..5 {
            publisher.publish(&status(counter));
        }
        assert_eq!(subscriber.recv().await.unwrap().command_counter(), 3);
        assert_eq!(subscriber.recv().await.unwrap().command_counter(), 4);
        drop(publisher);
        assert!(matches!(subscriber.recv().await, Err(Error::Disconnected)));
    }
}
