//! # Deformable mirror controller
//!
//! The [DeformableMirrorController] services remote requests, forwards zonal commands to a
//! [DeformableMirror] device and publishes the mirror [status](DeformableMirrorStatus)
//! once per [ControlLoop] iteration.

pub mod config;
pub mod control;
pub mod device;
pub mod publisher;
pub mod rate;
pub mod server;
pub mod snapshot;
pub mod status;

mod controller;
pub use controller::DeformableMirrorController;

#[doc(no_inline)]
pub use config::Config;
#[doc(no_inline)]
pub use control::{Control, ControlLoop, IntoArcx};
#[doc(no_inline)]
pub use device::{DeformableMirror, DeviceModel, SimulatedDeformableMirror};
#[doc(no_inline)]
pub use publisher::{BroadcastPublisher, StatusEncoding, StatusPublisher, StatusSubscriber};
#[doc(no_inline)]
pub use rate::RateMonitor;
#[doc(no_inline)]
pub use server::{ChannelServer, MirrorClient, Reply, Request, RequestServer, ServerInfo};
#[doc(no_inline)]
pub use snapshot::{Snapshot, SnapshotEntry, SnapshotValue};
#[doc(no_inline)]
pub use status::{DeformableMirrorStatus, StatusCache};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("zonal command has {actual} values, the mirror has {expected} actuators")]
    CommandSize { expected: usize, actual: usize },
    #[error("mirror device failure: {0}")]
    Device(String),
    #[error("failed to deinitialize mirror: {0}")]
    Deinitialize(String),
    #[error("unsupported mirror model {0}")]
    UnsupportedModel(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to encode status with pickle")]
    Pickle(#[from] serde_pickle::Error),
    #[error("failed to encode status with bincode")]
    Bincode(#[from] bincode::Error),
    #[error("request channel disconnected")]
    Disconnected,
    #[error("unexpected reply to {0} request")]
    UnexpectedReply(&'static str),
}
pub type Result<T> = std::result::Result<T, Error>;
