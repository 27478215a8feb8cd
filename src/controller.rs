//! # Deformable mirror controller

use crate::{
    control::Control,
    device::DeformableMirror,
    publisher::StatusPublisher,
    rate::RateMonitor,
    server::{Reply, Request, RequestHandler, RequestServer, ServerInfo},
    snapshot::{self, Snapshot, SnapshotEntry, SnapshotValue},
    status::{DeformableMirrorStatus, StatusCache},
    Result,
};
use std::sync::Arc;

/// Mirror state shared by the controller and the request handler
struct Mirror {
    device: Box<dyn DeformableMirror>,
    status: StatusCache,
    command: Option<Vec<f64>>,
    command_counter: u64,
    step_counter: u64,
    terminated: bool,
    info: ServerInfo,
}
impl Mirror {
    fn n_actuator(&self) -> usize {
        self.device.n_actuator()
    }
    // zonal control only: as many modes as actuators
    fn n_mode(&self) -> usize {
        self.n_actuator()
    }
    fn set_shape(&mut self, command: Vec<f64>) -> Result<()> {
        self.device.set_zonal_command(&command)?;
        self.command = Some(command);
        self.command_counter += 1;
        self.status.invalidate();
        Ok(())
    }
    fn get_shape(&self) -> Result<Option<Vec<f64>>> {
        self.device.zonal_command()
    }
    fn status(&self) -> Result<Arc<DeformableMirrorStatus>> {
        let device = &self.device;
        self.status.get_or_compute(
            self.n_actuator(),
            self.n_mode(),
            || device.zonal_command(),
            self.command_counter,
        )
    }
    fn snapshot(&self, prefix: &str) -> Snapshot {
        snapshot::prepend(
            prefix,
            [
                (
                    SnapshotEntry::COMMAND_COUNTER,
                    SnapshotValue::from(self.command_counter),
                ),
                (
                    SnapshotEntry::SERIAL_NUMBER,
                    SnapshotValue::from(self.device.serial_number()),
                ),
                (
                    SnapshotEntry::STEP_COUNTER,
                    SnapshotValue::from(self.step_counter),
                ),
            ],
        )
    }
    fn terminate(&mut self) {
        log::info!("Got request to terminate");
        if let Err(e) = self.device.deinitialize() {
            log::warn!("Could not deinitialize mirror: {e}");
        }
        self.terminated = true;
    }
}
impl RequestHandler for Mirror {
    fn handle(&mut self, request: Request) -> Result<Reply> {
        Ok(match request {
            Request::SetShape(command) => {
                self.set_shape(command)?;
                Reply::Done
            }
            Request::GetShape => Reply::Shape(self.get_shape()?),
            Request::GetSnapshot(prefix) => Reply::Snapshot(self.snapshot(&prefix)),
            Request::IsTerminated => Reply::Terminated(self.terminated),
            Request::Terminate => {
                self.terminate();
                Reply::Done
            }
            Request::ServerInfo => Reply::ServerInfo(self.info.clone()),
        })
    }
}

/// Deformable mirror controller
///
/// Each [step](DeformableMirrorController::step):
///  1. serves the pending requests,
///  2. publishes the mirror status,
///  3. updates the loop rate monitor and the step counter.
pub struct DeformableMirrorController<S, P> {
    mirror: Mirror,
    server: S,
    publisher: P,
    rate: RateMonitor,
}
impl<S, P> DeformableMirrorController<S, P>
where
    S: RequestServer,
    P: StatusPublisher,
{
    /// Creates a new controller of the mirror `device`
    pub fn new<N: Into<String>>(
        name: N,
        device: Box<dyn DeformableMirror>,
        server: S,
        publisher: P,
    ) -> Self {
        let this = Self {
            mirror: Mirror {
                device,
                status: StatusCache::new(),
                command: None,
                command_counter: 0,
                step_counter: 0,
                terminated: false,
                info: ServerInfo::new(name),
            },
            server,
            publisher,
            rate: RateMonitor::default(),
        };
        log::info!("Deformable Mirror Controller created");
        this
    }
    /// Sets the [rate monitor](RateMonitor)
    pub fn rate_monitor(mut self, rate: RateMonitor) -> Self {
        self.rate = rate;
        self
    }
    /// Sends the zonal `command` to the mirror
    pub fn set_shape(&mut self, command: Vec<f64>) -> Result<()> {
        self.mirror.set_shape(command)
    }
    /// Returns the zonal command reported by the mirror
    pub fn get_shape(&self) -> Result<Option<Vec<f64>>> {
        self.mirror.get_shape()
    }
    /// Returns the last command sent through [set_shape](Self::set_shape)
    pub fn last_command(&self) -> Option<&[f64]> {
        self.mirror.command.as_deref()
    }
    /// Returns the mirror status, rebuilt if a command was accepted since the last call
    pub fn status(&self) -> Result<Arc<DeformableMirrorStatus>> {
        self.mirror.status()
    }
    /// Returns the controller telemetry with keys prefixed with `prefix`
    pub fn get_snapshot(&self, prefix: &str) -> Snapshot {
        self.mirror.snapshot(prefix)
    }
    pub fn step_counter(&self) -> u64 {
        self.mirror.step_counter
    }
    pub fn command_counter(&self) -> u64 {
        self.mirror.command_counter
    }
    pub fn server_info(&self) -> &ServerInfo {
        &self.mirror.info
    }
    /// Releases the mirror and flags the controller as terminated
    ///
    /// A failure to release the mirror is logged and the controller is terminated anyway.
    pub fn terminate(&mut self) {
        self.mirror.terminate()
    }
    pub fn is_terminated(&self) -> bool {
        self.mirror.terminated
    }
    /// Runs one controller iteration
    pub fn step(&mut self) -> Result<()> {
        self.server.serve(&mut self.mirror)?;
        self.publish_status()?;
        if let Some(rate) = self.rate.tick() {
            log::info!("Stepping at {rate:5.2} Hz");
        }
        self.mirror.step_counter += 1;
        Ok(())
    }
    fn publish_status(&mut self) -> Result<()> {
        let status = self.mirror.status()?;
        self.publisher.publish(&status);
        Ok(())
    }
}

impl<S, P> Control for DeformableMirrorController<S, P>
where
    S: RequestServer,
    P: StatusPublisher,
{
    fn step(&mut self) -> Result<()> {
        DeformableMirrorController::step(self)
    }
    fn is_terminated(&self) -> bool {
        DeformableMirrorController::is_terminated(self)
    }
    fn terminate(&mut self) {
        DeformableMirrorController::terminate(self)
    }
}
