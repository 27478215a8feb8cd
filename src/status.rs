//! # Deformable mirror status

use crate::Result;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

/// Deformable mirror status
///
/// The status is built by the [StatusCache] and replaced wholesale, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeformableMirrorStatus {
    n_actuator: usize,
    n_mode: usize,
    command: Option<Vec<f64>>,
    command_counter: u64,
}
impl DeformableMirrorStatus {
    pub fn new(
        n_actuator: usize,
        n_mode: usize,
        command: Option<Vec<f64>>,
        command_counter: u64,
    ) -> Self {
        Self {
            n_actuator,
            n_mode,
            command,
            command_counter,
        }
    }
    pub fn n_actuator(&self) -> usize {
        self.n_actuator
    }
    pub fn n_mode(&self) -> usize {
        self.n_mode
    }
    /// Returns the zonal command, `None` if the mirror was never commanded
    pub fn command(&self) -> Option<&[f64]> {
        self.command.as_deref()
    }
    pub fn command_counter(&self) -> u64 {
        self.command_counter
    }
}
impl fmt::Display for DeformableMirrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeformableMirrorStatus: {} actuators, {} modes, command #{}",
            self.n_actuator, self.n_mode, self.command_counter
        )
    }
}

/// Lazily computed [DeformableMirrorStatus]
///
/// The cache is emptied on every accepted command and the status is rebuilt on the next read.
/// Both operations run under the same lock.
#[derive(Debug, Default)]
pub struct StatusCache {
    status: Mutex<Option<Arc<DeformableMirrorStatus>>>,
}
impl StatusCache {
    pub fn new() -> Self {
        Default::default()
    }
    /// Drops the cached status
    pub fn invalidate(&self) {
        *self
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
    /// Returns `true` if a status is cached
    pub fn is_valid(&self) -> bool {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
    /// Returns the cached status or builds it if the cache is empty
    ///
    /// `command` is only called when the status is rebuilt and any error it returns is passed
    /// on, leaving the cache empty.
    pub fn get_or_compute<F>(
        &self,
        n_actuator: usize,
        n_mode: usize,
        command: F,
        command_counter: u64,
    ) -> Result<Arc<DeformableMirrorStatus>>
    where
        F: FnOnce() -> Result<Option<Vec<f64>>>,
    {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(status) = status.as_ref() {
            return Ok(status.clone());
        }
        log::debug!("get MirrorStatus");
        let new_status = Arc::new(DeformableMirrorStatus::new(
            n_actuator,
            n_mode,
            command()?,
            command_counter,
        ));
        log::debug!("{new_status}");
        *status = Some(new_status.clone());
        Ok(new_status)
    }
}
