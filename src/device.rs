//! # Deformable mirror devices

use crate::{Error, Result};
use std::{fmt, str::FromStr};

/// Interface to a deformable mirror device
///
/// A device owns the authoritative zonal command: the vector of actuator positions last accepted by
/// [set_zonal_command](DeformableMirror::set_zonal_command).
pub trait DeformableMirror: Send {
    /// Sends a zonal command to the mirror
    ///
    /// Validation of the command (length, range) is the device's business and failures are
    /// returned as device errors.
    fn set_zonal_command(&mut self, command: &[f64]) -> Result<()>;
    /// Returns the last zonal command accepted by the mirror, `None` if it has never been commanded
    fn zonal_command(&self) -> Result<Option<Vec<f64>>>;
    /// Returns the mirror serial number
    fn serial_number(&self) -> String;
    /// Returns the number of actuators
    fn n_actuator(&self) -> usize;
    /// Releases the mirror
    fn deinitialize(&mut self) -> Result<()>;
}

/// In-memory deformable mirror
///
/// The mirror echoes back the last zonal command it was given.
#[derive(Debug, Clone)]
pub struct SimulatedDeformableMirror {
    serial_number: String,
    n_actuator: usize,
    zonal_command: Option<Vec<f64>>,
}
impl SimulatedDeformableMirror {
    /// Default number of actuators
    pub const N_ACTUATOR: usize = 10;
    /// Creates a simulated mirror with [N_ACTUATOR](Self::N_ACTUATOR) actuators
    pub fn new<S: Into<String>>(serial_number: S) -> Self {
        Self {
            serial_number: serial_number.into(),
            n_actuator: Self::N_ACTUATOR,
            zonal_command: None,
        }
    }
    /// Sets the number of actuators
    pub fn n_actuator(mut self, n_actuator: usize) -> Self {
        self.n_actuator = n_actuator;
        self
    }
}
impl DeformableMirror for SimulatedDeformableMirror {
    fn set_zonal_command(&mut self, command: &[f64]) -> Result<()> {
        if command.len() != self.n_actuator {
            return Err(Error::CommandSize {
                expected: self.n_actuator,
                actual: command.len(),
            });
        }
        self.zonal_command = Some(command.to_vec());
        Ok(())
    }
    fn zonal_command(&self) -> Result<Option<Vec<f64>>> {
        Ok(self.zonal_command.clone())
    }
    fn serial_number(&self) -> String {
        self.serial_number.clone()
    }
    fn n_actuator(&self) -> usize {
        self.n_actuator
    }
    fn deinitialize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Deformable mirror models known to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    SimulatedDm,
    SimulatedMemsMultiDm,
    AlpaoDm277,
    PiTipTilt,
}
impl DeviceModel {
    /// Builds the mirror device of this model
    ///
    /// Only the simulated models can be built, the hardware models return
    /// [Error::UnsupportedModel].
    pub fn build(
        self,
        serial_number: &str,
        n_actuator: usize,
    ) -> Result<Box<dyn DeformableMirror>> {
        match self {
            Self::SimulatedDm | Self::SimulatedMemsMultiDm => Ok(Box::new(
                SimulatedDeformableMirror::new(serial_number).n_actuator(n_actuator),
            )),
            Self::AlpaoDm277 | Self::PiTipTilt => Err(Error::UnsupportedModel(self.to_string())),
        }
    }
}
impl FromStr for DeviceModel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simulatedDM" => Ok(Self::SimulatedDm),
            "simulatedMEMSMultiDM" => Ok(Self::SimulatedMemsMultiDm),
            "alpaoDM277" => Ok(Self::AlpaoDm277),
            "piTipTilt" => Ok(Self::PiTipTilt),
            _ => Err(Error::UnsupportedModel(s.to_string())),
        }
    }
}
impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SimulatedDm => write!(f, "simulatedDM"),
            Self::SimulatedMemsMultiDm => write!(f, "simulatedMEMSMultiDM"),
            Self::AlpaoDm277 => write!(f, "alpaoDM277"),
            Self::PiTipTilt => write!(f, "piTipTilt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_mirror_has_no_command() {
        let dm = SimulatedDeformableMirror::new("sim-1");
        assert_eq!(dm.zonal_command().unwrap(), None);
        assert_eq!(DeformableMirror::n_actuator(&dm), 10);
        assert_eq!(dm.serial_number(), "sim-1");
    }

    #[test]
    fn command_echo() {
        let mut dm = SimulatedDeformableMirror::new("sim-1").n_actuator(3);
        dm.set_zonal_command(&[0.1, -0.2, 0.3]).unwrap();
        assert_eq!(dm.zonal_command().unwrap(), Some(vec![0.1, -0.2, 0.3]));
    }

    #[test]
    fn command_size_mismatch() {
        let mut dm = SimulatedDeformableMirror::new("sim-1");
        let err = dm.set_zonal_command(&[0.; 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::CommandSize {
                expected: 10,
                actual: 3
            }
        ));
        assert_eq!(dm.zonal_command().unwrap(), None);
    }

    #[test]
    fn model_selection() {
        let dm = "simulatedMEMSMultiDM"
            .parse::<DeviceModel>()
            .unwrap()
            .build("mems", 140)
            .unwrap();
        assert_eq!(dm.n_actuator(), 140);
        assert_eq!(dm.serial_number(), "mems");

        let model: DeviceModel = "alpaoDM277".parse().unwrap();
        assert!(matches!(
            model.build("alpao", 277),
            Err(Error::UnsupportedModel(m)) if m == "alpaoDM277"
        ));
        assert!("deformable".parse::<DeviceModel>().is_err());
    }
}
