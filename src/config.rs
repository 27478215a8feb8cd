//! # Controller configuration
//!
//! The configuration is read from the environment:
//!  - `DM_SERVER_NAME`: server name [mirror-controller]
//!  - `DM_MODEL`: mirror [model](DeviceModel) [simulatedDM]
//!  - `DM_SERIAL_NUMBER`: mirror serial number [dm-sim]
//!  - `DM_N_ACTUATOR`: number of actuators of a simulated mirror [10]
//!  - `DM_LOOP_PERIOD_MS`: control loop period in milliseconds [1]
//!  - `DM_RATE_INTERVAL_S`: loop rate report interval in seconds [1]
//!  - `DM_STATUS_ENCODING`: status [encoding](StatusEncoding), `pickle` or `bincode` [pickle]
//!  - `DM_REQUEST_BATCH`: maximum number of requests served per loop iteration [64]

use crate::{
    device::{DeformableMirror, DeviceModel, SimulatedDeformableMirror},
    publisher::StatusEncoding,
    server::ChannelServer,
    Error, Result,
};
use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_name: String,
    pub model: DeviceModel,
    pub serial_number: String,
    pub n_actuator: usize,
    pub loop_period: Duration,
    pub rate_interval: Duration,
    pub status_encoding: StatusEncoding,
    pub request_batch: usize,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "mirror-controller".into(),
            model: DeviceModel::SimulatedDm,
            serial_number: "dm-sim".into(),
            n_actuator: SimulatedDeformableMirror::N_ACTUATOR,
            loop_period: Duration::from_millis(1),
            rate_interval: Duration::from_secs(1),
            status_encoding: StatusEncoding::Pickle,
            request_batch: ChannelServer::BATCH,
        }
    }
}

fn var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}={value}: {e}"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config(format!("{key}: {e}"))),
    }
}

impl Config {
    /// Reads the configuration from the environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(name) = var("DM_SERVER_NAME")? {
            config.server_name = name;
        }
        if let Some(model) = var("DM_MODEL")? {
            config.model = model;
        }
        if let Some(serial_number) = var("DM_SERIAL_NUMBER")? {
            config.serial_number = serial_number;
        }
        if let Some(n_actuator) = var("DM_N_ACTUATOR")? {
            config.n_actuator = n_actuator;
        }
        if let Some(period) = var::<u64>("DM_LOOP_PERIOD_MS")? {
            config.loop_period = Duration::from_millis(period);
        }
        if let Some(interval) = var::<f64>("DM_RATE_INTERVAL_S")? {
            if !interval.is_finite() || interval <= 0. {
                return Err(Error::Config(format!(
                    "DM_RATE_INTERVAL_S={interval}: must be positive"
                )));
            }
            config.rate_interval = Duration::try_from_secs_f64(interval)
                .map_err(|e| Error::Config(format!("DM_RATE_INTERVAL_S={interval}: {e}")))?;
        }
        if let Some(encoding) = var("DM_STATUS_ENCODING")? {
            config.status_encoding = encoding;
        }
        if let Some(batch) = var("DM_REQUEST_BATCH")? {
            config.request_batch = batch;
        }
        Ok(config)
    }
    /// Builds the mirror device
    pub fn mirror(&self) -> Result<Box<dyn DeformableMirror>> {
        self.model.build(&self.serial_number, self.n_actuator)
    }
}
