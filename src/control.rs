//! # Control loop

use crate::Result;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::Mutex,
    time::{self, MissedTickBehavior},
};

/// Interface to steppable controllers
pub trait Control {
    /// Runs one loop iteration
    fn step(&mut self) -> Result<()>;
    /// Returns `true` once the controller has been terminated
    fn is_terminated(&self) -> bool;
    /// Terminates the controller
    fn terminate(&mut self);
}

/// Shares `self` behind a tokio mutex
pub trait IntoArcx: Sized {
    fn into_arcx(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }
}
impl<C: Control> IntoArcx for C {}

/// Fault tolerant control loop
///
/// The loop steps the controller every `period` until the controller is terminated.
/// A failed iteration is logged and the loop moves on to the next one.
pub struct ControlLoop<C> {
    controller: Arc<Mutex<C>>,
    period: Duration,
}
impl<C: Control> ControlLoop<C> {
    pub fn new(controller: Arc<Mutex<C>>, period: Duration) -> Self {
        Self { controller, period }
    }
    /// Runs the loop and returns the number of failed iterations
    pub async fn run(self) -> usize {
        let mut n_fault = 0;
        let period = if self.period.is_zero() {
            Duration::from_micros(1)
        } else {
            self.period
        };
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let mut controller = self.controller.lock().await;
            if controller.is_terminated() {
                break;
            }
            if let Err(e) = controller.step() {
                n_fault += 1;
                log::error!("control loop iteration failed: {e}");
            }
        }
        n_fault
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Default)]
    struct Flaky {
        n_step: usize,
        terminated: bool,
    }
    impl Control for Flaky {
        fn step(&mut self) -> Result<()> {
            self.n_step += 1;
            if self.n_step == 10 {
                self.terminate();
            }
            if self.n_step % 2 == 1 {
                Err(Error::Device("odd step".into()))
            } else {
                Ok(())
            }
        }
        fn is_terminated(&self) -> bool {
            self.terminated
        }
        fn terminate(&mut self) {
            self.terminated = true;
        }
    }

    #[tokio::test]
    async fn survives_failed_iterations() {
        let flaky = Flaky::default().into_arcx();
        let n_fault = ControlLoop::new(flaky.clone(), Duration::from_micros(10))
            .run()
            .await;
        assert_eq!(n_fault, 5);
        let flaky = flaky.lock().await;
        assert_eq!(flaky.n_step, 10);
        assert!(flaky.is_terminated());
    }

    #[tokio::test]
    async fn stops_on_external_termination() {
        let flaky = Flaky::default().into_arcx();
        flaky.lock().await.terminate();
        let n_fault = ControlLoop::new(flaky.clone(), Duration::ZERO).run().await;
        assert_eq!(n_fault, 0);
        assert_eq!(flaky.lock().await.n_step, 0);
    }
}
