//! Real-time driver: evolves a shared simulator on a fixed interval

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::core::config::SimulationSpeed;
use crate::evolution::simulation::{Simulator, TickReport};

/// Called after every tick while the simulator lock is released
pub type TickObserver = Arc<dyn Fn(&TickReport) + Send + Sync>;

/// Owns the background task; dropping it stops the simulation
pub struct Ticker {
    sim: Arc<Mutex<Simulator>>,
    observer: TickObserver,
    speed: SimulationSpeed,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Must be called from within a tokio runtime
    pub fn start(sim: Arc<Mutex<Simulator>>, speed: SimulationSpeed, observer: TickObserver) -> Self {
        let mut ticker = Self {
            sim,
            observer,
            speed,
            handle: None,
        };
        ticker.spawn();
        ticker
    }

    fn spawn(&mut self) {
        let sim = Arc::clone(&self.sim);
        let observer = Arc::clone(&self.observer);
        let period = self.speed.interval();
        tracing::info!("Ticker running every {}ms", period.as_millis());

        self.handle = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let report = sim.lock().await.evolve();
                observer(&report);
            }
        }));
    }

    pub fn speed(&self) -> SimulationSpeed {
        self.speed
    }

    /// Restart the interval at a new pace; no-op when stopped
    pub fn set_speed(&mut self, speed: SimulationSpeed) {
        self.speed = speed;
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.spawn();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
