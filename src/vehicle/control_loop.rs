//! Device control loop
//!
//! Two independent cadences share one scheduling loop: sensor sampling every
//! `SENSOR_PERIOD_MS` and telemetry emission every `app_params.telemetry_period`
//! seconds. The telemetry period is re-read on every tick so `set_telemetry_period`
//! takes effect without a restart.

use super::SharedVehicle;
use crate::config::SharedConfig;
use crate::gps::Sensor;
use crate::relay::RelaySink;
use anyhow::Result;
use autonomia_shared::{timing, VehicleEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct ControlLoop {
    device_id: String,
    vehicle: SharedVehicle,
    config: SharedConfig,
    sensor: Option<Arc<dyn Sensor>>,
    relay: Arc<dyn RelaySink>,
    tick: Duration,
    sensor_period: Duration,
}

impl ControlLoop {
    pub fn new(
        device_id: impl Into<String>,
        vehicle: SharedVehicle,
        config: SharedConfig,
        sensor: Option<Arc<dyn Sensor>>,
        relay: Arc<dyn RelaySink>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            vehicle,
            config,
            sensor,
            relay,
            tick: Duration::from_millis(timing::TICK_INTERVAL_MS),
            sensor_period: Duration::from_millis(timing::SENSOR_PERIOD_MS),
        }
    }

    /// Run until `shutdown` turns true (or its sender is dropped).
    /// The vehicle is left in the Stopped state on return.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.vehicle.transition(VehicleEvent::LoopStarted).await?;
        info!("[LOOP] Vehicle running ({})", self.device_id);

        let mut last_sample: Option<Instant> = None;
        let mut last_telemetry: Option<Instant> = None;

        loop {
            let stop_requested = *shutdown.borrow();
            if stop_requested || !self.vehicle.run_state().await.is_running() {
                break;
            }

            let now = Instant::now();

            if is_due(last_sample, now, self.sensor_period) {
                self.sample().await;
                last_sample = Some(now);
            }

            let telemetry_period = self.config.telemetry_period().await;
            if is_due(last_telemetry, now, telemetry_period) {
                self.emit_telemetry().await;
                last_telemetry = Some(now);
            }

            tokio::select! {
                _ = sleep(self.tick) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.vehicle
            .transition(VehicleEvent::ShutdownRequested)
            .await?;
        info!("[LOOP] Vehicle stopped");
        Ok(())
    }

    async fn sample(&self) {
        let Some(sensor) = &self.sensor else {
            return;
        };

        match sensor.readings().await {
            Ok(readings) => {
                debug!("[LOOP] GPS readings: {:?}", readings);
                self.vehicle.replace_readings(readings).await;
            }
            Err(e) => {
                warn!("[LOOP] Sensor read failed: {}", e);
            }
        }
    }

    async fn emit_telemetry(&self) {
        let telemetry = self.vehicle.telemetry(&self.device_id).await;

        let payload = match serde_json::to_vec(&telemetry) {
            Ok(payload) => payload,
            Err(e) => {
                error!("[LOOP] Failed to encode telemetry: {}", e);
                return;
            }
        };

        match self.relay.send(payload.into()).await {
            Ok(()) => debug!("[LOOP] Sent telemetry: {:?}", telemetry),
            Err(e) => warn!("[LOOP] Error in sending telemetry data: {}", e),
        }
    }
}

fn is_due(last: Option<Instant>, now: Instant, period: Duration) -> bool {
    match last {
        None => true,
        Some(last) => now.duration_since(last) >= period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiveConfig;
    use crate::rpc::{Dispatcher, MethodRegistry};
    use crate::vehicle::{LoggingActuator, VehicleState};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use autonomia_shared::{Readings, RunState, Telemetry};
    use bytes::Bytes;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRelay {
        sent: Mutex<Vec<Bytes>>,
    }

    impl RecordingRelay {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn last(&self) -> Option<Telemetry> {
            let sent = self.sent.lock().unwrap();
            sent.last().map(|b| serde_json::from_slice(b).unwrap())
        }
    }

    #[async_trait]
    impl RelaySink for RecordingRelay {
        async fn send(&self, payload: Bytes) -> Result<()> {
            self.sent.lock().unwrap().push(payload);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingRelay {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl RelaySink for FailingRelay {
        async fn send(&self, _payload: Bytes) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("relay offline"))
        }
    }

    /// Latitude increases by one on every read
    #[derive(Default)]
    struct CountingSensor {
        reads: AtomicU32,
    }

    #[async_trait]
    impl Sensor for CountingSensor {
        async fn readings(&self) -> Result<Readings> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Readings {
                lat: n as f64,
                lon: -(n as f64),
                fix: true,
                ..Default::default()
            })
        }
    }

    struct BrokenSensor;

    #[async_trait]
    impl Sensor for BrokenSensor {
        async fn readings(&self) -> Result<Readings> {
            Err(anyhow!("serial port closed"))
        }
    }

    fn config_with_period(period: u64) -> SharedConfig {
        let mut app_params = Map::new();
        app_params.insert("telemetry_period".into(), json!(period));
        let mut sections = Map::new();
        sections.insert("app_params".into(), Value::Object(app_params));
        LiveConfig::shared(sections)
    }

    fn spawn_loop(
        vehicle: SharedVehicle,
        config: SharedConfig,
        sensor: Option<Arc<dyn Sensor>>,
        relay: Arc<dyn RelaySink>,
    ) -> (watch::Sender<bool>, tokio::task::JoinHandle<Result<()>>) {
        let (tx, rx) = watch::channel(false);
        let control = ControlLoop::new("car-test", vehicle, config, sensor, relay);
        (tx, tokio::spawn(control.run(rx)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_cadence() {
        let relay = Arc::new(RecordingRelay::default());
        let vehicle = VehicleState::shared();
        let (stop, handle) = spawn_loop(vehicle.clone(), config_with_period(5), None, relay.clone());

        // Emissions at t=0 and t=5
        sleep(Duration::from_millis(7500)).await;
        assert_eq!(relay.count(), 2);

        // and t=10
        sleep(Duration::from_millis(5000)).await;
        assert_eq!(relay.count(), 3);

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(vehicle.run_state().await, RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_change_applies_without_restart() {
        let relay = Arc::new(RecordingRelay::default());
        let config = config_with_period(10);
        let (stop, handle) = spawn_loop(VehicleState::shared(), config.clone(), None, relay.clone());

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(relay.count(), 1);

        config.set_telemetry_period(1.0).await;
        sleep(Duration::from_millis(3000)).await;
        // t=0, then every second from the next tick on: t=2.6, 3.6, 4.6
        assert!(relay.count() >= 3, "got {}", relay.count());

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_period_keeps_loop_running() {
        let relay = Arc::new(RecordingRelay::default());
        let vehicle = VehicleState::shared();
        let config = config_with_period(1);
        let Value::Object(update) = json!({"app_params": {"telemetry_period": 1e300}}) else {
            unreachable!()
        };
        config.replace_sections(update).await.unwrap();

        let (stop, handle) = spawn_loop(vehicle.clone(), config, None, relay.clone());

        // Falls back to the default 5s period: t=0 and t=5
        sleep(Duration::from_millis(7500)).await;
        assert_eq!(relay.count(), 2);
        assert!(!handle.is_finished());
        assert_eq!(vehicle.run_state().await, RunState::Running);

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_telemetry_period_rpc_drives_cadence() {
        let relay = Arc::new(RecordingRelay::default());
        let vehicle = VehicleState::shared();
        let config = config_with_period(1);
        let dispatcher = Dispatcher::new(
            Arc::new(MethodRegistry::standard().unwrap()),
            vehicle.clone(),
            config.clone(),
            Arc::new(LoggingActuator),
        );

        let reply = dispatcher
            .handle(br#"{"jsonrpc":"2.0","method":"set_telemetry_period","params":{"period":5},"id":1}"#)
            .await;
        let reply: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": {"success": true}, "id": 1}));

        let (stop, handle) = spawn_loop(vehicle, config, None, relay.clone());
        sleep(Duration::from_millis(12_500)).await;
        assert_eq!(relay.count(), 3);

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_sampled_every_second() {
        let relay = Arc::new(RecordingRelay::default());
        let sensor = Arc::new(CountingSensor::default());
        let vehicle = VehicleState::shared();
        let (stop, handle) = spawn_loop(
            vehicle.clone(),
            config_with_period(60),
            Some(sensor.clone()),
            relay.clone(),
        );

        sleep(Duration::from_millis(3500)).await;
        // t=0, 1, 2, 3
        assert_eq!(sensor.reads.load(Ordering::SeqCst), 4);
        let status = vehicle.status().await;
        assert_eq!(status.gps.lat, 4.0);
        assert_eq!(status.gps.lon, -4.0);

        // First telemetry was composed from the first sample
        let first = relay.last().unwrap();
        assert_eq!(first.gps.lat, 1.0);

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_loop() {
        let relay = Arc::new(FailingRelay::default());
        let vehicle = VehicleState::shared();
        let (stop, handle) = spawn_loop(
            vehicle.clone(),
            config_with_period(1),
            Some(Arc::new(BrokenSensor)),
            relay.clone(),
        );

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(relay.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(vehicle.run_state().await, RunState::Running);

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let relay = Arc::new(RecordingRelay::default());
        let vehicle = VehicleState::shared();
        let (stop, handle) = spawn_loop(vehicle.clone(), config_with_period(60), None, relay);

        while vehicle.run_state().await != RunState::Running {
            tokio::task::yield_now().await;
        }

        let started = std::time::Instant::now();
        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_millis(timing::TICK_INTERVAL_MS));
        assert_eq!(vehicle.run_state().await, RunState::Stopped);
    }

    #[tokio::test]
    async fn test_dropped_signal_sender_stops_loop() {
        let relay = Arc::new(RecordingRelay::default());
        let vehicle = VehicleState::shared();
        let (stop, handle) = spawn_loop(vehicle.clone(), config_with_period(60), None, relay);
        drop(stop);
        handle.await.unwrap().unwrap();
        assert_eq!(vehicle.run_state().await, RunState::Stopped);
    }
}
