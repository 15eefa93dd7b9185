// Monitor service - single task that serializes every engine mutation
use crate::application::link_session::{ConnectOutcome, ConnectResult, SendError};
use crate::application::telemetry_engine::TelemetryEngine;
use crate::application::transport::{Transport, TransportError};
use crate::domain::command::Command;
use crate::domain::plot::PlotRange;
use crate::domain::snapshot::TelemetrySnapshot;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

const REQUEST_QUEUE_DEPTH: usize = 32;
const CONNECT_QUEUE_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct MonitorTiming {
    /// Telemetry tick: one line decoded per tick
    pub tick: Duration,
    /// Reconnect tick while disconnected
    pub reconnect: Duration,
    /// Device boot time after the port opens
    pub settle: Duration,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            reconnect: Duration::from_secs(1),
            settle: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotAdjust {
    Increase,
    Decrease,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor task has stopped")]
    Stopped,
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

enum MonitorRequest {
    ClearAll(oneshot::Sender<()>),
    Send(Command, oneshot::Sender<Result<(), SendError>>),
    SelectPort(String, oneshot::Sender<()>),
    AdjustPlot(PlotAdjust, oneshot::Sender<PlotRange>),
}

/// Cheap, cloneable front door used by renderers.
#[derive(Clone)]
pub struct MonitorHandle {
    requests: mpsc::Sender<MonitorRequest>,
    snapshots: watch::Receiver<TelemetrySnapshot>,
    transport: Arc<dyn Transport>,
}

impl MonitorHandle {
    /// Latest published snapshot; never waits on the device
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.snapshots.clone()
    }

    pub async fn clear_all(&self) -> Result<(), MonitorError> {
        self.request(MonitorRequest::ClearAll).await
    }

    pub async fn send(&self, command: Command) -> Result<(), MonitorError> {
        self.request(|reply| MonitorRequest::Send(command, reply))
            .await?
            .map_err(MonitorError::from)
    }

    pub async fn select_port(&self, port_id: impl Into<String>) -> Result<(), MonitorError> {
        let port_id = port_id.into();
        self.request(|reply| MonitorRequest::SelectPort(port_id, reply))
            .await
    }

    pub async fn adjust_plot(&self, adjust: PlotAdjust) -> Result<PlotRange, MonitorError> {
        self.request(|reply| MonitorRequest::AdjustPlot(adjust, reply))
            .await
    }

    pub async fn list_ports(&self) -> Result<Vec<String>, MonitorError> {
        Ok(self.transport.list_ports().await?)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> MonitorRequest,
    ) -> Result<T, MonitorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(build(reply_tx))
            .await
            .map_err(|_| MonitorError::Stopped)?;
        reply_rx.await.map_err(|_| MonitorError::Stopped)
    }
}

pub struct MonitorService {
    driver: Driver,
    requests: mpsc::Receiver<MonitorRequest>,
    connects: mpsc::Receiver<ConnectResult>,
}

struct Driver {
    engine: TelemetryEngine,
    transport: Arc<dyn Transport>,
    timing: MonitorTiming,
    snapshots: watch::Sender<TelemetrySnapshot>,
    connect_tx: mpsc::Sender<ConnectResult>,
}

impl MonitorService {
    pub fn new(
        engine: TelemetryEngine,
        transport: Arc<dyn Transport>,
        timing: MonitorTiming,
    ) -> (Self, MonitorHandle) {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let (connect_tx, connect_rx) = mpsc::channel(CONNECT_QUEUE_DEPTH);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

        let handle = MonitorHandle {
            requests: request_tx,
            snapshots: snapshot_rx,
            transport: transport.clone(),
        };

        let service = Self {
            driver: Driver {
                engine,
                transport,
                timing,
                snapshots: snapshot_tx,
                connect_tx,
            },
            requests: request_rx,
            connects: connect_rx,
        };

        (service, handle)
    }

    /// Run until `shutdown` resolves, then release the serial handle.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let MonitorService {
            mut driver,
            mut requests,
            mut connects,
        } = self;

        let mut telemetry = tokio::time::interval(driver.timing.tick);
        telemetry.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut reconnect = tokio::time::interval(driver.timing.reconnect);
        reconnect.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        tracing::info!(
            "Monitor started (tick {:?}, reconnect {:?})",
            driver.timing.tick,
            driver.timing.reconnect
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = telemetry.tick() => driver.on_tick(),
                _ = reconnect.tick() => driver.on_reconnect(),
                Some(result) = connects.recv() => driver.on_connect_result(result),
                Some(request) = requests.recv() => driver.on_request(request),
            }
        }

        driver.engine.shutdown();
        driver.publish();
        tracing::info!("Monitor stopped");
    }
}

impl Driver {
    fn on_tick(&mut self) {
        let before = self.engine.status();
        let event = self.engine.tick();
        if event.is_some() || self.engine.status() != before {
            self.publish();
        }
    }

    fn on_reconnect(&mut self) {
        let Some(attempt) = self.engine.begin_connect() else {
            return;
        };
        self.publish();

        let transport = self.transport.clone();
        let connect_tx = self.connect_tx.clone();
        let settle = self.timing.settle;
        tokio::spawn(async move {
            let result = attempt.run(transport, settle).await;
            // Receiver gone means the monitor stopped; the handle is dropped with the result
            let _ = connect_tx.send(result).await;
        });
    }

    fn on_connect_result(&mut self, result: ConnectResult) {
        if self.engine.complete_connect(result) != ConnectOutcome::Discarded {
            self.publish();
        }
    }

    fn on_request(&mut self, request: MonitorRequest) {
        match request {
            MonitorRequest::ClearAll(reply) => {
                self.engine.clear_all();
                self.publish();
                let _ = reply.send(());
            }
            MonitorRequest::Send(command, reply) => {
                let sent = self.engine.send(&command);
                self.publish();
                let _ = reply.send(sent);
            }
            MonitorRequest::SelectPort(port_id, reply) => {
                self.engine.select_port(port_id);
                self.publish();
                let _ = reply.send(());
            }
            MonitorRequest::AdjustPlot(adjust, reply) => {
                let plot = self.engine.plot_mut();
                match adjust {
                    PlotAdjust::Increase => plot.increase(),
                    PlotAdjust::Decrease => plot.decrease(),
                }
                let range = *plot;
                self.publish();
                let _ = reply.send(range);
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.engine.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::link_session::LinkSession;
    use crate::application::telemetry_engine::EngineOptions;
    use crate::application::test_support::{ScriptedDevice, ScriptedTransport};
    use crate::domain::device_status::LinkState;

    fn start(
        transport: Arc<dyn Transport>,
    ) -> (MonitorHandle, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let engine = TelemetryEngine::new(
            LinkSession::new("COM7", 9600),
            EngineOptions::default(),
            PlotRange::default(),
        );
        let (service, handle) = MonitorService::new(engine, transport, MonitorTiming::default());
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(service.run(async move {
            let _ = stop_rx.await;
        }));
        (handle, stop_tx, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_stream_send_and_disconnect() {
        let device = ScriptedDevice::default();
        let (handle, stop, task) = start(Arc::new(ScriptedTransport::new(device.clone())));
        let mut snapshots = handle.subscribe();

        snapshots
            .wait_for(|s| s.status.link == LinkState::Connected)
            .await
            .unwrap();

        device.push_line("100.5");
        device.push_line("p2150");
        device.push_line("101");
        snapshots
            .wait_for(|s| s.series.len() == 2 && s.peaks.len() == 1)
            .await
            .unwrap();

        handle.send(Command::Threshold(5)).await.unwrap();
        assert_eq!(device.written(), vec!["T5".to_string()]);

        device.unplug();
        let snapshot = snapshots
            .wait_for(|s| s.status.link == LinkState::Disconnected)
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.series, vec![100.5, 101.0]);
        assert_eq!(snapshot.latest_peak, Some(150.0));
        assert_eq!(snapshot.status_label, "COM7 Inactive");

        stop.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_rejected_while_disconnected() {
        let device = ScriptedDevice::default();
        let transport = ScriptedTransport::new(device.clone());
        transport.refuse("COM7");
        let (handle, stop, task) = start(Arc::new(transport));

        let err = handle.send(Command::Calibration(10)).await.unwrap_err();
        assert!(matches!(err, MonitorError::Send(SendError::NotConnected)));
        assert!(device.written().is_empty());

        stop.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_port_change_discards_in_flight_connect() {
        let device = ScriptedDevice::default();
        let transport =
            Arc::new(ScriptedTransport::new(device.clone()).with_open_delay(Duration::from_millis(500)));
        let (handle, stop, task) = start(transport.clone());
        let mut snapshots = handle.subscribe();

        snapshots
            .wait_for(|s| s.status.link == LinkState::Connecting)
            .await
            .unwrap();
        handle.select_port("COM3").await.unwrap();
        assert_eq!(handle.snapshot().status.link, LinkState::Disconnected);

        let snapshot = snapshots
            .wait_for(|s| s.status.link == LinkState::Connected)
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.port, "COM3");
        assert_eq!(transport.opened(), vec!["COM7".to_string(), "COM3".to_string()]);
        assert_eq!(device.closed_count(), 1);

        stop.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_and_plot_requests() {
        let device = ScriptedDevice::default();
        let (handle, stop, task) = start(Arc::new(ScriptedTransport::new(device.clone())));
        let mut snapshots = handle.subscribe();
        snapshots
            .wait_for(|s| s.status.link == LinkState::Connected)
            .await
            .unwrap();

        device.push_line("7");
        device.push_line("p17");
        snapshots.wait_for(|s| s.peaks.len() == 1).await.unwrap();

        handle.clear_all().await.unwrap();
        let snapshot = handle.snapshot();
        assert!(snapshot.series.is_empty());
        assert!(snapshot.peaks.is_empty());

        let range = handle.adjust_plot(PlotAdjust::Increase).await.unwrap();
        assert_eq!(range.y_max, 2250);
        assert_eq!(handle.snapshot().plot.y_max, 2250);

        stop.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_handle() {
        let device = ScriptedDevice::default();
        let (handle, stop, task) = start(Arc::new(ScriptedTransport::new(device.clone())));
        let mut snapshots = handle.subscribe();
        snapshots
            .wait_for(|s| s.status.link == LinkState::Connected)
            .await
            .unwrap();

        stop.send(()).unwrap();
        task.await.unwrap();

        assert_eq!(device.closed_count(), 1);
        assert!(matches!(handle.clear_all().await, Err(MonitorError::Stopped)));
    }
}
