// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

mod cycle;

pub use cycle::{CycleOutcome, PublishCycle};

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::channel::ChannelAddress;
use crate::config::PublisherConfig;
use crate::connectivity::{ConnectionGate, ConnectivityProbe};
use crate::error::PublishError;
use crate::messaging::{CloudService, CloudSession, Credentials, MessagingClient, QoS};
use crate::sensor::{QuantityKind, SensorCache, SensorListener};

/// Where the publish loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not scheduled.
    Idle,
    /// Timer armed, no cycle running.
    Waiting,
    /// A cycle is executing.
    Publishing,
    /// Closed for good.
    Closed,
}

enum Command {
    Start,
    Stop,
    Close,
}

struct Status {
    state: Mutex<SchedulerState>,
    messaging_ready: AtomicBool,
}

impl Status {
    fn set(&self, state: SchedulerState) {
        *self.state.lock().unwrap() = state;
    }

    fn get(&self) -> SchedulerState {
        *self.state.lock().unwrap()
    }
}

/// Periodically publishes the cached sensor values.
///
/// A single worker thread owns the timer, the login and every cycle, so they never run
/// concurrently. Sensor values come in through [`SensorListener`]s from any thread.
///
/// ```no_run
/// use sensor_publisher_common::{DummyCloudService, PublishScheduler, PublisherConfig, StaticProbe};
///
/// let config = PublisherConfig::new("account", "device", "user", "password");
/// let mut scheduler =
///     PublishScheduler::new(&config, DummyCloudService::new(), StaticProbe::Reachable)?;
///
/// scheduler.temperature_listener().on_sensor_changed(&[21.5]);
/// scheduler.start();
/// // ...
/// scheduler.close();
/// # Ok::<(), sensor_publisher_common::PublishError>(())
/// ```
pub struct PublishScheduler {
    cache: SensorCache,
    channels: ChannelAddress,
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<Status>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl PublishScheduler {
    /// Spawns the worker and kicks off the login. Nothing is published until [`Self::start`].
    ///
    /// Fails if the timing in `config` does not pass [`PublisherConfig::validate`].
    pub fn new(
        config: &PublisherConfig,
        service: impl CloudService + 'static,
        probe: impl ConnectivityProbe + 'static,
    ) -> Result<Self, PublishError> {
        config.validate()?;

        let cache = SensorCache::new();
        let channels = config.channels();
        let status = Arc::new(Status {
            state: Mutex::new(SchedulerState::Idle),
            messaging_ready: AtomicBool::new(false),
        });
        let (commands, receiver) = mpsc::unbounded_channel();

        let worker = Worker {
            cycle: PublishCycle::new(
                &config.device_id,
                channels.clone(),
                cache.clone(),
                ConnectionGate::new(Box::new(probe)),
            ),
            initial_delay: config.initial_delay(),
            publish_interval: config.publish_interval(),
            greeting: config.greeting.clone(),
            status: status.clone(),
        };

        let service: Arc<dyn CloudService> = Arc::new(service);
        let credentials = config.credentials();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(PublishError::Worker)?;

        let worker = std::thread::Builder::new()
            .name("sensor-publisher".into())
            .spawn(move || runtime.block_on(worker.run(service, credentials, receiver)))
            .map_err(PublishError::Worker)?;

        Ok(Self {
            cache,
            channels,
            commands,
            status,
            worker: Some(worker),
        })
    }

    /// Arms the first cycle after the initial delay. Restarts the countdown if already armed.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Disarms the timer. A cycle already running finishes; cached samples are kept.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Stops and shuts the worker down. Blocks until the worker thread has exited.
    pub fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        // The worker may already be gone, in which case there is nothing to tell it.
        let _ = self.commands.send(Command::Close);
        if worker.join().is_err() {
            error!("Publisher worker panicked");
        }
        self.status.set(SchedulerState::Closed);
        self.status.messaging_ready.store(false, Ordering::Release);
    }

    fn send(&self, command: Command) {
        if self.worker.is_none() || self.commands.send(command).is_err() {
            debug!("Publisher is closed, ignoring command");
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.status.get()
    }

    /// Whether the messaging channel has been established.
    pub fn is_messaging_ready(&self) -> bool {
        self.status.messaging_ready.load(Ordering::Acquire)
    }

    pub fn cache(&self) -> &SensorCache {
        &self.cache
    }

    pub fn channels(&self) -> &ChannelAddress {
        &self.channels
    }

    pub fn temperature_listener(&self) -> SensorListener {
        self.cache.listener(QuantityKind::Temperature)
    }

    pub fn pressure_listener(&self) -> SensorListener {
        self.cache.listener(QuantityKind::Pressure)
    }
}

impl Drop for PublishScheduler {
    fn drop(&mut self) {
        self.close();
    }
}

/// An established session and the messaging channel it handed out.
struct Connection {
    _session: Box<dyn CloudSession>,
    messaging: Box<dyn MessagingClient>,
}

/// Logs in, then asks for a messaging channel. Runs once; there is no retry.
async fn connect(
    service: Arc<dyn CloudService>,
    credentials: Credentials,
) -> Result<Connection, PublishError> {
    let session = service.authenticate(&credentials).await?;
    info!("Authenticated as {}", credentials.username);

    let messaging = session.request_messaging().await?;
    info!("Messaging service created");

    Ok(Connection {
        _session: session,
        messaging,
    })
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

struct Worker {
    cycle: PublishCycle,
    initial_delay: Duration,
    publish_interval: Duration,
    greeting: Option<String>,
    status: Arc<Status>,
}

impl Worker {
    async fn run(
        self,
        service: Arc<dyn CloudService>,
        credentials: Credentials,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut login = Box::pin(connect(service, credentials));
        let mut logging_in = true;
        let mut connection: Option<Connection> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            // Queued commands win over a timer that expired at the same time.
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Start) => {
                        deadline = Some(Instant::now() + self.initial_delay);
                        self.status.set(SchedulerState::Waiting);
                        info!("Publishing starts in {:?}", self.initial_delay);
                    }
                    Some(Command::Stop) => {
                        deadline = None;
                        self.status.set(SchedulerState::Idle);
                        info!("Publishing stopped");
                    }
                    Some(Command::Close) | None => break,
                },
                result = &mut login, if logging_in => {
                    logging_in = false;
                    match result {
                        Ok(established) => {
                            self.greet(&*established.messaging);
                            self.status.messaging_ready.store(true, Ordering::Release);
                            connection = Some(established);
                        }
                        Err(e) => error!("Messaging unavailable until restart: {e}"),
                    }
                }
                () = sleep_until(deadline) => {
                    self.status.set(SchedulerState::Publishing);

                    let messaging = connection.as_ref().map(|c| &*c.messaging);
                    let outcome = self.cycle.run(messaging, chrono::Utc::now().timestamp_millis());
                    debug!("Publish cycle finished: {outcome:?}");

                    // Re-armed no matter how the cycle went.
                    deadline = Some(Instant::now() + self.publish_interval);
                    self.status.set(SchedulerState::Waiting);
                }
            }
        }

        self.status.set(SchedulerState::Closed);
        self.status.messaging_ready.store(false, Ordering::Release);
        info!("Publisher closed");
    }

    fn greet(&self, messaging: &dyn MessagingClient) {
        let Some(greeting) = &self.greeting else {
            return;
        };

        let channel = self.cycle.channels().for_kind(QuantityKind::Pressure);
        if let Err(e) = messaging.publish(channel, greeting.as_bytes(), QoS::AtLeastOnce) {
            warn!("Failed to publish greeting: {e}");
        }
    }
}
