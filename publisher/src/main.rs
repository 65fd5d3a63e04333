mod feed;
mod probe;

use anyhow::Context;
use sensor_publisher_common::{DummyCloudService, PublishScheduler, PublisherConfig, SensorListener};

use feed::{SensorFeed, SimulatedSensor};
use probe::RouteProbe;

/// Our App struct that holds the scheduler and the sensor threads feeding it.
///
/// Messages go to a log-only cloud service, so the whole pipeline can be watched with
/// `RUST_LOG=info` without any account.
struct App {
    scheduler: PublishScheduler,
    feeds: Vec<SensorFeed>,
}

impl App {
    const SENSOR_PERIOD: std::time::Duration = std::time::Duration::from_secs(1);

    /// Create a new App struct.
    ///
    /// This logs in right away; publishing starts with [`App::run`].
    fn new(config: &PublisherConfig) -> anyhow::Result<Self> {
        log::info!("Starting publisher: {config:?}");

        let scheduler =
            PublishScheduler::new(config, DummyCloudService::new(), RouteProbe::default())
                .context("failed to create the publish scheduler")?;

        // One simulated sensor per quantity, each on its own thread.
        let listeners: [SensorListener; 2] =
            [scheduler.temperature_listener(), scheduler.pressure_listener()];
        let feeds = listeners
            .into_iter()
            .map(|listener| {
                let sensor = SimulatedSensor::for_kind(listener.kind());
                SensorFeed::spawn(sensor, listener, Self::SENSOR_PERIOD)
            })
            .collect::<Result<Vec<_>, _>>()
            .context("failed to spawn sensor thread")?;

        Ok(Self { scheduler, feeds })
    }

    /// Run the App until Ctrl-C is pressed.
    fn run(mut self) -> anyhow::Result<()> {
        self.scheduler.start();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()?;
        runtime
            .block_on(tokio::signal::ctrl_c())
            .context("failed to wait for Ctrl-C")?;

        log::info!("Shutting down");
        self.scheduler.close();
        for feed in self.feeds {
            feed.stop();
        }

        Ok(())
    }
}

/// Loads the config from the file given as first argument, or from the environment.
fn load_config() -> anyhow::Result<PublisherConfig> {
    match std::env::args_os().nth(1) {
        Some(path) => PublisherConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.to_string_lossy())),
        None => PublisherConfig::from_env().context("failed to load config from environment"),
    }
}

/// A minimal main function that initializes the App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = load_config()?;
    let app = App::new(&config)?;

    app.run()
}
