/// Pulse Harness - drives the playback engine against in-memory collaborators
use anyhow::Context;
use clap::{Parser, Subcommand};
use pulse_core::{
    FftFrame, LibrarySource, PlayerHandle, RepeatMode, SessionProvider, SettingsStore,
    ShuffleMode, TrackRef, VisualizerFactory,
};
use pulse_playback::test_utils::{FakePlayer, FakeSession, FakeVisualizerFactory, MemorySettings};
use pulse_playback::{
    Collaborators, ConnectionState, EngineConfig, PlaybackController, ResumeWorkflow,
    SharedLibrary,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Frame delivery period of the simulated capture
const FRAME_PERIOD: Duration = Duration::from_millis(50);

/// Kick drum period (120 BPM)
const KICK_EVERY_FRAMES: u64 = 10;

#[derive(Parser)]
#[command(name = "pulse-harness")]
#[command(about = "Headless driver for the Pulse playback engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted listening session and print state snapshots
    Run {
        /// Seconds of simulated bass frames to feed the analysis lane
        #[arg(long, default_value_t = 4)]
        seconds: u64,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_playback=info,pulse_harness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Run { seconds } => run(config, seconds).await?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}

async fn run(config: EngineConfig, seconds: u64) -> anyhow::Result<()> {
    let tracks = demo_library();
    let library = Arc::new(SharedLibrary::with_tracks(tracks.clone()));
    let settings = Arc::new(MemorySettings::new());
    let session = Arc::new(FakeSession::new());
    let visualizers = FakeVisualizerFactory::new();

    let controller = PlaybackController::start(
        config.clone(),
        Collaborators {
            session: Arc::clone(&session) as Arc<dyn SessionProvider>,
            library: Arc::clone(&library) as Arc<dyn LibrarySource>,
            settings: Arc::clone(&settings) as Arc<dyn SettingsStore>,
            visualizers: Arc::new(visualizers.clone()) as Arc<dyn VisualizerFactory>,
        },
    )
    .context("starting playback controller")?;

    let resume = ResumeWorkflow::new(
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
        Arc::clone(&library) as Arc<dyn LibrarySource>,
        &config,
    );

    // First session: play, queue, analyse, pause
    let player = Arc::new(FakePlayer::new().with_audio_session_id(1));
    session.connect_player(Arc::clone(&player) as Arc<dyn PlayerHandle>);
    wait_attached(&controller, &player).await?;
    snapshot(&controller, "connected")?;

    controller
        .initiate_playback(tracks[0].clone(), RepeatMode::All, ShuffleMode::Off)
        .await;
    controller.add_audio_to_queue_next(tracks[3].clone()).await;
    tracing::info!(
        "Queue: {:?}",
        controller
            .queue()
            .iter()
            .map(|track| track.title.as_str())
            .collect::<Vec<_>>()
    );
    snapshot(&controller, "playing")?;

    feed_frames(&visualizers, &player, seconds).await;
    snapshot(&controller, "analysed")?;

    controller.seek_to(60_000).await;
    if resume.save(&controller) {
        tracing::info!("Saved playback point");
    }
    controller.play_pause().await;
    snapshot(&controller, "paused")?;

    session.disconnect();
    wait_for_connection(&controller, ConnectionState::Disconnected).await?;
    snapshot(&controller, "disconnected")?;

    // Second session: pick up where we left off
    let player = Arc::new(FakePlayer::new().with_audio_session_id(2));
    session.connect_player(Arc::clone(&player) as Arc<dyn PlayerHandle>);
    wait_attached(&controller, &player).await?;

    let outcome = resume.resume(&controller).await;
    tracing::info!("Resume: {:?}", outcome);
    snapshot(&controller, "resumed")?;

    controller.release_player().await;
    tracing::info!("Harness finished");
    Ok(())
}

fn demo_library() -> Vec<TrackRef> {
    [
        ("1", "Night Drive", "Neon Coast", 214_000),
        ("2", "Low Tide", "Neon Coast", 187_000),
        ("3", "Glass Harbour", "The Pilots", 242_000),
        ("4", "Undertow", "The Pilots", 199_000),
    ]
    .into_iter()
    .map(|(id, title, artist, duration_ms)| {
        TrackRef::new(id, format!("content://media/external/audio/{id}"), title)
            .with_artist(artist)
            .with_album("Harness Sessions")
            .with_duration_ms(duration_ms)
    })
    .collect()
}

/// Push a kick every half second with quiet frames in between, while
/// moving the player's position along with the frames
async fn feed_frames(visualizers: &FakeVisualizerFactory, player: &FakePlayer, seconds: u64) {
    let frames = seconds * 1_000 / FRAME_PERIOD.as_millis() as u64;
    let mut ticker = tokio::time::interval(FRAME_PERIOD);

    for n in 0..frames {
        ticker.tick().await;
        let level = if n % KICK_EVERY_FRAMES == 0 { 120 } else { 4 };
        if !visualizers.push_frame(bass_frame(level)) {
            tracing::debug!("Frame {} not delivered", n);
        }
        player.advance_ms(FRAME_PERIOD.as_millis() as i64);
    }
}

/// 512 bins at 44.1 kHz with energy in the 50-150 Hz band
fn bass_frame(level: u8) -> FftFrame {
    let mut data = vec![0u8; 1024];
    for bin in 1..=3 {
        data[bin * 2] = level;
    }
    FftFrame::new(data, 44_100)
}

async fn wait_attached(controller: &PlaybackController, player: &FakePlayer) -> anyhow::Result<()> {
    wait_for_connection(controller, ConnectionState::Connected).await?;
    tokio::time::timeout(Duration::from_secs(5), async {
        while player.listener_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("player was never attached")?;
    controller.refresh().await;
    Ok(())
}

async fn wait_for_connection(
    controller: &PlaybackController,
    target: ConnectionState,
) -> anyhow::Result<()> {
    let mut connection = controller.connection_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        connection.wait_for(|state| *state == target),
    )
    .await
    .with_context(|| format!("timed out waiting for {target:?}"))?
    .context("session connector stopped")?;
    Ok(())
}

fn snapshot(controller: &PlaybackController, label: &str) -> anyhow::Result<()> {
    let state = controller.state();
    println!("== {label} ==");
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
