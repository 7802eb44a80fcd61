use chord_blobs::config::Config;
use chord_blobs::console_display::{format_sequence, make_bar, ConsoleDisplay};
use chord_blobs::graph::ChordGraph;
use chord_blobs::osc_sender::OscSynth;
use chord_blobs::play_session::PlaySession;
use chord_blobs::playback_session::PlaybackSession;
use chord_blobs::progression::ProgressionEngine;
use chord_blobs::render::SceneGraph;
use chord_blobs::share;
use chord_blobs::simulator::{AutoPlayer, TapStrategy};
use chord_blobs::synth::{LogSynth, SynthFanout, SynthHandle, SynthWorker, Synthesizer};
use chord_blobs::wav_writer::WavSynth;

use clap::Parser;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(name = "chord-blobs")]
#[command(about = "Tap floating chord blobs to build a progression, then hear it replayed")]
struct Cli {
    /// Chord graph JSON (defaults to the built-in jazz graph)
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Tuning config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// RNG seed (defaults to the wall clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Canvas width
    #[arg(long, default_value_t = 1024.0)]
    width: f32,

    /// Canvas height
    #[arg(long, default_value_t = 768.0)]
    height: f32,

    /// Simulation frame rate
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Give up on a phase after this many frames
    #[arg(long, default_value_t = 60 * 120)]
    max_frames: u64,

    /// Pace frames at --fps instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Skip the play phase and replay this progression. Accepts a
    /// comma list ("Imaj7,V7,Imaj7") or a share query/link.
    #[arg(long)]
    chords: Option<String>,

    /// How the simulated player picks blobs
    #[arg(long, value_enum, default_value_t = TapStrategy::Random)]
    strategy: TapStrategy,

    /// OSC target address
    #[arg(long, default_value = "127.0.0.1:9000")]
    osc_target: String,

    /// Enable OSC output
    #[arg(long)]
    osc: bool,

    /// Render every sounded chord into this WAV file
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Enable console display (terminal TUI)
    #[arg(long)]
    console: bool,

    /// Console display refresh rate (Hz)
    #[arg(long, default_value_t = 20)]
    display_hz: u32,

    /// Playback page the share link points at
    #[arg(long, default_value = "http://localhost:3000/playback")]
    share_base: String,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    let config = cli
        .config
        .as_deref()
        .and_then(Config::load)
        .unwrap_or_default();

    if let Some(path) = &cli.write_config {
        match config.save(path) {
            Ok(()) => info!("Config written to {:?}", path),
            Err(e) => error!("Failed to write config {:?}: {}", path, e),
        }
        return;
    }

    let graph = match &cli.graph {
        Some(path) => ChordGraph::load(path),
        None => ChordGraph::jazz(),
    };
    let graph = match graph {
        Ok(g) => g,
        Err(e) => {
            error!("Chord graph unusable: {}", e);
            std::process::exit(1);
        }
    };

    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });

    info!("═══════════════════════════════════════════════");
    info!("  CHORD BLOBS v{}", env!("CARGO_PKG_VERSION"));
    info!("  Graph: {}", graph.name);
    info!("  Seed: {}", seed);
    info!("  Canvas: {}×{} @ {} fps", cli.width, cli.height, cli.fps);
    if cli.osc { info!("  Audio: OSC → {}", cli.osc_target); }
    if let Some(wav) = &cli.wav { info!("  Audio: WAV → {:?}", wav); }
    if cli.console { info!("  UI: Console TUI"); }
    info!("═══════════════════════════════════════════════");

    let mut handles = Vec::new();

    // ─── Synth worker ───────────────────────────────────────────────
    let (synth, synth_rx) = SynthHandle::channel();
    let mut backends: Vec<Box<dyn Synthesizer>> = Vec::new();
    if cli.osc {
        backends.push(Box::new(OscSynth::new(cli.osc_target.clone())));
    }
    if let Some(path) = &cli.wav {
        backends.push(Box::new(WavSynth::new(path)));
    }
    if backends.is_empty() {
        backends.push(Box::new(LogSynth));
    }
    handles.push(thread::Builder::new().name("synth".into()).spawn(move || {
        SynthWorker::new(synth_rx, SynthFanout::new(backends)).run();
    }).unwrap());

    let dt = Duration::from_micros(1_000_000 / u64::from(cli.fps.max(1)));
    let mut rng = StdRng::seed_from_u64(seed);
    let mut display = cli
        .console
        .then(|| ConsoleDisplay::new(100, 30, cli.display_hz, cli.fps));

    // ─── Play phase ─────────────────────────────────────────────────
    let (chords, offset) = match &cli.chords {
        Some(input) => {
            let chords = if input.contains('=') {
                share::decode_query(input).unwrap_or_default()
            } else {
                share::decode_chords(input)
            };
            (chords, Duration::ZERO)
        }
        None => play(&cli, &config, graph, synth.clone(), dt, &mut rng, display.as_mut()),
    };

    if chords.is_empty() {
        warn!("No progression to replay");
    }

    // ─── Playback phase ─────────────────────────────────────────────
    let mut scene = SceneGraph::new(cli.width, cli.height);
    let mut playback = PlaybackSession::new(
        chords.clone(),
        config.clone(),
        synth.with_offset(offset),
        &mut scene,
        &mut rng,
    );
    playback.activate();
    let mut frames = 0;
    while !playback.is_complete() && frames < cli.max_frames {
        playback.tick(dt, &mut scene);
        frames += 1;
        if let Some(d) = display.as_mut() {
            d.frame(&scene, &format_sequence(&chords), "playback");
        }
        if cli.realtime {
            thread::sleep(dt);
        }
    }
    if !playback.is_complete() {
        warn!("Playback stopped after {} frames", frames);
    }
    playback.teardown(&mut scene);
    drop(playback);

    info!("Progression: {}", chords.join(" - "));
    println!("{}", share::share_url(&cli.share_base, &chords));

    for h in handles {
        let _ = h.join();
    }
}

/// Auto-play one session to completion. Returns the chords and the session
/// time it took, so playback sounds land after it on a shared timeline.
fn play(
    cli: &Cli,
    config: &Config,
    graph: ChordGraph,
    synth: SynthHandle,
    dt: Duration,
    rng: &mut StdRng,
    mut display: Option<&mut ConsoleDisplay>,
) -> (Vec<String>, Duration) {
    let mut scene = SceneGraph::new(cli.width, cli.height);
    let engine = ProgressionEngine::new(graph, rng)
        .with_tonic_fallback_weight(config.progression.tonic_fallback_weight);
    let session_rng = StdRng::seed_from_u64(rng.gen());
    let player_rng = StdRng::seed_from_u64(rng.gen());

    let gesture = synth.clone();
    let mut session = PlaySession::new(engine, config.clone(), synth, &mut scene, session_rng);
    let mut player = AutoPlayer::new(player_rng, cli.strategy);
    let mut activated = false;
    let max = config.progression.max_chord_count;

    let mut frames = 0;
    while !session.is_complete() && frames < cli.max_frames {
        session.tick(dt, &mut scene);
        frames += 1;
        if let Some(p) = player.poll(session.blobs(), session.clock().elapsed()) {
            // The first tap is the gesture that unlocks audio.
            if !activated {
                gesture.activate();
                activated = true;
            }
            session.tap_at(p, &mut scene);
        }
        if let Some(d) = display.as_deref_mut() {
            let footer = format!("{}  {}", make_bar(session.log().steps(), max, 20), session.offered().join("  "));
            d.frame(&scene, &format_sequence(session.chords()), &footer);
        }
        if cli.realtime {
            thread::sleep(dt);
        }
    }

    if !session.is_complete() {
        warn!("Play phase stopped after {} frames", frames);
    }
    let chords = session.chords().to_vec();
    let elapsed = session.clock().elapsed();
    session.teardown(&mut scene);
    (chords, elapsed)
}
