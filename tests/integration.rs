//! End-to-end tests for the chord blob pipeline.
//!
//! These drive the same flow the binary runs:
//!   PlaySession (auto-tapped) → SynthHandle channel → SynthWorker
//!   PlaybackSession → SynthHandle channel → SynthWorker
//!
//! Sounds are collected from the crossbeam channel the sessions feed.

use crossbeam_channel::Receiver;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread;
use std::time::Duration;

use chord_blobs::chord_function::is_tonic;
use chord_blobs::chord_translator::ChordTranslator;
use chord_blobs::config::Config;
use chord_blobs::graph::ChordGraph;
use chord_blobs::play_session::PlaySession;
use chord_blobs::playback_session::PlaybackSession;
use chord_blobs::progression::ProgressionEngine;
use chord_blobs::render::SceneGraph;
use chord_blobs::share;
use chord_blobs::simulator::{AutoPlayer, TapStrategy};
use chord_blobs::synth::{SynthCommand, SynthHandle, SynthWorker};
use chord_blobs::types::FRAME_60FPS;
use chord_blobs::wav_writer::WavSynth;

// ─── Helpers ───────────────────────────────────────────────────────────────

fn sounded(rx: &Receiver<SynthCommand>) -> Vec<(String, Duration)> {
    rx.try_iter()
        .filter_map(|c| match c {
            SynthCommand::PlayChord { chord, at, .. } => Some((chord, at)),
            SynthCommand::Activate => None,
        })
        .collect()
}

/// Auto-play a session to completion; panics if it never resolves.
fn auto_play(session: &mut PlaySession, scene: &mut SceneGraph, strategy: TapStrategy, seed: u64) {
    let mut player = AutoPlayer::new(StdRng::seed_from_u64(seed), strategy)
        .with_think_time(Duration::from_millis(100), Duration::from_millis(400));
    for _ in 0..60 * 180 {
        session.tick(FRAME_60FPS, scene);
        if session.is_complete() {
            return;
        }
        if let Some(p) = player.poll(session.blobs(), session.clock().elapsed()) {
            assert!(session.hover(p), "auto-player tapped empty canvas at {:?}", p);
            session.tap_at(p, scene);
        }
    }
    panic!("session never completed: {:?}", session.chords());
}

fn temp_wav(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("chord_blobs_{}_{}.wav", name, std::process::id()))
}

// ─── Play phase ────────────────────────────────────────────────────────────

#[test]
fn test_jazz_autoplay_resolves_on_tonic() {
    for seed in [1u64, 7, 42] {
        let mut scene = SceneGraph::new(1024.0, 768.0);
        let (synth, rx) = SynthHandle::channel();
        let config = Config::default();
        let max = config.progression.max_chord_count;
        let mut rng = StdRng::seed_from_u64(seed);
        let engine = ProgressionEngine::new(ChordGraph::jazz().unwrap(), &mut rng);
        let mut session = PlaySession::new(engine, config, synth, &mut scene, StdRng::seed_from_u64(seed));

        auto_play(&mut session, &mut scene, TapStrategy::Random, seed);

        let chords = session.chords().to_vec();
        assert!(is_tonic(&chords[0]), "seed {}: started on {}", seed, chords[0]);
        assert!(is_tonic(chords.last().unwrap()), "seed {}: ended on {:?}", seed, chords);
        assert_eq!(session.log().steps(), max);
        assert_eq!(chords.len(), max + 1);

        // Every tapped chord sounded, in order, at increasing times.
        let sounds = sounded(&rx);
        let names: Vec<&str> = sounds.iter().map(|(c, _)| c.as_str()).collect();
        let tapped: Vec<&str> = chords[1..].iter().map(|c| c.as_str()).collect();
        assert_eq!(names, tapped);
        assert!(sounds.windows(2).all(|w| w[0].1 < w[1].1));
    }
}

#[test]
fn test_dead_end_falls_back_to_all_tonics() {
    let graph = ChordGraph::new("t", &["I", "V", "I2"], &[("I", "V", 0.8), ("I", "I2", 0.2)]).unwrap();
    let mut scene = SceneGraph::new(800.0, 600.0);
    let (synth, _rx) = SynthHandle::channel();
    let mut config = Config::default();
    config.progression.max_chord_count = 3;
    let engine = ProgressionEngine::with_start(graph, "I");
    let mut session = PlaySession::new(engine, config, synth, &mut scene, StdRng::seed_from_u64(3));

    let settle = |session: &mut PlaySession, scene: &mut SceneGraph| {
        for _ in 0..600 {
            session.tick(FRAME_60FPS, scene);
            if session.is_complete() || session.blobs().iter().all(|b| !b.is_expanding()) {
                return;
            }
        }
        panic!("expansion never completed");
    };

    assert_eq!(session.offered(), vec!["V", "I2"]);
    assert!(session.tap_chord("I2", &mut scene));
    settle(&mut session, &mut scene);

    // I2 has no outgoing links: every tonic is offered
    let mut offered = session.offered();
    offered.sort();
    assert_eq!(offered, vec!["I", "I2"]);

    // one step before the limit only tonic targets remain
    assert!(session.tap_chord("I", &mut scene));
    settle(&mut session, &mut scene);
    assert_eq!(session.offered(), vec!["I2"]);

    assert!(session.tap_chord("I2", &mut scene));
    settle(&mut session, &mut scene);
    assert!(session.is_complete());
    assert_eq!(session.chords(), &["I", "I2", "I", "I2"]);
}

#[test]
fn test_biggest_strategy_follows_heaviest_edges() {
    let graph = ChordGraph::new(
        "w",
        &["Imaj7", "ii7", "IV", "V7", "vi7"],
        &[
            ("Imaj7", "ii7", 0.9),
            ("Imaj7", "IV", 0.2),
            ("ii7", "V7", 0.9),
            ("ii7", "vi7", 0.1),
            ("V7", "Imaj7", 1.0),
            ("IV", "Imaj7", 1.0),
            ("vi7", "Imaj7", 1.0),
        ],
    )
    .unwrap();
    let mut scene = SceneGraph::new(1024.0, 768.0);
    let (synth, _rx) = SynthHandle::channel();
    let mut config = Config::default();
    config.progression.max_chord_count = 3;
    let engine = ProgressionEngine::with_start(graph, "Imaj7");
    let mut session = PlaySession::new(engine, config, synth, &mut scene, StdRng::seed_from_u64(11));

    auto_play(&mut session, &mut scene, TapStrategy::Biggest, 11);
    assert_eq!(session.chords(), &["Imaj7", "ii7", "V7", "Imaj7"]);
}

// ─── Playback phase ────────────────────────────────────────────────────────

#[test]
fn test_playback_from_share_link() {
    let url = share::share_url("http://localhost:3000/playback", &[
        "Imaj7".to_string(),
        "vi7".to_string(),
        "ii7".to_string(),
        "V7".to_string(),
        "Imaj7".to_string(),
    ]);
    let query = url.split_once('?').map(|(_, q)| q).unwrap();
    let chords = share::decode_query(query).unwrap();
    assert_eq!(chords, vec!["Imaj7", "vi7", "ii7", "V7", "Imaj7"]);

    let mut scene = SceneGraph::new(1024.0, 768.0);
    let (synth, rx) = SynthHandle::channel();
    let mut rng = StdRng::seed_from_u64(2);
    let mut playback = PlaybackSession::new(chords.clone(), Config::default(), synth, &mut scene, &mut rng);
    playback.activate();
    for _ in 0..60 * 20 {
        if playback.is_complete() {
            break;
        }
        playback.tick(FRAME_60FPS, &mut scene);
    }
    assert!(playback.is_complete());

    let names: Vec<String> = sounded(&rx).into_iter().map(|(c, _)| c).collect();
    assert_eq!(names, chords);
    assert_eq!(playback.share_query(), query);
}

#[test]
fn test_play_then_replay_on_one_timeline() {
    let mut scene = SceneGraph::new(1024.0, 768.0);
    let (synth, rx) = SynthHandle::channel();
    let mut config = Config::default();
    config.progression.max_chord_count = 4;
    let mut rng = StdRng::seed_from_u64(5);
    let engine = ProgressionEngine::new(ChordGraph::jazz().unwrap(), &mut rng);
    let mut session = PlaySession::new(engine, config.clone(), synth.clone(), &mut scene, StdRng::seed_from_u64(5));
    auto_play(&mut session, &mut scene, TapStrategy::Random, 5);
    let chords = session.chords().to_vec();
    let offset = session.clock().elapsed();
    session.teardown(&mut scene);
    assert!(scene.is_empty());

    let play_sounds = sounded(&rx);
    let mut playback = PlaybackSession::new(chords.clone(), config, synth.with_offset(offset), &mut scene, &mut rng);
    playback.activate();
    while !playback.is_complete() {
        playback.tick(FRAME_60FPS, &mut scene);
    }
    let replay = sounded(&rx);
    assert_eq!(replay.len(), chords.len());
    let last_play = play_sounds.last().map(|(_, at)| *at).unwrap();
    assert!(replay.iter().all(|(_, at)| *at > last_play));
}

// ─── Synth worker ──────────────────────────────────────────────────────────

#[test]
fn test_worker_renders_playback_to_wav() {
    let path = temp_wav("playback");
    let (synth, rx) = SynthHandle::channel();
    let wav = WavSynth::new(&path);
    let worker = thread::Builder::new()
        .name("synth".into())
        .spawn(move || SynthWorker::new(rx, wav).run())
        .unwrap();

    let chords: Vec<String> = ["Imaj7", "V7", "Imaj7"].iter().map(|s| s.to_string()).collect();
    let mut scene = SceneGraph::new(800.0, 600.0);
    let mut rng = StdRng::seed_from_u64(8);
    let mut playback = PlaybackSession::new(chords, Config::default(), synth, &mut scene, &mut rng);
    playback.activate();
    while !playback.is_complete() {
        playback.tick(FRAME_60FPS, &mut scene);
    }
    drop(playback);

    let (_, played) = worker.join().unwrap();
    assert_eq!(played, 3);

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    // Three drops 500ms apart plus release: well over a second of audio.
    assert!(samples.len() > spec.sample_rate as usize);
    assert!(samples.iter().any(|&s| s.abs() > 1000));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_translator_covers_jazz_graph() {
    let graph = ChordGraph::jazz().unwrap();
    let translator = ChordTranslator::new();
    for id in graph.node_ids() {
        let notes = translator.pitches(id);
        assert!(notes.len() >= 3, "{} → {:?}", id, notes);
    }
}
