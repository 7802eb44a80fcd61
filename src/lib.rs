pub mod blob;
pub mod chord_function;
pub mod chord_translator;
pub mod config;
pub mod console_display;
pub mod graph;
pub mod osc_sender;
pub mod play_session;
pub mod playback_session;
pub mod positioner;
pub mod progression;
pub mod render;
pub mod share;
pub mod simulation;
pub mod simulator;
pub mod synth;
pub mod types;
pub mod wav_writer;
