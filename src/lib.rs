//! Parley - multilingual translation, speech-to-text and text-to-speech
//!
//! Text translation is routed through per-pair models, falling back to a
//! two-hop translation through a pivot language. Speech recognition and
//! synthesis each run a primary engine with a secondary behind it.

pub mod cli;
pub mod command;
pub mod config;
pub mod detect;
pub mod error;
pub mod fallback;
pub mod language;
pub mod server;
pub mod services;
pub mod synthesize;
pub mod transcribe;
pub mod translate;
