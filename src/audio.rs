//! Soundtrack playback and the transport seam the session starts it through.
//!
//! The player decodes a WAV track with hound on a worker thread, streams it
//! through cpal once decoding finishes and feeds every output block into a
//! [`LevelMeter`](crate::meter::LevelMeter) so the meter reads whatever is
//! actually audible.

mod decode;
mod player;

pub use decode::{decode_wav, DecodedTrack};
pub use player::{decode_in_background, AudioPlayer, DecodeResult, PlaybackCursor};

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,

    #[error("unsupported output sample format {0:?} (only f32 is supported)")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("{} contains no audio frames", .0.display())]
    EmptyTrack(PathBuf),

    #[error("could not start decoder thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("decoder for {} exited without a result", .0.display())]
    DecoderLost(PathBuf),

    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// How a track should be played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Restart from the beginning when the track ends
    pub looped: bool,
    /// Start output as soon as the stream is built
    pub autostart: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            looped: true,
            autostart: true,
        }
    }
}

/// Something that can play the session's soundtrack
///
/// `play` only starts loading and must not block on decoding. The caller
/// drives the rest with `poll` from the same thread.
pub trait AudioTransport {
    /// Begin loading `path`; errors here are the ones known immediately
    fn play(&mut self, path: &Path, options: PlaybackOptions) -> Result<(), AudioError>;

    /// Finish a pending start if its track is ready
    ///
    /// Yields the outcome once per `play`, `None` while still loading or idle.
    fn poll(&mut self) -> Option<Result<(), AudioError>>;

    fn stop(&mut self);
}
