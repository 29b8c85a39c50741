//! cpal output stream that plays a decoded track and meters it.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::decode::{decode_wav, DecodedTrack};
use super::{AudioError, AudioTransport, PlaybackOptions};
use crate::meter::LevelMeter;

/// Read position into a track, owned by the audio callback
#[derive(Debug)]
pub struct PlaybackCursor {
    track: DecodedTrack,
    frame: usize,
    looped: bool,
}

impl PlaybackCursor {
    pub fn new(track: DecodedTrack, looped: bool) -> Self {
        Self {
            track,
            frame: 0,
            looped,
        }
    }

    pub fn finished(&self) -> bool {
        !self.looped && self.frame >= self.track.frames()
    }

    /// Fill an interleaved output buffer and collect the mono mix into `mono`
    ///
    /// Once a non-looping track ends the rest of the buffer is silence.
    pub fn fill(&mut self, out: &mut [f32], out_channels: usize, mono: &mut Vec<f32>) {
        mono.clear();
        if out_channels == 0 {
            return;
        }
        let total = self.track.frames();

        for frame_out in out.chunks_mut(out_channels) {
            if self.frame >= total && self.looped && total > 0 {
                self.frame = 0;
            }
            if self.frame >= total {
                frame_out.fill(0.0);
                mono.push(0.0);
                continue;
            }
            for (ch, sample) in frame_out.iter_mut().enumerate() {
                *sample = self.track.sample(self.frame, ch);
            }
            mono.push(self.track.mono(self.frame));
            self.frame += 1;
        }
    }
}

/// Decoded (and resampled) track, or why it could not be produced
pub type DecodeResult = Result<DecodedTrack, AudioError>;

/// Decode `path` and resample it to `target_rate` on a worker thread
///
/// Returns at once; the track arrives on the receiver.
pub fn decode_in_background(
    path: PathBuf,
    target_rate: u32,
) -> Result<Receiver<DecodeResult>, AudioError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("audio-decode".to_string())
        .spawn(move || {
            let result = decode_wav(&path).map(|track| track.resampled(target_rate));
            // The player may have been stopped meanwhile
            let _ = tx.send(result);
        })
        .map_err(AudioError::Spawn)?;
    Ok(rx)
}

/// A started track still being decoded
struct PendingTrack {
    path: PathBuf,
    options: PlaybackOptions,
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    decoded: Receiver<DecodeResult>,
}

/// Plays the soundtrack on the default output device
pub struct AudioPlayer {
    meter: LevelMeter,

    /// Track waiting for its decoder
    pending: Option<PendingTrack>,

    /// Output stream (kept alive while playing)
    stream: Option<cpal::Stream>,
}

impl AudioPlayer {
    /// Create a player that feeds `meter`; nothing is opened until [`AudioTransport::play`]
    pub fn new(meter: LevelMeter) -> Self {
        Self {
            meter,
            pending: None,
            stream: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    fn start_stream(&mut self, pending: PendingTrack, track: DecodedTrack) -> Result<(), AudioError> {
        let PendingTrack {
            path,
            options,
            device,
            config,
            ..
        } = pending;
        let channels = config.channels() as usize;
        log::info!(
            "Audio: {} @ {}Hz, playing {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate().0,
            path.display()
        );

        let mut cursor = PlaybackCursor::new(track, options.looped);
        let meter = self.meter.clone();
        let mut mono = Vec::new();

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                cursor.fill(data, channels, &mut mono);
                meter.feed(&mono);
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )?;

        if options.autostart {
            stream.play()?;
        }
        self.stream = Some(stream);
        Ok(())
    }
}

impl AudioTransport for AudioPlayer {
    fn play(&mut self, path: &Path, options: PlaybackOptions) -> Result<(), AudioError> {
        self.stop();

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device.default_output_config()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(config.sample_format()));
        }

        let decoded = decode_in_background(path.to_path_buf(), config.sample_rate().0)?;
        log::debug!("decoding {}", path.display());
        self.pending = Some(PendingTrack {
            path: path.to_path_buf(),
            options,
            device,
            config,
            decoded,
        });
        Ok(())
    }

    fn poll(&mut self) -> Option<Result<(), AudioError>> {
        let result = match self.pending.as_ref()?.decoded.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AudioError::DecoderLost(
                self.pending.as_ref()?.path.clone(),
            )),
        };
        let pending = self.pending.take()?;
        Some(result.and_then(|track| self.start_stream(pending, track)))
    }

    fn stop(&mut self) {
        self.pending = None;
        if self.stream.take().is_some() {
            log::debug!("audio stopped");
        }
        self.meter.reset();
    }
}
