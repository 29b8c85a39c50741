//! WAV decoding and sample-rate conversion.

use std::path::Path;

use super::AudioError;

/// Interleaved f32 samples in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedTrack {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Sample for output channel `channel`; missing channels reuse the last one
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        let source = channel.min(channels.saturating_sub(1));
        self.samples
            .get(frame * channels + source)
            .copied()
            .unwrap_or(0.0)
    }

    /// Average of all channels of one frame
    pub fn mono(&self, frame: usize) -> f32 {
        let channels = self.channels as usize;
        let start = frame * channels;
        match self.samples.get(start..start + channels) {
            Some(frame) if channels > 0 => frame.iter().sum::<f32>() / channels as f32,
            _ => 0.0,
        }
    }

    /// Linear-interpolating conversion to `target_rate`
    pub fn resampled(self, target_rate: u32) -> DecodedTrack {
        if target_rate == self.sample_rate || target_rate == 0 || self.frames() < 2 {
            return self;
        }

        let channels = self.channels as usize;
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_frames = ((self.frames() as f64) / ratio).floor() as usize;
        let last = self.frames() - 1;
        let mut samples = Vec::with_capacity(out_frames * channels);

        for frame in 0..out_frames {
            let position = frame as f64 * ratio;
            let i0 = (position.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            let t = (position - i0 as f64) as f32;
            for ch in 0..channels {
                let a = self.samples[i0 * channels + ch];
                let b = self.samples[i1 * channels + ch];
                samples.push(a + (b - a) * t);
            }
        }

        DecodedTrack {
            samples,
            channels: self.channels,
            sample_rate: target_rate,
        }
    }
}

/// Read a whole WAV file into memory
pub fn decode_wav(path: &Path) -> Result<DecodedTrack, AudioError> {
    let decode_err = |source| AudioError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let reader = hound::WavReader::open(path).map_err(decode_err)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_err)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_err)?
        }
    };

    if samples.is_empty() || spec.channels == 0 {
        return Err(AudioError::EmptyTrack(path.to_path_buf()));
    }

    log::debug!(
        "decoded {}: {} ch @ {} Hz, {} frames",
        path.display(),
        spec.channels,
        spec.sample_rate,
        samples.len() / spec.channels as usize
    );

    Ok(DecodedTrack {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}
