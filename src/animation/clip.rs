//! Animation clip data and keyframe sampling.

use glam::{Quat, Vec3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ClipError {
    #[error("channel has no keyframes")]
    Empty,

    #[error("channel has {times} keyframe times but {values} values")]
    CountMismatch { times: usize, values: usize },

    #[error("keyframe time {0} is negative or not finite")]
    InvalidTime(f32),

    #[error("keyframe times are not sorted")]
    Unsorted,
}

/// How values between two keyframes are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold the earlier keyframe
    Step,
    /// Lerp (slerp for rotations)
    Linear,
}

/// Keyframe values of one animated property
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
    /// `targets` weights per keyframe, keyframes stored back to back
    MorphWeights { weights: Vec<f32>, targets: usize },
}

impl ChannelValues {
    fn keyframe_count(&self) -> usize {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => v.len(),
            ChannelValues::Rotation(v) => v.len(),
            ChannelValues::MorphWeights { weights, targets } => {
                if *targets == 0 {
                    0
                } else {
                    weights.len() / targets
                }
            }
        }
    }
}

/// Property value at one point in time
#[derive(Debug, Clone, PartialEq)]
pub enum SampledValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
    MorphWeights(Vec<f32>),
}

/// One animated property of one node
#[derive(Debug, Clone)]
pub struct Channel {
    /// Fragment-local node index
    pub target: usize,
    pub interpolation: Interpolation,
    times: Vec<f32>,
    values: ChannelValues,
}

impl Channel {
    pub fn new(
        target: usize,
        interpolation: Interpolation,
        times: Vec<f32>,
        values: ChannelValues,
    ) -> Result<Self, ClipError> {
        if times.is_empty() {
            return Err(ClipError::Empty);
        }
        if let Some(bad) = times.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(ClipError::InvalidTime(*bad));
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(ClipError::Unsorted);
        }
        let count = values.keyframe_count();
        let exact = match &values {
            ChannelValues::MorphWeights { weights, targets } => {
                *targets > 0 && weights.len() == times.len() * targets
            }
            _ => count == times.len(),
        };
        if !exact {
            return Err(ClipError::CountMismatch {
                times: times.len(),
                values: count,
            });
        }
        Ok(Self {
            target,
            interpolation,
            times,
            values,
        })
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn values(&self) -> &ChannelValues {
        &self.values
    }

    /// Time of the final keyframe
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Sample the channel; times outside the keyframes hold the end values
    pub fn sample(&self, time: f32) -> SampledValue {
        let (i0, i1, alpha) = self.span(time);
        let alpha = match self.interpolation {
            Interpolation::Step => 0.0,
            Interpolation::Linear => alpha,
        };
        match &self.values {
            ChannelValues::Translation(v) => SampledValue::Translation(v[i0].lerp(v[i1], alpha)),
            ChannelValues::Scale(v) => SampledValue::Scale(v[i0].lerp(v[i1], alpha)),
            ChannelValues::Rotation(v) => {
                SampledValue::Rotation(v[i0].slerp(v[i1], alpha).normalize())
            }
            ChannelValues::MorphWeights { weights, targets } => {
                let a = &weights[i0 * targets..(i0 + 1) * targets];
                let b = &weights[i1 * targets..(i1 + 1) * targets];
                SampledValue::MorphWeights(
                    a.iter().zip(b).map(|(x, y)| x + (y - x) * alpha).collect(),
                )
            }
        }
    }

    /// Surrounding keyframe indices and the blend factor between them
    fn span(&self, time: f32) -> (usize, usize, f32) {
        let last = self.times.len() - 1;
        if time <= self.times[0] {
            return (0, 0, 0.0);
        }
        if time >= self.times[last] {
            return (last, last, 0.0);
        }
        let upper = self.times.partition_point(|t| *t <= time);
        let lower = upper - 1;
        let (t0, t1) = (self.times[lower], self.times[upper]);
        let width = t1 - t0;
        let alpha = if width > 0.0 { (time - t0) / width } else { 0.0 };
        (lower, upper, alpha)
    }
}

/// Named set of channels sharing one timeline
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds; the end time of the longest channel
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .map(Channel::end_time)
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }
}
