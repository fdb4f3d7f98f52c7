use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Phase of a solve that gets its own timing entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SolveStage {
    /// Nearest-neighbour upsampling of the observations at construction.
    ObservationUpsampling,
    /// Full IRLS loop over one channel group.
    #[serde(rename_all = "camelCase")]
    ChannelGroup {
        group: usize,
        outer_iterations: usize,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: SolveStage,
    pub elapsed_ms: f64,
}

/// Wall-clock trace of one solve. `total_ms` covers the whole `solve` call;
/// the upsampling stage happens before it and is not included in the total.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, stage: SolveStage, elapsed_ms: f64) {
        self.stages.push(StageTiming { stage, elapsed_ms });
    }

    /// Sum of the recorded stage durations.
    pub fn stage_total_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }

    /// Time spent in the IRLS loop of channel group `group`.
    pub fn channel_group_ms(&self, group: usize) -> Option<f64> {
        self.stages.iter().find_map(|s| match s.stage {
            SolveStage::ChannelGroup { group: g, .. } if g == group => Some(s.elapsed_ms),
            _ => None,
        })
    }

    pub fn num_channel_groups(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s.stage, SolveStage::ChannelGroup { .. }))
            .count()
    }
}

/// Milliseconds elapsed since `start`.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
