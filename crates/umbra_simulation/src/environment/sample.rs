//! Агрегированный environment sample (эфемерный, на один update)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Как сводить несколько вкладов в один сигнал
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggregationPolicy {
    /// Среднее арифметическое
    #[default]
    Mean,
    /// Самый сильный вклад
    Max,
}

impl AggregationPolicy {
    pub fn combine(&self, values: &[f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            AggregationPolicy::Mean => values.iter().sum::<f32>() / values.len() as f32,
            AggregationPolicy::Max => values.iter().copied().fold(0.0, f32::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvironmentSample {
    pub concealment: f32,
    pub light_exposure: f32,
    pub noise_masking: f32,
    /// Сколько zones/elements дали concealment
    pub concealment_sources: usize,
    /// Сколько источников дали exposure (light elements + light field)
    pub light_sources: usize,
    /// Tag самого сильного источника concealment
    pub dominant_source: Option<&'static str>,
    pub light_direction: Vec3,
}

impl EnvironmentSample {
    pub fn source_count(&self) -> usize {
        self.concealment_sources + self.light_sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_max() {
        let values = [0.9, 0.1, 0.2];
        assert!((AggregationPolicy::Mean.combine(&values) - 0.4).abs() < 1e-6);
        assert_eq!(AggregationPolicy::Max.combine(&values), 0.9);
        assert_eq!(AggregationPolicy::Mean.combine(&[]), 0.0);
    }
}
