//! Topic trajectory analysis over a mention time series
//!
//! Single entry point parameterized by [`AnalysisType`], operating on one
//! topic's chronological [`TrendPoint`] series:
//!
//! - `trend` - least-squares direction classification
//! - `lifecycle` - emerging/peak/declining/dormant phase segmentation
//! - `viral` - rolling-mean multiple anomaly detection
//! - `predict` - trailing-slope extrapolation gated on fit confidence
//!
//! A topic with zero mentions in range produces an empty-series result, not
//! an error: callers must be able to render "no data" without treating it
//! as failure.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::str::FromStr;

use crate::error::Error;
use crate::models::TrendPoint;

/// Slope magnitudes below this fraction of the mean count classify as flat
const FLAT_SLOPE_EPSILON: f64 = 0.05;

/// Near-zero floor for the dormant tail: counts at or below
/// `max(1, 5% of peak)` are considered inactive
const DORMANT_PEAK_FRACTION: f64 = 0.05;

/// Rising-attention bar for predictions, as a multiple of the series mean
const RISING_ATTENTION_MULTIPLE: f64 = 1.5;

/// Analysis mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    Trend,
    Lifecycle,
    Viral,
    Predict,
}

impl FromStr for AnalysisType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trend" => Ok(Self::Trend),
            "lifecycle" => Ok(Self::Lifecycle),
            "viral" => Ok(Self::Viral),
            "predict" => Ok(Self::Predict),
            other => Err(Error::unsupported("analysisType", other)),
        }
    }
}

/// Linear direction classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

/// Lifecycle phase labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Emerging,
    Peak,
    Declining,
    Dormant,
}

/// One contiguous run of points sharing a lifecycle phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSegment {
    pub phase: LifecyclePhase,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub points: usize,
}

/// A point flagged as anomalous by viral detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViralPoint {
    pub timestamp: DateTime<Utc>,
    pub count: u64,
    pub rolling_mean: f64,
    /// count / rolling mean
    pub multiple: f64,
}

/// Short-term extrapolation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub projected_count: f64,
    pub rising_attention_bar: f64,
    pub will_cross: bool,
    pub slope_per_hour: f64,
    /// R² of the trailing linear fit
    pub confidence: f64,
    pub lookahead_hours: u32,
}

/// Unified analysis result, tagged by mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "analysis_type", rename_all = "snake_case")]
pub enum TrendAnalysis {
    Trend {
        topic: String,
        direction: TrendDirection,
        slope: f64,
        series: Vec<TrendPoint>,
    },
    Lifecycle {
        topic: String,
        phases: Vec<PhaseSegment>,
        #[serde(skip_serializing_if = "Option::is_none")]
        first_seen: Option<DateTime<Utc>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen: Option<DateTime<Utc>>,
        peak_count: u64,
        series: Vec<TrendPoint>,
    },
    Viral {
        topic: String,
        flagged: Vec<ViralPoint>,
        max_multiple: f64,
        insufficient_data: bool,
        threshold: f64,
        time_window_hours: u32,
        series: Vec<TrendPoint>,
    },
    Predict {
        topic: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        prediction: Option<Prediction>,
        #[serde(skip_serializing_if = "Option::is_none")]
        no_prediction_reason: Option<String>,
        series: Vec<TrendPoint>,
    },
}

/// Tunables for viral and predict modes
#[derive(Debug, Clone, Copy)]
pub struct AnalysisParams {
    /// Popularity surge multiple for viral mode
    pub threshold: f64,
    /// Rolling/trailing window in hours
    pub time_window_hours: u32,
    /// Prediction horizon
    pub lookahead_hours: u32,
    /// Minimum R² to emit a prediction
    pub confidence_threshold: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            time_window_hours: 24,
            lookahead_hours: 6,
            confidence_threshold: 0.7,
        }
    }
}

/// Run one analysis mode over a topic's series
pub fn analyze(
    topic: &str,
    analysis_type: AnalysisType,
    series: Vec<TrendPoint>,
    params: &AnalysisParams,
) -> TrendAnalysis {
    match analysis_type {
        AnalysisType::Trend => analyze_trend(topic, series),
        AnalysisType::Lifecycle => analyze_lifecycle(topic, series),
        AnalysisType::Viral => analyze_viral(topic, series, params),
        AnalysisType::Predict => analyze_predict(topic, series, params),
    }
}

/// Least-squares slope over (index, count) pairs
fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.len() < 2 {
        return (0.0, values.first().copied().unwrap_or(0.0));
    }
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return (0.0, sum_y / n);
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

fn analyze_trend(topic: &str, series: Vec<TrendPoint>) -> TrendAnalysis {
    let counts: Vec<f64> = series.iter().map(|p| p.mention_count as f64).collect();
    let (slope, _) = linear_fit(&counts);
    let mean = if counts.is_empty() {
        0.0
    } else {
        counts.iter().mean()
    };

    let direction = if mean <= f64::EPSILON || slope.abs() < FLAT_SLOPE_EPSILON * mean {
        TrendDirection::Flat
    } else if slope > 0.0 {
        TrendDirection::Rising
    } else {
        TrendDirection::Falling
    };

    TrendAnalysis::Trend {
        topic: topic.to_string(),
        direction,
        slope,
        series,
    }
}

fn analyze_lifecycle(topic: &str, series: Vec<TrendPoint>) -> TrendAnalysis {
    if series.is_empty() {
        return TrendAnalysis::Lifecycle {
            topic: topic.to_string(),
            phases: Vec::new(),
            first_seen: None,
            last_seen: None,
            peak_count: 0,
            series,
        };
    }

    let peak_idx = series
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| p.mention_count)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let peak_count = series[peak_idx].mention_count;
    let dormant_floor = ((peak_count as f64 * DORMANT_PEAK_FRACTION).floor() as u64).max(1);

    // Trailing run of near-zero counts is dormant; it may not overlap the
    // peak window, so it starts strictly after peak_idx + 1.
    let mut dormant_start = series.len();
    while dormant_start > peak_idx + 2 {
        if series[dormant_start - 1].mention_count <= dormant_floor {
            dormant_start -= 1;
        } else {
            break;
        }
    }

    let phase_of = |idx: usize| -> LifecyclePhase {
        if idx + 1 >= peak_idx && idx <= peak_idx + 1 {
            LifecyclePhase::Peak
        } else if idx < peak_idx {
            LifecyclePhase::Emerging
        } else if idx >= dormant_start {
            LifecyclePhase::Dormant
        } else {
            LifecyclePhase::Declining
        }
    };

    // Merge per-point labels into contiguous segments
    let mut phases: Vec<PhaseSegment> = Vec::new();
    for (idx, point) in series.iter().enumerate() {
        let phase = phase_of(idx);
        match phases.last_mut() {
            Some(last) if last.phase == phase => {
                last.end = point.timestamp;
                last.points += 1;
            }
            _ => phases.push(PhaseSegment {
                phase,
                start: point.timestamp,
                end: point.timestamp,
                points: 1,
            }),
        }
    }

    let first_seen = series
        .iter()
        .find(|p| p.mention_count > 0)
        .map(|p| p.timestamp);
    let last_seen = series
        .iter()
        .rev()
        .find(|p| p.mention_count > 0)
        .map(|p| p.timestamp);

    TrendAnalysis::Lifecycle {
        topic: topic.to_string(),
        phases,
        first_seen,
        last_seen,
        peak_count,
        series,
    }
}

fn analyze_viral(topic: &str, series: Vec<TrendPoint>, params: &AnalysisParams) -> TrendAnalysis {
    let window = Duration::hours(i64::from(params.time_window_hours));
    let mut flagged = Vec::new();
    let mut max_multiple = 0.0f64;
    let mut any_window = false;

    for (idx, point) in series.iter().enumerate() {
        let cutoff = point.timestamp - window;
        let trailing: Vec<f64> = series[..idx]
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .map(|p| p.mention_count as f64)
            .collect();

        // Fewer than two points in the rolling window is insufficient data
        // for this sample, never a false negative.
        if trailing.len() < 2 {
            continue;
        }
        any_window = true;

        let rolling_mean = trailing.iter().mean();
        if rolling_mean <= f64::EPSILON {
            continue;
        }
        let multiple = point.mention_count as f64 / rolling_mean;
        max_multiple = max_multiple.max(multiple);
        if multiple >= params.threshold {
            flagged.push(ViralPoint {
                timestamp: point.timestamp,
                count: point.mention_count,
                rolling_mean,
                multiple,
            });
        }
    }

    TrendAnalysis::Viral {
        topic: topic.to_string(),
        flagged,
        max_multiple,
        insufficient_data: !any_window,
        threshold: params.threshold,
        time_window_hours: params.time_window_hours,
        series,
    }
}

fn analyze_predict(topic: &str, series: Vec<TrendPoint>, params: &AnalysisParams) -> TrendAnalysis {
    let topic = topic.to_string();

    let Some(last) = series.last() else {
        return TrendAnalysis::Predict {
            topic,
            prediction: None,
            no_prediction_reason: Some("empty series".to_string()),
            series,
        };
    };

    let cutoff = last.timestamp - Duration::hours(i64::from(params.time_window_hours));
    let trailing: Vec<&TrendPoint> = series.iter().filter(|p| p.timestamp >= cutoff).collect();

    if trailing.len() < 3 {
        return TrendAnalysis::Predict {
            topic,
            prediction: None,
            no_prediction_reason: Some(format!(
                "insufficient data: {} points in trailing window, need 3",
                trailing.len()
            )),
            series,
        };
    }

    // Fit count against hours since window start so the slope is per-hour
    let t0 = trailing[0].timestamp;
    let hours: Vec<f64> = trailing
        .iter()
        .map(|p| (p.timestamp - t0).num_seconds() as f64 / 3600.0)
        .collect();
    let counts: Vec<f64> = trailing.iter().map(|p| p.mention_count as f64).collect();

    let (slope, intercept) = linear_fit_xy(&hours, &counts);
    let confidence = fit_r_squared_xy(&hours, &counts, slope, intercept);

    if confidence < params.confidence_threshold {
        return TrendAnalysis::Predict {
            topic,
            prediction: None,
            no_prediction_reason: Some(format!(
                "fit confidence {confidence:.2} below threshold {:.2}",
                params.confidence_threshold
            )),
            series,
        };
    }

    let bar = RISING_ATTENTION_MULTIPLE * series.iter().map(|p| p.mention_count as f64).mean();
    let last_hours = hours.last().copied().unwrap_or(0.0);
    let projected = (slope * (last_hours + f64::from(params.lookahead_hours)) + intercept).max(0.0);

    TrendAnalysis::Predict {
        topic,
        prediction: Some(Prediction {
            projected_count: projected,
            rising_attention_bar: bar,
            will_cross: projected >= bar,
            slope_per_hour: slope,
            confidence,
            lookahead_hours: params.lookahead_hours,
        }),
        no_prediction_reason: None,
        series,
    }
}

/// Least-squares fit over explicit (x, y) pairs
fn linear_fit_xy(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return (0.0, sum_y / n);
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

fn fit_r_squared_xy(xs: &[f64], ys: &[f64], slope: f64, intercept: f64) -> f64 {
    let mean = ys.iter().mean();
    let ss_tot: f64 = ys.iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot < f64::EPSILON {
        return 1.0;
    }
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    (1.0 - ss_res / ss_tot).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(counts: &[u64]) -> Vec<TrendPoint> {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        counts
            .iter()
            .enumerate()
            .map(|(i, &c)| TrendPoint {
                timestamp: base + Duration::hours(i as i64 * 4),
                mention_count: c,
                weighted_score: c as f64 * 0.5,
            })
            .collect()
    }

    #[test]
    fn test_analysis_type_parsing() {
        assert_eq!(AnalysisType::from_str("viral").unwrap(), AnalysisType::Viral);
        let err = AnalysisType::from_str("sideways").unwrap_err();
        assert!(matches!(err, Error::UnsupportedMode { .. }));
    }

    #[test]
    fn test_trend_rising_and_falling() {
        let rising = analyze_trend("t", series(&[1, 3, 5, 7, 9]));
        assert!(matches!(
            rising,
            TrendAnalysis::Trend {
                direction: TrendDirection::Rising,
                ..
            }
        ));

        let falling = analyze_trend("t", series(&[9, 7, 5, 3, 1]));
        assert!(matches!(
            falling,
            TrendAnalysis::Trend {
                direction: TrendDirection::Falling,
                ..
            }
        ));
    }

    #[test]
    fn test_trend_flat_on_noise() {
        let flat = analyze_trend("t", series(&[10, 10, 11, 10, 10]));
        assert!(matches!(
            flat,
            TrendAnalysis::Trend {
                direction: TrendDirection::Flat,
                ..
            }
        ));
        // Empty series is flat, not an error
        let empty = analyze_trend("t", series(&[]));
        assert!(matches!(
            empty,
            TrendAnalysis::Trend {
                direction: TrendDirection::Flat,
                ..
            }
        ));
    }

    #[test]
    fn test_lifecycle_phases_partition_series() {
        let data = series(&[1, 2, 5, 20, 6, 3, 0, 0]);
        let TrendAnalysis::Lifecycle { phases, peak_count, .. } =
            analyze_lifecycle("t", data.clone())
        else {
            panic!("wrong variant");
        };

        assert_eq!(peak_count, 20);
        let total: usize = phases.iter().map(|s| s.points).sum();
        assert_eq!(total, data.len());

        // Segments are contiguous and non-overlapping
        for pair in phases.windows(2) {
            assert!(pair[0].end < pair[1].start);
            assert_ne!(pair[0].phase, pair[1].phase);
        }

        assert_eq!(phases.first().unwrap().phase, LifecyclePhase::Emerging);
        assert_eq!(phases.last().unwrap().phase, LifecyclePhase::Dormant);
    }

    #[test]
    fn test_lifecycle_first_last_seen() {
        let data = series(&[0, 2, 8, 3, 0]);
        let TrendAnalysis::Lifecycle {
            first_seen,
            last_seen,
            ..
        } = analyze_lifecycle("t", data.clone())
        else {
            panic!("wrong variant");
        };
        assert_eq!(first_seen, Some(data[1].timestamp));
        assert_eq!(last_seen, Some(data[3].timestamp));
    }

    #[test]
    fn test_viral_flags_five_times_not_two_times() {
        // Points every 4h: trailing 24h mean over [4, 4, 4, 4] = 4
        let spiked = series(&[4, 4, 4, 4, 20]);
        let params = AnalysisParams {
            threshold: 3.0,
            time_window_hours: 24,
            ..Default::default()
        };
        let TrendAnalysis::Viral { flagged, max_multiple, insufficient_data, .. } =
            analyze_viral("t", spiked, &params)
        else {
            panic!("wrong variant");
        };
        assert!(!insufficient_data);
        assert_eq!(flagged.len(), 1);
        assert!((flagged[0].multiple - 5.0).abs() < 1e-9);
        assert!((max_multiple - 5.0).abs() < 1e-9);

        let mild = series(&[4, 4, 4, 4, 8]);
        let TrendAnalysis::Viral { flagged, .. } = analyze_viral("t", mild, &params) else {
            panic!("wrong variant");
        };
        assert!(flagged.is_empty());
    }

    #[test]
    fn test_viral_insufficient_data() {
        let short = series(&[10, 50]);
        let params = AnalysisParams::default();
        let TrendAnalysis::Viral { flagged, insufficient_data, .. } =
            analyze_viral("t", short, &params)
        else {
            panic!("wrong variant");
        };
        assert!(insufficient_data);
        assert!(flagged.is_empty());
    }

    #[test]
    fn test_predict_emits_on_clean_rise() {
        let data = series(&[2, 4, 6, 8, 10, 12]);
        let params = AnalysisParams {
            confidence_threshold: 0.7,
            lookahead_hours: 6,
            time_window_hours: 24,
            ..Default::default()
        };
        let TrendAnalysis::Predict { prediction, .. } = analyze_predict("t", data, &params) else {
            panic!("wrong variant");
        };
        let prediction = prediction.expect("clean linear rise should predict");
        assert!(prediction.confidence > 0.99);
        assert!(prediction.slope_per_hour > 0.0);
        assert!(prediction.will_cross);
    }

    #[test]
    fn test_predict_withholds_on_noise() {
        let data = series(&[10, 2, 14, 1, 13, 3]);
        let params = AnalysisParams {
            confidence_threshold: 0.7,
            ..Default::default()
        };
        let TrendAnalysis::Predict {
            prediction,
            no_prediction_reason,
            ..
        } = analyze_predict("t", data, &params)
        else {
            panic!("wrong variant");
        };
        assert!(prediction.is_none());
        assert!(no_prediction_reason.unwrap().contains("confidence"));
    }

    #[test]
    fn test_predict_needs_three_trailing_points() {
        let data = series(&[5, 6]);
        let TrendAnalysis::Predict { prediction, no_prediction_reason, .. } =
            analyze_predict("t", data, &AnalysisParams::default())
        else {
            panic!("wrong variant");
        };
        assert!(prediction.is_none());
        assert!(no_prediction_reason.unwrap().contains("insufficient"));
    }
}
