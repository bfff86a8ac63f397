//! Internal metrics model
//!
//! Format-agnostic representation handed to downstream consumers. One
//! `MetricsData` is produced per OTLP `ResourceMetrics`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// One translated resource batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsData {
    pub resource: Resource,
    pub metrics: Vec<Metric>,
}

impl MetricsData {
    /// Count time series and points: `(series, points)`.
    pub fn counts(&self) -> (usize, usize) {
        let mut series = 0;
        let mut points = 0;
        for metric in &self.metrics {
            series += metric.timeseries.len();
            for ts in &metric.timeseries {
                points += ts.points.len();
            }
        }
        (series, points)
    }
}

/// Resource the metrics originate from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    pub fn service_name(&self) -> Option<&str> {
        self.attributes.get("service.name").map(String::as_str)
    }
}

/// Instrumentation scope that produced a metric
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentationScope {
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub descriptor: MetricDescriptor,
    pub scope: Option<InstrumentationScope>,
    pub timeseries: Vec<TimeSeries>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub kind: MetricKind,
}

/// Aggregation temporality (for Sum/Histogram types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationTemporality {
    #[default]
    Unspecified,
    Delta,
    Cumulative,
}

impl AggregationTemporality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Delta => "delta",
            Self::Cumulative => "cumulative",
        }
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::Delta,
            2 => Self::Cumulative,
            _ => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Wire metric carried no data
    Unspecified,
    Gauge,
    Sum {
        temporality: AggregationTemporality,
        monotonic: bool,
    },
    Histogram {
        temporality: AggregationTemporality,
    },
    ExponentialHistogram {
        temporality: AggregationTemporality,
    },
    Summary,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Gauge => "gauge",
            Self::Sum { .. } => "sum",
            Self::Histogram { .. } => "histogram",
            Self::ExponentialHistogram { .. } => "exponential_histogram",
            Self::Summary => "summary",
        }
    }

    /// Temporality for the aggregating kinds
    pub fn temporality(&self) -> Option<AggregationTemporality> {
        match self {
            Self::Sum { temporality, .. }
            | Self::Histogram { temporality }
            | Self::ExponentialHistogram { temporality } => Some(*temporality),
            Self::Unspecified | Self::Gauge | Self::Summary => None,
        }
    }
}

/// Points sharing one label set and start time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub start_timestamp: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub timestamp: DateTime<Utc>,
    pub value: PointValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointValue {
    Int(i64),
    Double(f64),
    Histogram(HistogramValue),
    ExponentialHistogram(ExponentialHistogramValue),
    Summary(SummaryValue),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramValue {
    pub count: u64,
    pub sum: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Upper bounds; `bucket_counts` has one more entry than this
    pub explicit_bounds: Vec<f64>,
    pub bucket_counts: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExponentialHistogramValue {
    pub count: u64,
    pub sum: Option<f64>,
    pub scale: i32,
    pub zero_count: u64,
    pub zero_threshold: f64,
    pub positive: ExponentialBuckets,
    pub negative: ExponentialBuckets,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExponentialBuckets {
    pub offset: i32,
    pub bucket_counts: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryValue {
    pub count: u64,
    pub sum: f64,
    /// `(quantile, value)` pairs in wire order
    pub quantiles: Vec<(f64, f64)>,
}
