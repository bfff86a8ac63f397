//! OTLP to internal model translation
//!
//! Maps one `ResourceMetrics` to one [`MetricsData`]. Data points of a metric
//! are grouped into time series by label set and start time, in the order the
//! series are first seen.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::metrics::v1::{
    self as otlp, ResourceMetrics, exponential_histogram_data_point::Buckets, metric::Data,
    number_data_point,
};

use super::error::TranslationError;
use super::model::{
    AggregationTemporality, ExponentialBuckets, ExponentialHistogramValue, HistogramValue,
    InstrumentationScope, Metric, MetricDescriptor, MetricKind, MetricsData, Point, PointValue,
    Resource, SummaryValue, TimeSeries,
};
use crate::utils::otlp::extract_attributes;
use crate::utils::time::{nanos_to_datetime, start_nanos_to_datetime};

/// `DataPointFlags.FLAG_NO_RECORDED_VALUE`
const FLAG_NO_RECORDED_VALUE: u32 = 1;

/// Converts a wire resource batch into the internal model
pub trait Translator: Send + Sync {
    fn translate(&self, resource_metrics: &ResourceMetrics)
    -> Result<MetricsData, TranslationError>;
}

/// Default translator for OTLP protobuf metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct OtlpTranslator;

impl Translator for OtlpTranslator {
    fn translate(
        &self,
        resource_metrics: &ResourceMetrics,
    ) -> Result<MetricsData, TranslationError> {
        let resource = Resource {
            attributes: resource_metrics
                .resource
                .as_ref()
                .map(|r| extract_attributes(&r.attributes))
                .unwrap_or_default(),
        };

        let mut metrics = Vec::new();
        for scope_metrics in &resource_metrics.scope_metrics {
            let scope = scope_metrics
                .scope
                .as_ref()
                .filter(|s| !s.name.is_empty())
                .map(|s| InstrumentationScope {
                    name: s.name.clone(),
                    version: (!s.version.is_empty()).then(|| s.version.clone()),
                });

            for metric in &scope_metrics.metrics {
                metrics.push(translate_metric(metric, scope.clone())?);
            }
        }

        Ok(MetricsData { resource, metrics })
    }
}

fn translate_metric(
    metric: &otlp::Metric,
    scope: Option<InstrumentationScope>,
) -> Result<Metric, TranslationError> {
    if metric.name.is_empty() {
        return Err(TranslationError::EmptyMetricName);
    }

    let mut series = SeriesBuilder::default();

    let kind = match &metric.data {
        None => MetricKind::Unspecified,
        Some(Data::Gauge(g)) => {
            push_number_points(&mut series, &metric.name, &g.data_points)?;
            MetricKind::Gauge
        }
        Some(Data::Sum(s)) => {
            push_number_points(&mut series, &metric.name, &s.data_points)?;
            MetricKind::Sum {
                temporality: AggregationTemporality::from_i32(s.aggregation_temporality),
                monotonic: s.is_monotonic,
            }
        }
        Some(Data::Histogram(h)) => {
            for dp in h.data_points.iter().filter(|dp| has_value(dp.flags)) {
                if !dp.bucket_counts.is_empty()
                    && dp.bucket_counts.len() != dp.explicit_bounds.len() + 1
                {
                    return Err(TranslationError::InvalidHistogram {
                        metric: metric.name.clone(),
                        bucket_counts: dp.bucket_counts.len(),
                        explicit_bounds: dp.explicit_bounds.len(),
                    });
                }
                let value = PointValue::Histogram(HistogramValue {
                    count: dp.count,
                    sum: dp.sum,
                    min: dp.min,
                    max: dp.max,
                    explicit_bounds: dp.explicit_bounds.clone(),
                    bucket_counts: dp.bucket_counts.clone(),
                });
                series.push(
                    &dp.attributes,
                    dp.start_time_unix_nano,
                    dp.time_unix_nano,
                    value,
                );
            }
            MetricKind::Histogram {
                temporality: AggregationTemporality::from_i32(h.aggregation_temporality),
            }
        }
        Some(Data::ExponentialHistogram(eh)) => {
            for dp in eh.data_points.iter().filter(|dp| has_value(dp.flags)) {
                let value = PointValue::ExponentialHistogram(ExponentialHistogramValue {
                    count: dp.count,
                    sum: dp.sum,
                    scale: dp.scale,
                    zero_count: dp.zero_count,
                    zero_threshold: dp.zero_threshold,
                    positive: convert_buckets(dp.positive.as_ref()),
                    negative: convert_buckets(dp.negative.as_ref()),
                });
                series.push(
                    &dp.attributes,
                    dp.start_time_unix_nano,
                    dp.time_unix_nano,
                    value,
                );
            }
            MetricKind::ExponentialHistogram {
                temporality: AggregationTemporality::from_i32(eh.aggregation_temporality),
            }
        }
        Some(Data::Summary(s)) => {
            for dp in s.data_points.iter().filter(|dp| has_value(dp.flags)) {
                let value = PointValue::Summary(SummaryValue {
                    count: dp.count,
                    sum: dp.sum,
                    quantiles: dp
                        .quantile_values
                        .iter()
                        .map(|q| (q.quantile, q.value))
                        .collect(),
                });
                series.push(
                    &dp.attributes,
                    dp.start_time_unix_nano,
                    dp.time_unix_nano,
                    value,
                );
            }
            MetricKind::Summary
        }
    };

    Ok(Metric {
        descriptor: MetricDescriptor {
            name: metric.name.clone(),
            description: (!metric.description.is_empty()).then(|| metric.description.clone()),
            unit: (!metric.unit.is_empty()).then(|| metric.unit.clone()),
            kind,
        },
        scope,
        timeseries: series.finish(),
    })
}

fn push_number_points(
    series: &mut SeriesBuilder,
    metric: &str,
    data_points: &[otlp::NumberDataPoint],
) -> Result<(), TranslationError> {
    for dp in data_points.iter().filter(|dp| has_value(dp.flags)) {
        let value = match dp.value {
            Some(number_data_point::Value::AsInt(i)) => PointValue::Int(i),
            Some(number_data_point::Value::AsDouble(d)) => PointValue::Double(d),
            None => {
                return Err(TranslationError::MissingValue {
                    metric: metric.to_string(),
                });
            }
        };
        series.push(
            &dp.attributes,
            dp.start_time_unix_nano,
            dp.time_unix_nano,
            value,
        );
    }
    Ok(())
}

fn has_value(flags: u32) -> bool {
    flags & FLAG_NO_RECORDED_VALUE == 0
}

fn convert_buckets(buckets: Option<&Buckets>) -> ExponentialBuckets {
    buckets
        .map(|b| ExponentialBuckets {
            offset: b.offset,
            bucket_counts: b.bucket_counts.clone(),
        })
        .unwrap_or_default()
}

/// Groups points into series keyed by (labels, start time)
#[derive(Default)]
struct SeriesBuilder {
    index: HashMap<(BTreeMap<String, String>, u64), usize>,
    series: Vec<TimeSeries>,
}

impl SeriesBuilder {
    fn push(&mut self, attributes: &[KeyValue], start_nanos: u64, nanos: u64, value: PointValue) {
        let point = Point {
            timestamp: nanos_to_datetime(nanos),
            value,
        };
        match self.index.entry((extract_attributes(attributes), start_nanos)) {
            Entry::Occupied(entry) => self.series[*entry.get()].points.push(point),
            Entry::Vacant(entry) => {
                self.series.push(TimeSeries {
                    start_timestamp: start_nanos_to_datetime(start_nanos),
                    labels: entry.key().0.clone(),
                    points: vec![point],
                });
                entry.insert(self.series.len() - 1);
            }
        }
    }

    fn finish(self) -> Vec<TimeSeries> {
        self.series
    }
}
