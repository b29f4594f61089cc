//! Relative strength of a growth proxy against a broad-market proxy.
//!
//! The ratio A/B is taken over the common dates of both series and rebased
//! so its first valid value is exactly 100.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::sma::sma_of_series;
use crate::domain::signal::to_options;
use crate::domain::{IndexSeries, RatioPoint, StyleLeadership, StyleSignal, StyleTrend};

/// Rebased ratio line plus its moving average, aligned by position.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeStrength {
    pub points: Vec<RatioPoint>,
    pub ma: Vec<Option<f64>>,
}

impl RelativeStrength {
    pub fn current(&self) -> Option<f64> {
        self.points.last().and_then(|p| p.value)
    }
}

pub fn relative_strength(a: &IndexSeries, b: &IndexSeries, window: usize) -> RelativeStrength {
    let denominators: BTreeMap<NaiveDate, f64> =
        b.bars().iter().map(|bar| (bar.date, bar.close)).collect();

    let raw: Vec<(NaiveDate, Option<f64>)> = a
        .bars()
        .iter()
        .filter_map(|bar| {
            let denom = *denominators.get(&bar.date)?;
            let ratio = if denom == 0.0 || !denom.is_finite() {
                None
            } else {
                Some(bar.close / denom)
            };
            Some((bar.date, ratio.filter(|r| r.is_finite())))
        })
        .collect();

    // Rebasing on a zero ratio would make every later point infinite.
    let base = raw.iter().find_map(|(_, r)| r.filter(|v| *v != 0.0));

    let points: Vec<RatioPoint> = raw
        .into_iter()
        .map(|(date, ratio)| RatioPoint {
            date,
            value: match (ratio, base) {
                (Some(r), Some(base)) => Some(r / base * 100.0),
                _ => None,
            },
        })
        .collect();

    let values: Vec<f64> = points
        .iter()
        .map(|p| p.value.unwrap_or(f64::NAN))
        .collect();
    let ma = to_options(&sma_of_series(&values, window));

    RelativeStrength { points, ma }
}

/// Compares the latest ratio to the one before it. Only a strict rise counts
/// as growth leadership; a tie falls through to value.
pub fn classify_style(points: &[RatioPoint]) -> Option<(StyleTrend, StyleLeadership)> {
    let [.., prev, current] = points else {
        return None;
    };

    let rising = matches!((current.value, prev.value), (Some(c), Some(p)) if c > p);
    Some(if rising {
        (StyleTrend::Strengthening, StyleLeadership::Growth)
    } else {
        (StyleTrend::Weakening, StyleLeadership::Value)
    })
}

/// `None` when the two series share fewer than two dates.
pub fn style_signal(growth: &IndexSeries, broad: &IndexSeries, window: usize) -> Option<StyleSignal> {
    let rs = relative_strength(growth, broad, window);
    let (trend, suggestion) = classify_style(&rs.points)?;

    Some(StyleSignal {
        growth_code: growth.code().to_string(),
        broad_code: broad.code().to_string(),
        current_ratio: rs.current(),
        trend,
        suggestion,
        description: format!("{} / {} relative strength", growth.name(), broad.name()),
        ratio_series: rs.points,
        ratio_ma: rs.ma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};
    use proptest::prelude::*;

    #[test]
    fn first_point_is_exactly_100() {
        let a = make_series(&[2000.0, 2100.0, 2050.0]);
        let b = make_series(&[3000.0, 3000.0, 3100.0]);
        let rs = relative_strength(&a, &b, 2);
        assert_eq!(rs.points[0].value, Some(100.0));
        assert_approx(rs.points[1].value.unwrap(), 105.0, DEFAULT_EPSILON);
        assert!(rs.ma[0].is_none());
        assert!(rs.ma[1].is_some());
    }

    #[test]
    fn only_common_dates_are_used() {
        let a = make_series(&[10.0, 11.0, 12.0, 13.0]);
        let b = make_series(&[5.0, 5.0]);
        let rs = relative_strength(&a, &b, 20);
        assert_eq!(rs.points.len(), 2);
        assert_eq!(rs.points[1].date, b.last_date().unwrap());
    }

    #[test]
    fn zero_denominator_is_missing() {
        let a = make_series(&[10.0, 11.0, 12.0]);
        let mut bars = make_series(&[5.0, 5.0, 5.0]).into_bars();
        bars[1].close = 0.0;
        let b = IndexSeries::new("B", "B", bars);
        let rs = relative_strength(&a, &b, 20);
        assert_eq!(rs.points[1].value, None);
        assert!(rs.points[2].value.is_some());
    }

    #[test]
    fn tie_is_value_leadership() {
        let a = make_series(&[10.0, 10.0]);
        let b = make_series(&[20.0, 20.0]);
        let rs = relative_strength(&a, &b, 20);
        assert_eq!(
            classify_style(&rs.points),
            Some((StyleTrend::Weakening, StyleLeadership::Value))
        );
    }

    #[test]
    fn rising_ratio_is_growth_leadership() {
        let a = make_series(&[10.0, 11.0]);
        let b = make_series(&[20.0, 20.0]);
        let signal = style_signal(&a, &b, 20).unwrap();
        assert_eq!(signal.suggestion, StyleLeadership::Growth);
        assert_eq!(signal.trend, StyleTrend::Strengthening);
        assert_approx(signal.current_ratio.unwrap(), 110.0, DEFAULT_EPSILON);
    }

    #[test]
    fn single_common_date_has_no_style() {
        let a = make_series(&[10.0]);
        let b = make_series(&[20.0, 21.0]);
        assert!(style_signal(&a, &b, 20).is_none());
    }

    fn scaled(closes: &[f64], k: f64) -> IndexSeries {
        let v: Vec<f64> = closes.iter().map(|c| c * k).collect();
        make_series(&v)
    }

    proptest! {
        #[test]
        fn first_rebased_value_is_100(
            a in prop::collection::vec(1.0f64..10_000.0, 2..60),
            b in prop::collection::vec(1.0f64..10_000.0, 2..60),
        ) {
            let rs = relative_strength(&make_series(&a), &make_series(&b), 20);
            prop_assert_eq!(rs.points[0].value, Some(100.0));
        }

        #[test]
        fn ratio_is_scale_invariant(
            pairs in prop::collection::vec((1.0f64..10_000.0, 1.0f64..10_000.0), 2..60),
            k in 0.001f64..1000.0,
        ) {
            let a: Vec<f64> = pairs.iter().map(|p| p.0).collect();
            let b: Vec<f64> = pairs.iter().map(|p| p.1).collect();
            let base = relative_strength(&make_series(&a), &make_series(&b), 20);
            let rescaled = relative_strength(&scaled(&a, k), &scaled(&b, k), 20);
            for (x, y) in base.points.iter().zip(&rescaled.points) {
                let (x, y) = (x.value.unwrap(), y.value.unwrap());
                prop_assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0));
            }
        }
    }
}
