//! One dimensional interpolation of a scan onto arbitrary m/z query points
use crate::error::ROIError;
use crate::modes::{Extrapolation, InterpolationKind};

/// Interpolate the signal `(x, y)` at each of `queries`.
///
/// `x` must be sorted ascending. A query outside of `[x[0], x[n - 1]]` is handled
/// according to `extrapolation`; `scan` is only used to label the error.
pub fn interpolate(
    x: &[f64],
    y: &[f64],
    queries: &[f64],
    kind: InterpolationKind,
    extrapolation: Extrapolation,
    scan: usize,
) -> Result<Vec<f64>, ROIError> {
    let mut result = Vec::with_capacity(queries.len());
    let (low, high) = match (x.first(), x.last()) {
        (Some(low), Some(high)) => (*low, *high),
        _ => {
            return match (extrapolation, queries.first()) {
                (Extrapolation::Zero, _) | (_, None) => Ok(vec![0.0; queries.len()]),
                (Extrapolation::Error, Some(q)) => Err(ROIError::OutOfDomainInterpolation {
                    scan,
                    mz: *q,
                    low: f64::NAN,
                    high: f64::NAN,
                }),
            };
        }
    };

    for q in queries.iter().copied() {
        if q.is_nan() || q < low || q > high {
            match extrapolation {
                Extrapolation::Error => {
                    return Err(ROIError::OutOfDomainInterpolation {
                        scan,
                        mz: q,
                        low,
                        high,
                    })
                }
                Extrapolation::Zero => {
                    result.push(0.0);
                    continue;
                }
            }
        }
        // First index with x[i] >= q, guaranteed to exist since q <= high
        let i = x.partition_point(|v| *v < q);
        if x[i] == q {
            result.push(y[i]);
            continue;
        }
        // x[i] != q and q >= low, so i > 0
        let (x0, x1, y0, y1) = (x[i - 1], x[i], y[i - 1], y[i]);
        let value = match kind {
            InterpolationKind::Linear => y0 + (y1 - y0) * (q - x0) / (x1 - x0),
            InterpolationKind::Nearest => {
                if (q - x0) <= (x1 - q) {
                    y0
                } else {
                    y1
                }
            }
            InterpolationKind::Previous => y0,
            InterpolationKind::Next => y1,
        };
        result.push(value);
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_linear() {
        let x = [1.0, 2.0, 4.0];
        let y = [10.0, 20.0, 0.0];
        let v = interpolate(
            &x,
            &y,
            &[1.0, 1.5, 3.0, 4.0],
            InterpolationKind::Linear,
            Extrapolation::Error,
            0,
        )
        .unwrap();
        assert_eq!(v, vec![10.0, 15.0, 10.0, 0.0]);
    }

    #[test]
    fn test_step_kinds() {
        let x = [1.0, 2.0];
        let y = [10.0, 20.0];
        let q = [1.4, 1.6];
        let near = interpolate(&x, &y, &q, InterpolationKind::Nearest, Extrapolation::Error, 0).unwrap();
        assert_eq!(near, vec![10.0, 20.0]);
        let prev = interpolate(&x, &y, &q, InterpolationKind::Previous, Extrapolation::Error, 0).unwrap();
        assert_eq!(prev, vec![10.0, 10.0]);
        let next = interpolate(&x, &y, &q, InterpolationKind::Next, Extrapolation::Error, 0).unwrap();
        assert_eq!(next, vec![20.0, 20.0]);
    }

    #[test]
    fn test_extrapolation_policy() {
        let x = [1.0, 2.0];
        let y = [10.0, 20.0];
        let err = interpolate(&x, &y, &[0.5, 1.5], InterpolationKind::Linear, Extrapolation::Error, 3)
            .unwrap_err();
        assert_eq!(
            err,
            ROIError::OutOfDomainInterpolation {
                scan: 3,
                mz: 0.5,
                low: 1.0,
                high: 2.0
            }
        );
        let v = interpolate(&x, &y, &[0.5, 1.5, 2.5], InterpolationKind::Linear, Extrapolation::Zero, 3)
            .unwrap();
        assert_eq!(v, vec![0.0, 15.0, 0.0]);

        let v = interpolate(&[], &[], &[1.0, 2.0], InterpolationKind::Linear, Extrapolation::Zero, 0)
            .unwrap();
        assert_eq!(v, vec![0.0, 0.0]);
        assert!(interpolate(&[], &[], &[1.0], InterpolationKind::Linear, Extrapolation::Error, 0).is_err());
    }
}
