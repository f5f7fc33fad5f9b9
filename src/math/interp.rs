//! Piecewise-linear interpolation over tabulated knots.
//!
//! Critical-value tables for the unit-root and stationarity tests are
//! interpolated here. Outside the knot range the nearest end value is used.

pub fn linear_interp(a: (f64, f64), b: (f64, f64), x: f64) -> f64 {
    let (x0, y0) = a;
    let (x1, y1) = b;
    if (x1 - x0).abs() < 1e-12 {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

/// Interpolate `y(x)` over knots with strictly increasing `xs`, clamping at the ends.
///
/// Returns `None` if the knot slices are empty or differ in length.
pub fn interp_clamped(xs: &[f64], ys: &[f64], x: f64) -> Option<f64> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let last = xs.len() - 1;
    if x <= xs[0] {
        return Some(ys[0]);
    }
    if x >= xs[last] {
        return Some(ys[last]);
    }
    for i in 0..last {
        if x >= xs[i] && x <= xs[i + 1] {
            return Some(linear_interp((xs[i], ys[i]), (xs[i + 1], ys[i + 1]), x));
        }
    }
    Some(ys[last])
}
