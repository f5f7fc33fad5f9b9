//! Derivative-free minimisation (Nelder-Mead simplex).
//!
//! Used for ETS smoothing weights and ARIMA coefficients. Objectives return
//! `f64`; non-finite values are treated as `+inf` so infeasible regions simply
//! repel the simplex.

/// Simplex settings.
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    /// Stop when the spread of simplex values falls below this.
    pub tolerance: f64,
    /// Initial simplex edge length (per coordinate, absolute).
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-8,
            initial_step: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimise `f` starting from `x0`, optionally clamped to per-coordinate bounds.
pub fn nelder_mead<F>(
    mut f: F,
    x0: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: FnMut(&[f64]) -> f64,
{
    let dim = x0.len();
    let clamp = |p: &mut Vec<f64>| {
        if let Some(b) = bounds {
            for (v, &(lo, hi)) in p.iter_mut().zip(b) {
                *v = v.clamp(lo, hi);
            }
        }
    };
    let mut eval = |p: &[f64]| {
        let v = f(p);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    if dim == 0 {
        let value = eval(x0);
        return NelderMeadResult {
            point: Vec::new(),
            value,
            iterations: 0,
            converged: true,
        };
    }

    let mut start = x0.to_vec();
    clamp(&mut start);

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(start.clone());
    for i in 0..dim {
        let mut p = start.clone();
        p[i] += config.initial_step;
        clamp(&mut p);
        // Step into the box if the upper bound swallowed the move.
        if (p[i] - start[i]).abs() < 1e-12 {
            p[i] -= config.initial_step;
            clamp(&mut p);
        }
        simplex.push(p);
    }
    let mut values: Vec<f64> = simplex.iter().map(|p| eval(p)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[dim];
        if best.is_finite() && (worst - best).abs() <= config.tolerance * (1.0 + best.abs()) {
            converged = true;
            break;
        }

        let mut centroid = vec![0.0; dim];
        for p in &simplex[..dim] {
            for (c, v) in centroid.iter_mut().zip(p) {
                *c += v / dim as f64;
            }
        }

        let towards = |coef: f64, from: &[f64]| -> Vec<f64> {
            centroid
                .iter()
                .zip(from)
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let mut reflected = towards(REFLECT, &simplex[dim]);
        clamp(&mut reflected);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let mut expanded = towards(EXPAND, &simplex[dim]);
            clamp(&mut expanded);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
            continue;
        }

        let (mut contracted, outside) = if f_reflected < values[dim] {
            (towards(CONTRACT, &simplex[dim]), true)
        } else {
            (towards(-CONTRACT, &simplex[dim]), false)
        };
        clamp(&mut contracted);
        let f_contracted = eval(&contracted);
        let accept = if outside {
            f_contracted <= f_reflected
        } else {
            f_contracted < values[dim]
        };
        if accept {
            simplex[dim] = contracted;
            values[dim] = f_contracted;
            continue;
        }

        let anchor = simplex[0].clone();
        for i in 1..=dim {
            let mut p: Vec<f64> = anchor
                .iter()
                .zip(&simplex[i])
                .map(|(a, v)| a + SHRINK * (v - a))
                .collect();
            clamp(&mut p);
            values[i] = eval(&p);
            simplex[i] = p;
        }
    }

    let (best_idx, _) = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .unwrap_or((0, &f64::INFINITY));

    tracing::debug!(iterations, converged, value = values[best_idx], "nelder-mead finished");

    NelderMeadResult {
        point: simplex[best_idx].clone(),
        value: values[best_idx],
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimises_shifted_quadratic() {
        let res = nelder_mead(
            |p| (p[0] - 3.0).powi(2) + 2.0 * (p[1] + 1.0).powi(2),
            &[0.0, 0.0],
            None,
            NelderMeadConfig {
                tolerance: 1e-14,
                ..Default::default()
            },
        );
        assert!(res.converged);
        assert!((res.point[0] - 3.0).abs() < 1e-4);
        assert!((res.point[1] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn respects_bounds() {
        let res = nelder_mead(
            |p| (p[0] - 5.0).powi(2),
            &[0.5],
            Some(&[(0.0, 1.0)]),
            NelderMeadConfig::default(),
        );
        assert!(res.point[0] <= 1.0);
        assert!((res.point[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rosenbrock_converges() {
        let res = nelder_mead(
            |p| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2),
            &[-1.2, 1.0],
            None,
            NelderMeadConfig {
                max_iter: 5000,
                tolerance: 1e-16,
                initial_step: 0.5,
            },
        );
        assert!((res.point[0] - 1.0).abs() < 1e-3);
        assert!((res.point[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn non_finite_objective_is_avoided() {
        let res = nelder_mead(
            |p| if p[0] < 0.0 { f64::NAN } else { (p[0] - 0.2).powi(2) },
            &[0.5],
            None,
            NelderMeadConfig::default(),
        );
        assert!(res.value.is_finite());
        assert!((res.point[0] - 0.2).abs() < 1e-3);
    }
}
