//! Adaptive Runge–Kutta integration
//!
//! Dormand–Prince 5(4) with embedded error control (the usual "RK45").
//! Only the state at the end of the interval is returned; dense output and
//! event handling are not needed by the interpolant.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{InterpolantError, Result};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
/// Order of the embedded error estimator
const ERROR_ESTIMATOR_ORDER: i32 = 4;
const ERROR_EXPONENT: f64 = -1.0 / (ERROR_ESTIMATOR_ORDER as f64 + 1.0);

const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

const A: [[f64; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];

const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

/// Difference between the 5th and embedded 4th order weights (7 stages, FSAL)
const E: [f64; 7] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

/// Solver tolerances and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdeConfig {
    /// Relative tolerance (default: 1e-3)
    pub rtol: f64,
    /// Absolute tolerance (default: 1e-6)
    pub atol: f64,
    /// Largest allowed step (default: unbounded)
    pub max_step: f64,
    /// Initial step; chosen automatically when `None`
    pub first_step: Option<f64>,
    /// Accepted + rejected step budget before giving up (default: 100_000)
    pub max_steps: usize,
}

impl Default for OdeConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
            max_step: f64::INFINITY,
            first_step: None,
            max_steps: 100_000,
        }
    }
}

impl OdeConfig {
    /// Check tolerances and limits
    pub fn validate(&self) -> Result<()> {
        if !(self.rtol > 0.0) || !self.rtol.is_finite() {
            return Err(InterpolantError::invalid_config(format!(
                "rtol must be positive and finite, got {}",
                self.rtol
            )));
        }
        if !(self.atol >= 0.0) || !self.atol.is_finite() {
            return Err(InterpolantError::invalid_config(format!(
                "atol must be non-negative and finite, got {}",
                self.atol
            )));
        }
        if !(self.max_step > 0.0) {
            return Err(InterpolantError::invalid_config(format!(
                "max_step must be positive, got {}",
                self.max_step
            )));
        }
        if let Some(h) = self.first_step {
            if !(h > 0.0) || !h.is_finite() {
                return Err(InterpolantError::invalid_config(format!(
                    "first_step must be positive and finite, got {}",
                    h
                )));
            }
        }
        if self.max_steps == 0 {
            return Err(InterpolantError::invalid_config("max_steps must be at least 1"));
        }
        Ok(())
    }
}

/// Final state of an integration plus step statistics
#[derive(Debug, Clone)]
pub struct OdeSolution {
    /// Time reached (always the end of the span on success)
    pub t: f64,
    /// State at `t`
    pub y: Array1<f64>,
    /// Accepted steps
    pub accepted_steps: usize,
    /// Rejected steps
    pub rejected_steps: usize,
    /// Right-hand-side evaluations
    pub evaluations: usize,
}

/// Integrate `dy/dt = rhs(t, y)` from `t_span.0` to `t_span.1`
///
/// A zero-length span returns `y0` without evaluating `rhs`. Backward
/// integration is not supported.
pub fn solve_ivp<F>(
    rhs: F,
    t_span: (f64, f64),
    y0: ArrayView1<'_, f64>,
    config: &OdeConfig,
) -> Result<OdeSolution>
where
    F: FnMut(f64, ArrayView1<'_, f64>) -> Array1<f64>,
{
    config.validate()?;
    let (t0, t_bound) = t_span;
    if !t0.is_finite() || !t_bound.is_finite() {
        return Err(InterpolantError::invalid_config(format!(
            "time span must be finite, got [{}, {}]",
            t0, t_bound
        )));
    }
    if t_bound < t0 {
        return Err(InterpolantError::invalid_config(format!(
            "time span must be non-decreasing, got [{}, {}]",
            t0, t_bound
        )));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(InterpolantError::integration("initial state is not finite"));
    }

    let mut solution = OdeSolution {
        t: t0,
        y: y0.to_owned(),
        accepted_steps: 0,
        rejected_steps: 0,
        evaluations: 0,
    };
    if t_bound == t0 || y0.is_empty() {
        solution.t = t_bound;
        return Ok(solution);
    }

    let mut rhs = Rhs {
        f: rhs,
        evaluations: 0,
    };

    let mut t = t0;
    let mut y = solution.y.clone();
    let mut f = rhs.call(t, y.view())?;
    if f.iter().any(|v| !v.is_finite()) {
        return Err(InterpolantError::integration(format!(
            "non-finite derivative at t={}",
            t
        )));
    }

    let mut h_abs = match config.first_step {
        Some(h) => h.min(t_bound - t0),
        None => select_initial_step(&mut rhs, t0, y.view(), f.view(), t_bound, config)?,
    };

    let n = y.len();
    let mut k: Vec<Array1<f64>> = vec![Array1::zeros(n); 7];

    while t < t_bound {
        let min_step = 10.0 * (next_up(t) - t).abs();
        h_abs = h_abs.min(config.max_step).max(min_step);

        let mut step_rejected = false;
        loop {
            if solution.accepted_steps + solution.rejected_steps >= config.max_steps {
                return Err(InterpolantError::integration(format!(
                    "step budget of {} exhausted at t={}",
                    config.max_steps, t
                )));
            }
            if h_abs < min_step {
                return Err(InterpolantError::integration(format!(
                    "required step size is less than spacing between numbers at t={}",
                    t
                )));
            }

            let mut t_new = t + h_abs;
            if t_new > t_bound {
                t_new = t_bound;
            }
            let h = t_new - t;
            h_abs = h.abs();

            let (y_new, f_new) = rk_step(&mut rhs, t, y.view(), f.view(), h, &mut k)?;

            let error_norm = {
                let mut err = Array1::<f64>::zeros(n);
                for (stage, weight) in k.iter().zip(E.iter()) {
                    err.scaled_add(*weight * h, stage);
                }
                let scale = y
                    .iter()
                    .zip(y_new.iter())
                    .map(|(a, b)| config.atol + a.abs().max(b.abs()) * config.rtol);
                rms(err.iter().zip(scale).map(|(e, s)| e / s))
            };

            if error_norm.is_finite() && error_norm < 1.0 {
                let mut factor = if error_norm == 0.0 {
                    MAX_FACTOR
                } else {
                    MAX_FACTOR.min(SAFETY * error_norm.powf(ERROR_EXPONENT))
                };
                if step_rejected {
                    factor = factor.min(1.0);
                }
                h_abs *= factor;

                t = t_new;
                y = y_new;
                f = f_new;
                solution.accepted_steps += 1;
                break;
            }

            let shrink = if error_norm.is_finite() {
                MIN_FACTOR.max(SAFETY * error_norm.powf(ERROR_EXPONENT))
            } else {
                MIN_FACTOR
            };
            h_abs *= shrink;
            step_rejected = true;
            solution.rejected_steps += 1;
        }
    }

    if y.iter().any(|v| !v.is_finite()) {
        return Err(InterpolantError::integration(format!(
            "non-finite state at t={}",
            t
        )));
    }

    solution.t = t;
    solution.y = y;
    solution.evaluations = rhs.evaluations;
    Ok(solution)
}

/// Right-hand side with an evaluation counter and width check
struct Rhs<F> {
    f: F,
    evaluations: usize,
}

impl<F> Rhs<F>
where
    F: FnMut(f64, ArrayView1<'_, f64>) -> Array1<f64>,
{
    fn call(&mut self, t: f64, y: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.evaluations += 1;
        let dy = (self.f)(t, y);
        if dy.len() != y.len() {
            return Err(InterpolantError::dimension_mismatch(y.len(), dy.len()));
        }
        Ok(dy)
    }
}

/// One Dormand–Prince step; fills `k` with the seven stage derivatives
fn rk_step<F>(
    rhs: &mut Rhs<F>,
    t: f64,
    y: ArrayView1<'_, f64>,
    f: ArrayView1<'_, f64>,
    h: f64,
    k: &mut [Array1<f64>],
) -> Result<(Array1<f64>, Array1<f64>)>
where
    F: FnMut(f64, ArrayView1<'_, f64>) -> Array1<f64>,
{
    k[0].assign(&f);
    for s in 1..6 {
        let mut dy = y.to_owned();
        for (j, a) in A[s].iter().take(s).enumerate() {
            if *a != 0.0 {
                dy.scaled_add(a * h, &k[j]);
            }
        }
        k[s] = rhs.call(t + C[s] * h, dy.view())?;
    }

    let mut y_new = y.to_owned();
    for (stage, weight) in k.iter().zip(B.iter()) {
        if *weight != 0.0 {
            y_new.scaled_add(weight * h, stage);
        }
    }
    let f_new = rhs.call(t + h, y_new.view())?;
    k[6].assign(&f_new);

    Ok((y_new, f_new))
}

/// Empirical initial step (Hairer, Nørsett & Wanner, II.4)
fn select_initial_step<F>(
    rhs: &mut Rhs<F>,
    t0: f64,
    y0: ArrayView1<'_, f64>,
    f0: ArrayView1<'_, f64>,
    t_bound: f64,
    config: &OdeConfig,
) -> Result<f64>
where
    F: FnMut(f64, ArrayView1<'_, f64>) -> Array1<f64>,
{
    let interval_length = t_bound - t0;
    let scale: Array1<f64> = y0.mapv(|v| config.atol + v.abs() * config.rtol);
    let d0 = rms(y0.iter().zip(scale.iter()).map(|(y, s)| y / s));
    let d1 = rms(f0.iter().zip(scale.iter()).map(|(f, s)| f / s));

    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    let h0 = h0.min(interval_length);

    let mut y1 = y0.to_owned();
    y1.scaled_add(h0, &f0);
    let f1 = rhs.call(t0 + h0, y1.view())?;
    let d2 = rms(
        f1.iter()
            .zip(f0.iter())
            .zip(scale.iter())
            .map(|((a, b), s)| (a - b) / s),
    ) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        1e-6_f64.max(h0 * 1e-3)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ESTIMATOR_ORDER as f64 + 1.0))
    };

    let h = (100.0 * h0).min(h1).min(interval_length).min(config.max_step);
    if !h.is_finite() || h <= 0.0 {
        return Err(InterpolantError::integration(format!(
            "could not select an initial step at t={}",
            t0
        )));
    }
    Ok(h)
}

/// Root-mean-square norm
fn rms(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v * v, c + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt()
    }
}

/// Smallest representable float greater than `x` (finite, non-negative or negative)
fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_config_default() {
        let config = OdeConfig::default();
        assert_eq!(config.rtol, 1e-3);
        assert_eq!(config.atol, 1e-6);
        assert!(config.max_step.is_infinite());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_exponential_growth() {
        let y0 = array![1.0];
        let sol = solve_ivp(|_, y| y.to_owned(), (0.0, 1.0), y0.view(), &OdeConfig::default())
            .unwrap();
        assert_eq!(sol.t, 1.0);
        assert!((sol.y[0] - std::f64::consts::E).abs() < 1e-2);
        assert!(sol.accepted_steps > 0);
    }

    #[test]
    fn test_exponential_decay_tight_tolerance() {
        let config = OdeConfig {
            rtol: 1e-10,
            atol: 1e-12,
            ..OdeConfig::default()
        };
        let y0 = array![3.0, -1.0];
        let sol = solve_ivp(|_, y| y.mapv(|v| -2.0 * v), (0.0, 2.0), y0.view(), &config).unwrap();
        let decay = (-4.0_f64).exp();
        assert!((sol.y[0] - 3.0 * decay).abs() < 1e-8);
        assert!((sol.y[1] + decay).abs() < 1e-8);
    }

    #[test]
    fn test_time_dependent_rhs() {
        // y' = cos(t), y(0) = 0 → y(π/2) = 1
        let config = OdeConfig {
            rtol: 1e-9,
            atol: 1e-12,
            ..OdeConfig::default()
        };
        let y0 = array![0.0];
        let sol = solve_ivp(
            |t, y| y.mapv(|_| t.cos()),
            (0.0, std::f64::consts::FRAC_PI_2),
            y0.view(),
            &config,
        )
        .unwrap();
        assert!((sol.y[0] - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_zero_span_returns_initial_state() {
        let y0 = array![0.25, -4.0, 9.0];
        let mut calls = 0;
        let sol = solve_ivp(
            |_, y| {
                calls += 1;
                y.to_owned()
            },
            (0.0, 0.0),
            y0.view(),
            &OdeConfig::default(),
        )
        .unwrap();
        assert_eq!(sol.y, y0);
        assert_eq!(sol.evaluations, 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_non_finite_derivative_fails() {
        let y0 = array![1.0];
        let err = solve_ivp(
            |_, y| y.mapv(|_| f64::NAN),
            (0.0, 1.0),
            y0.view(),
            &OdeConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InterpolantError::Integration(_)));
    }

    #[test]
    fn test_finite_time_blow_up_fails() {
        // y' = y^2, y(0) = 1 diverges at t = 1
        let y0 = array![1.0];
        let err = solve_ivp(
            |_, y| y.mapv(|v| v * v),
            (0.0, 2.0),
            y0.view(),
            &OdeConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InterpolantError::Integration(_)));
    }

    #[test]
    fn test_step_budget_exhausted() {
        let config = OdeConfig {
            max_steps: 3,
            max_step: 1e-3,
            ..OdeConfig::default()
        };
        let y0 = array![1.0];
        let err = solve_ivp(|_, y| y.to_owned(), (0.0, 1.0), y0.view(), &config).unwrap_err();
        assert!(err.to_string().contains("step budget"));
    }

    #[test]
    fn test_backward_span_rejected() {
        let y0 = array![1.0];
        let err = solve_ivp(|_, y| y.to_owned(), (1.0, 0.0), y0.view(), &OdeConfig::default())
            .unwrap_err();
        assert!(matches!(err, InterpolantError::InvalidConfig(_)));
    }

    #[test]
    fn test_rhs_width_mismatch() {
        let y0 = array![1.0, 2.0];
        let err = solve_ivp(|_, _| array![1.0], (0.0, 1.0), y0.view(), &OdeConfig::default())
            .unwrap_err();
        assert!(matches!(err, InterpolantError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_invalid_tolerances() {
        let config = OdeConfig {
            rtol: 0.0,
            ..OdeConfig::default()
        };
        assert!(config.validate().is_err());
        let config = OdeConfig {
            atol: -1.0,
            ..OdeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_next_up() {
        assert!(next_up(1.0) > 1.0);
        assert_eq!(next_up(1.0) - 1.0, f64::EPSILON);
        assert!(next_up(-1.0) > -1.0);
        assert!(next_up(0.0) > 0.0);
    }
}
