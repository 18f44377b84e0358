//! Adaptive Gauss–Kronrod quadrature
//!
//! 15-point Kronrod rule with the embedded 7-point Gauss rule as error
//! estimate, globally adaptive bisection of the worst interval. Infinite
//! ranges are mapped onto `(0, 1]` with `x = (1 − u) / u`.

use serde::{Deserialize, Serialize};

use crate::error::{InterpolantError, Result};

/// Kronrod abscissae on [-1, 1], non-negative half
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Kronrod weights
const WGK: [f64; 8] = [
    0.022_935_322_010_529_225,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];

/// Gauss weights for the odd Kronrod abscissae (XGK[1], XGK[3], XGK[5], XGK[7])
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Quadrature tolerances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadConfig {
    /// Absolute error target (default: 1.49e-8)
    pub epsabs: f64,
    /// Relative error target (default: 1.49e-8)
    pub epsrel: f64,
    /// Maximum number of subintervals (default: 50)
    pub limit: usize,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self {
            epsabs: 1.49e-8,
            epsrel: 1.49e-8,
            limit: 50,
        }
    }
}

/// Integral estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadResult {
    pub value: f64,
    pub abs_error: f64,
    /// Integrand evaluations
    pub evaluations: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

/// Integrate `f` over the finite interval `[a, b]`
pub fn integrate<F>(mut f: F, a: f64, b: f64, config: &QuadConfig) -> Result<QuadResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    if !a.is_finite() || !b.is_finite() {
        return Err(InterpolantError::invalid_argument(format!(
            "integration bounds must be finite, got [{}, {}]; use integrate_real_line",
            a, b
        )));
    }
    if a == b {
        return Ok(QuadResult {
            value: 0.0,
            abs_error: 0.0,
            evaluations: 0,
        });
    }
    let (lo, hi, sign) = if a < b { (a, b, 1.0) } else { (b, a, -1.0) };
    let mut result = adaptive(&mut f, lo, hi, config)?;
    result.value *= sign;
    Ok(result)
}

/// Integrate `f` over the whole real line
pub fn integrate_real_line<F>(mut f: F, config: &QuadConfig) -> Result<QuadResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    let mut g = |u: f64| -> Result<f64> {
        let x = (1.0 - u) / u;
        Ok((f(x)? + f(-x)?) / (u * u))
    };
    let mut result = adaptive(&mut g, 0.0, 1.0, config)?;
    // Two integrand calls per transformed node
    result.evaluations *= 2;
    Ok(result)
}

fn adaptive<F>(f: &mut F, a: f64, b: f64, config: &QuadConfig) -> Result<QuadResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    if !(config.epsabs >= 0.0) || !(config.epsrel >= 0.0) {
        return Err(InterpolantError::invalid_config(
            "quadrature tolerances must be non-negative",
        ));
    }
    if config.epsabs == 0.0 && config.epsrel == 0.0 {
        return Err(InterpolantError::invalid_config(
            "at least one quadrature tolerance must be positive",
        ));
    }
    if config.limit == 0 {
        return Err(InterpolantError::invalid_config("quadrature limit must be at least 1"));
    }

    let mut evaluations = 0;
    let first = kronrod15(f, a, b, &mut evaluations)?;
    let mut segments = vec![first];

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = config.epsabs.max(config.epsrel * value.abs());

        if error <= tolerance {
            return Ok(QuadResult {
                value,
                abs_error: error,
                evaluations,
            });
        }
        if segments.len() >= config.limit {
            return Err(InterpolantError::quadrature(format!(
                "maximum number of subdivisions ({}) reached; estimate {} with error {}",
                config.limit, value, error
            )));
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.error.total_cmp(&y.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        if mid <= seg.a || mid >= seg.b {
            return Err(InterpolantError::quadrature(format!(
                "interval [{}, {}] cannot be subdivided further",
                seg.a, seg.b
            )));
        }
        segments.push(kronrod15(f, seg.a, mid, &mut evaluations)?);
        segments.push(kronrod15(f, mid, seg.b, &mut evaluations)?);
    }
}

/// 15-point Kronrod estimate with the QUADPACK error heuristic
fn kronrod15<F>(f: &mut F, a: f64, b: f64, evaluations: &mut usize) -> Result<Segment>
where
    F: FnMut(f64) -> Result<f64>,
{
    let centre = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let mut eval = |x: f64| -> Result<f64> {
        *evaluations += 1;
        let v = f(x)?;
        if !v.is_finite() {
            return Err(InterpolantError::quadrature(format!(
                "non-finite integrand value {} at x={}",
                v, x
            )));
        }
        Ok(v)
    };

    let fc = eval(centre)?;
    let mut res_gauss = fc * WG[3];
    let mut res_kronrod = fc * WGK[7];
    let mut res_abs = res_kronrod.abs();
    let mut f1 = [0.0; 7];
    let mut f2 = [0.0; 7];

    for j in 0..7 {
        let dx = half * XGK[j];
        let lo = eval(centre - dx)?;
        let hi = eval(centre + dx)?;
        f1[j] = lo;
        f2[j] = hi;
        let sum = lo + hi;
        res_kronrod += WGK[j] * sum;
        res_abs += WGK[j] * (lo.abs() + hi.abs());
        if j % 2 == 1 {
            res_gauss += WG[j / 2] * sum;
        }
    }

    let mean = res_kronrod * 0.5;
    let mut res_asc = WGK[7] * (fc - mean).abs();
    for j in 0..7 {
        res_asc += WGK[j] * ((f1[j] - mean).abs() + (f2[j] - mean).abs());
    }

    let value = res_kronrod * half;
    let res_abs = res_abs * half.abs();
    let res_asc = res_asc * half.abs();
    let mut error = ((res_kronrod - res_gauss) * half).abs();
    if res_asc != 0.0 && error != 0.0 {
        error = res_asc * (1.0_f64).min((200.0 * error / res_asc).powf(1.5));
    }
    if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(50.0 * f64::EPSILON * res_abs);
    }

    Ok(Segment { a, b, value, error })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = QuadConfig::default();
        assert_eq!(config.epsabs, 1.49e-8);
        assert_eq!(config.epsrel, 1.49e-8);
        assert_eq!(config.limit, 50);
    }

    #[test]
    fn test_polynomial_exact() {
        let r = integrate(|x| Ok(3.0 * x * x - x + 2.0), 0.0, 2.0, &QuadConfig::default())
            .unwrap();
        assert!((r.value - 10.0).abs() < 1e-12);
        assert_eq!(r.evaluations, 15);
    }

    #[test]
    fn test_reversed_bounds_flip_sign() {
        let r = integrate(|x| Ok(x), 1.0, 0.0, &QuadConfig::default()).unwrap();
        assert!((r.value + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_endpoint_singularity_needs_subdivision() {
        // sqrt has an unbounded derivative at 0, a single panel cannot resolve it
        let r = integrate(|x| Ok(x.sqrt()), 0.0, 1.0, &QuadConfig::default()).unwrap();
        assert!((r.value - 2.0 / 3.0).abs() < 1e-8);
        assert!(r.evaluations > 15);
        assert_eq!(r.evaluations % 30, 15);
    }

    #[test]
    fn test_gaussian_over_real_line() {
        let r = integrate_real_line(|x| Ok((-x * x).exp()), &QuadConfig::default()).unwrap();
        assert!((r.value - std::f64::consts::PI.sqrt()).abs() < 1e-7);
        assert!(r.abs_error < 1e-6);
    }

    #[test]
    fn test_lorentzian_over_real_line() {
        let r = integrate_real_line(|x| Ok(1.0 / (1.0 + x * x)), &QuadConfig::default()).unwrap();
        assert!((r.value - std::f64::consts::PI).abs() < 1e-7);
    }

    #[test]
    fn test_zero_integrand() {
        let r = integrate_real_line(|_| Ok(0.0), &QuadConfig::default()).unwrap();
        assert_eq!(r.value, 0.0);
        assert_eq!(r.abs_error, 0.0);
    }

    #[test]
    fn test_non_finite_integrand_fails() {
        let err = integrate(|x| Ok(1.0 / x), 0.0, 1.0, &QuadConfig::default());
        // 0 is not a Kronrod node, so the singularity shows up as non-convergence
        assert!(matches!(err, Err(InterpolantError::Quadrature(_))));

        let err = integrate(|_| Ok(f64::NAN), 0.0, 1.0, &QuadConfig::default()).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_subdivision_limit() {
        let config = QuadConfig {
            limit: 1,
            ..QuadConfig::default()
        };
        let err = integrate(|x| Ok((50.0 * x).cos()), 0.0, 10.0, &config).unwrap_err();
        assert!(err.to_string().contains("subdivisions"));
    }

    #[test]
    fn test_integrand_error_propagates() {
        let err = integrate(
            |_| Err(InterpolantError::embedding("encoder down")),
            0.0,
            1.0,
            &QuadConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InterpolantError::Embedding(_)));
    }

    #[test]
    fn test_infinite_bounds_rejected_on_finite_rule() {
        assert!(integrate(|_| Ok(1.0), 0.0, f64::INFINITY, &QuadConfig::default()).is_err());
    }
}
