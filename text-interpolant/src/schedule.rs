//! Time-indexed interpolant and diffusivity
//!
//! Both factories take a time `t` and hand back a fresh elementwise transform.
//! They are pure and cheap, so the integrator re-derives them on every
//! right-hand-side evaluation instead of caching across steps.

use ndarray::{Array1, ArrayView1};

/// Elementwise transform of a state vector at a fixed time
pub type Transform = Box<dyn Fn(ArrayView1<'_, f64>) -> Array1<f64>>;

/// Factory producing the transform for time `t`
pub type TransformFactory = fn(f64) -> Transform;

/// Blend from identity (t = 0) towards `sin` (t = 1)
///
/// `x ↦ x·(1 − t) + t·sin(x)`
pub fn interpolant(t: f64) -> Transform {
    Box::new(move |x: ArrayView1<'_, f64>| x.mapv(|v| v * (1.0 - t) + t * v.sin()))
}

/// Scale bounded in `[1 − t, 1 + t]`, equal to 1 at t = 0
///
/// `x ↦ 1 + t·cos(x)`
pub fn diffusivity(t: f64) -> Transform {
    Box::new(move |x: ArrayView1<'_, f64>| x.mapv(|v| 1.0 + t * v.cos()))
}

/// Right-hand side of the transport ODE: `interpolant(t)(y) · diffusivity(t)(y)`
pub fn velocity(
    t: f64,
    y: ArrayView1<'_, f64>,
    interpolant: TransformFactory,
    diffusivity: TransformFactory,
) -> Array1<f64> {
    let shape = interpolant(t);
    let scale = diffusivity(t);
    shape(y) * scale(y)
}
