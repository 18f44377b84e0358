//! Text stochastic interpolant
//!
//! Transports encoded sentences along a time-dependent ODE from the initial
//! endpoint towards the final one, scores samples with the final density and
//! estimates the divergence between the two densities by quadrature.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::density::EmbeddingDensity;
use crate::embedding::TextEncoder;
use crate::error::{InterpolantError, Result};
use crate::ode::{solve_ivp, OdeConfig};
use crate::quadrature::{integrate_real_line, QuadConfig};
use crate::schedule::{self, TransformFactory};

/// Sentence encoded to seed every trajectory
///
/// Every sample starts from the same point; with a deterministic ODE the
/// generated batch therefore has identical rows.
pub const PLACEHOLDER_SENTENCE: &str = "initial sentence";

/// Interpolant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolantConfig {
    /// Integration horizon, trajectories run over `[0, time_interval]` (default: 1.0)
    pub time_interval: f64,
    /// Nominal time step (default: 0.01); the adaptive solver picks its own steps
    pub time_step: f64,
    /// ODE solver tolerances
    pub ode: OdeConfig,
    /// Quadrature tolerances for `cross_entropy`
    pub quadrature: QuadConfig,
}

impl Default for InterpolantConfig {
    fn default() -> Self {
        Self {
            time_interval: 1.0,
            time_step: 0.01,
            ode: OdeConfig::default(),
            quadrature: QuadConfig::default(),
        }
    }
}

impl InterpolantConfig {
    /// Config with the given horizon and nominal step, default tolerances
    pub fn new(time_interval: f64, time_step: f64) -> Self {
        Self {
            time_interval,
            time_step,
            ..Self::default()
        }
    }

    /// Check the time parameters and solver tolerances
    pub fn validate(&self) -> Result<()> {
        if !self.time_interval.is_finite() || self.time_interval < 0.0 {
            return Err(InterpolantError::invalid_config(format!(
                "time_interval must be finite and non-negative, got {}",
                self.time_interval
            )));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(InterpolantError::invalid_config(format!(
                "time_step must be finite and positive, got {}",
                self.time_step
            )));
        }
        self.ode.validate()
    }
}

/// Stochastic interpolant between two embedding densities
pub struct StochasticInterpolantModel<E> {
    initial: Arc<EmbeddingDensity<E>>,
    final_model: Arc<EmbeddingDensity<E>>,
    config: InterpolantConfig,
    interpolant: TransformFactory,
    diffusivity: TransformFactory,
}

impl<E: TextEncoder> StochasticInterpolantModel<E> {
    /// Build the model; both densities must share an embedding width
    pub fn new(
        initial: Arc<EmbeddingDensity<E>>,
        final_model: Arc<EmbeddingDensity<E>>,
        config: InterpolantConfig,
    ) -> Result<Self> {
        config.validate()?;
        if initial.dimension() != final_model.dimension() {
            return Err(InterpolantError::dimension_mismatch(
                initial.dimension(),
                final_model.dimension(),
            ));
        }

        log::info!(
            "Interpolant ready ({}d, time_interval={}, time_step={})",
            initial.dimension(),
            config.time_interval,
            config.time_step
        );

        Ok(Self {
            initial,
            final_model,
            config,
            interpolant: schedule::interpolant,
            diffusivity: schedule::diffusivity,
        })
    }

    /// Replace the interpolant and diffusivity factories
    pub fn with_time_functions(
        mut self,
        interpolant: TransformFactory,
        diffusivity: TransformFactory,
    ) -> Self {
        self.interpolant = interpolant;
        self.diffusivity = diffusivity;
        self
    }

    /// Encode the placeholder sentence `num_samples` times and transport each row
    ///
    /// Rows of the result keep the order of the encoded batch.
    pub fn generate_samples(&self, num_samples: usize) -> Result<Array2<f64>> {
        if num_samples == 0 {
            return Err(InterpolantError::invalid_argument(
                "num_samples must be at least 1",
            ));
        }

        let sentences = vec![PLACEHOLDER_SENTENCE; num_samples];
        let encoded = self.initial.encode(&sentences)?;
        if encoded.nrows() != num_samples {
            return Err(InterpolantError::embedding(format!(
                "Encoder returned {} rows for {} sentences",
                encoded.nrows(),
                num_samples
            )));
        }

        let start = encoded.mapv(f64::from);
        log::debug!(
            "Integrating {} samples over [0, {}]",
            num_samples,
            self.config.time_interval
        );
        self.integrate_samples(start.view())
    }

    /// Integrate each row of `samples` over `[0, time_interval]`
    ///
    /// Fails on the first trajectory the solver cannot finish.
    pub fn integrate_samples(&self, samples: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if samples.ncols() != self.initial.dimension() {
            return Err(InterpolantError::dimension_mismatch(
                self.initial.dimension(),
                samples.ncols(),
            ));
        }

        let interpolant = self.interpolant;
        let diffusivity = self.diffusivity;
        let mut out = Array2::zeros(samples.raw_dim());
        let mut evaluations = 0;

        for (index, (start, mut target)) in samples
            .axis_iter(Axis(0))
            .zip(out.axis_iter_mut(Axis(0)))
            .enumerate()
        {
            let solution = solve_ivp(
                |t, y| schedule::velocity(t, y, interpolant, diffusivity),
                (0.0, self.config.time_interval),
                start,
                &self.config.ode,
            )
            .map_err(|e| match e {
                InterpolantError::Integration(msg) => {
                    InterpolantError::integration(format!("sample {}: {}", index, msg))
                }
                other => other,
            })?;
            evaluations += solution.evaluations;
            target.assign(&solution.y);
        }

        log::debug!(
            "Integrated {} samples ({} rhs evaluations)",
            samples.nrows(),
            evaluations
        );
        Ok(out)
    }

    /// Pseudo-likelihood of `samples` under the final density
    pub fn likelihood(&self, samples: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.final_model.likelihood(samples)
    }

    /// `∫ p_initial(x) · ln(p_initial(x) / p_final(x)) dx` over the real line
    ///
    /// Each density is evaluated at one scalar point at a time, broadcast to
    /// every embedding coordinate and scored as a batch of one. The batch
    /// softmax makes both values 1.0 there, so the integrand vanishes and the
    /// result is 0 whatever the two mean embeddings are.
    pub fn cross_entropy(&self) -> Result<f64> {
        let dimension = self.initial.dimension();
        let integrand = |x: f64| -> Result<f64> {
            let point = Array2::from_elem((1, dimension), x);
            let p = self.initial.likelihood(point.view())?[0];
            let q = self.final_model.likelihood(point.view())?[0];
            Ok(kl_term(p, q))
        };

        let result = integrate_real_line(integrand, &self.config.quadrature)?;
        log::debug!(
            "cross_entropy = {} (abs error {}, {} evaluations)",
            result.value,
            result.abs_error,
            result.evaluations
        );
        if result.value == 0.0 && result.abs_error == 0.0 {
            log::warn!(
                "cross_entropy integrand is identically zero: single-point batches always score 1.0"
            );
        }
        Ok(result.value)
    }

    /// Initial density
    pub fn initial_model(&self) -> &Arc<EmbeddingDensity<E>> {
        &self.initial
    }

    /// Final density
    pub fn final_model(&self) -> &Arc<EmbeddingDensity<E>> {
        &self.final_model
    }

    /// Length of the integration interval
    pub fn time_interval(&self) -> f64 {
        self.config.time_interval
    }

    /// Nominal time step
    pub fn time_step(&self) -> f64 {
        self.config.time_step
    }

    /// Get model configuration
    pub fn config(&self) -> &InterpolantConfig {
        &self.config
    }
}

/// `p · ln(p / q)`, taken as 0 where `p` is 0
fn kl_term(p: f64, q: f64) -> f64 {
    if p == 0.0 {
        0.0
    } else {
        p * (p / q).ln()
    }
}
