//! Importance-sampling proposal: a yield-weighted mixture of isotropic Gaussians in
//! (latitude, longitude) degree space, one kernel per source.
//!
//! Each kernel's standard deviation is the source's negligible-effect radius expressed as an
//! angle of the planet's circumference, times `sd_scaling_factor`. Longitude offsets are drawn in
//! raw degrees without correcting for meridian convergence, so the kernel is narrower on the
//! ground than in degrees at high latitude. [ImportanceSampler::density] uses the same degree
//! space, so the estimator stays unbiased; only its variance suffers near the poles.

use std::f64::consts::{PI, TAU};

use serde::Serialize;

use crate::blast::Source;
use crate::error::ConfigError;
use crate::geo::{Coordinates, Planet};
use crate::sampling::discrete::DiscreteDistribution;
use crate::sampling::engine::UniformSource;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixtureComponent {
    pub source: Source,
    pub selection_probability: f64,
    /// Degrees.
    pub angular_std_dev: f64,
}

impl MixtureComponent {
    pub fn latitude(&self) -> f64 {
        self.source.latitude()
    }

    pub fn longitude(&self) -> f64 {
        self.source.longitude()
    }
}

pub fn gaussian_pdf(x: f64, sigma: f64) -> f64 {
    let z = x / sigma;
    (-0.5 * z * z).exp() / (sigma * TAU.sqrt())
}

/// Two independent standard normals from two uniforms in [0, 1) (Box-Muller).
fn box_muller(u1: f64, u2: f64) -> (f64, f64) {
    let radius = (-2.0 * (1.0 - u1).ln()).sqrt();
    let angle = 2.0 * PI * u2;
    (radius * angle.cos(), radius * angle.sin())
}

#[derive(Debug, Clone)]
pub struct ImportanceSampler {
    components: Vec<MixtureComponent>,
    selection: Option<DiscreteDistribution>,
}

impl ImportanceSampler {
    pub fn new(
        sources: &[Source],
        sd_scaling_factor: f64,
        planet: &Planet,
    ) -> Result<Self, ConfigError> {
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if !(sd_scaling_factor > 0.0) || !sd_scaling_factor.is_finite() {
            return Err(ConfigError::InvalidSetting {
                name: "sd_scaling_factor",
                reason: format!("must be positive and finite, got {sd_scaling_factor}"),
            });
        }
        let total_yield: f64 = sources.iter().map(|s| s.energy_yield).sum();
        if !(total_yield > 0.0) || !total_yield.is_finite() {
            return Err(ConfigError::NonPositiveTotalYield(total_yield));
        }
        if let Some(bad) = sources.iter().find(|s| !(s.energy_yield > 0.0)) {
            return Err(ConfigError::NonPositiveYield(bad.energy_yield));
        }

        let circumference = planet.circumference();
        let components: Vec<MixtureComponent> = sources
            .iter()
            .map(|&source| MixtureComponent {
                source,
                selection_probability: source.energy_yield / total_yield,
                angular_std_dev: source.negligible_effect_radius() / circumference
                    * 360.0
                    * sd_scaling_factor,
            })
            .collect();

        let selection = if components.len() > 1 {
            let weights: Vec<f64> = components.iter().map(|c| c.selection_probability).collect();
            Some(DiscreteDistribution::new(&weights)?)
        } else {
            None
        };

        Ok(Self {
            components,
            selection,
        })
    }

    pub fn components(&self) -> &[MixtureComponent] {
        &self.components
    }

    /// Uniforms consumed per [ImportanceSampler::sample]: two Gaussian offsets, plus one
    /// component choice when there is more than one source.
    pub fn dimension(&self) -> usize {
        if self.selection.is_some() {
            3
        } else {
            2
        }
    }

    fn component_for(&self, u: f64) -> &MixtureComponent {
        match &self.selection {
            Some(selection) => &self.components[selection.inverse_cdf(u)],
            None => &self.components[0],
        }
    }

    /// Draws a source by yield share. With a single source no random number is consumed.
    pub fn select_source<U: UniformSource + ?Sized>(&self, engine: &mut U) -> &Source {
        if self.selection.is_none() {
            return &self.components[0].source;
        }
        let mut u = [0.0; 3];
        engine.next_vector(&mut u[..engine.dimension().min(3)]);
        &self.component_for(u[0]).source
    }

    /// One point from the mixture. `engine` must produce vectors of [ImportanceSampler::dimension].
    pub fn sample<U: UniformSource + ?Sized>(&self, engine: &mut U) -> Coordinates {
        let mut u = [0.0; 3];
        let dimension = self.dimension();
        engine.next_vector(&mut u[..dimension]);
        let (component, offsets) = if dimension == 3 {
            (self.component_for(u[0]), box_muller(u[1], u[2]))
        } else {
            (&self.components[0], box_muller(u[0], u[1]))
        };
        let sigma = component.angular_std_dev;
        Coordinates::new(
            component.latitude() + sigma * offsets.0,
            component.longitude() + sigma * offsets.1,
        )
    }

    /// Mixture density (per square degree) at `point`.
    pub fn density(&self, point: Coordinates) -> f64 {
        self.components
            .iter()
            .map(|c| {
                c.selection_probability
                    * gaussian_pdf(point.latitude - c.latitude(), c.angular_std_dev)
                    * gaussian_pdf(point.longitude - c.longitude(), c.angular_std_dev)
            })
            .sum()
    }
}
