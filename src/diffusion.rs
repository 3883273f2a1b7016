//! Biased random walk of bound particles over the nanoparticle surface.
//!
//! Each particle gets up to `max_trials` proposals per scheduler iteration; the first
//! proposal that does not collide is accepted.

use anyhow::Result;
use corona_common::DiffusionParams;
use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::{PI, TAU};

use crate::geometry::diffusion_collides;
use crate::species::SpeciesTable;
use crate::surface::{ParticleHandle, SurfaceState};

/// Distance kept from the poles when computing the azimuthal variance.
pub const POLE_EPSILON: f64 = 1e-9;
/// Upper bound on any angular standard deviation. Far beyond 2pi, so the wrapped
/// result is already uniform.
pub const MAX_ANGULAR_SIGMA: f64 = 1e6;

/// Outcome counters for one diffusion sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffusionStats {
    pub trials: u64,
    pub moved: u64,
    pub stuck: u64,
}

/// Wraps an azimuth into [0, 2pi).
#[inline]
pub fn wrap_azimuth(phi: f64) -> f64 {
    let wrapped = phi.rem_euclid(TAU);
    // rem_euclid of a tiny negative value rounds up to exactly 2pi.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps a polar angle into [0, 2pi), then folds it back into [0, pi].
#[inline]
pub fn wrap_polar(theta: f64) -> f64 {
    let wrapped = wrap_azimuth(theta);
    if wrapped > PI {
        TAU - wrapped
    } else {
        wrapped
    }
}

/// Standard deviation of the polar step: `sqrt(2 D dt) / R`.
pub fn polar_sigma(coefficient: f64, dt: f64, np_radius: f64) -> f64 {
    ((2.0 * coefficient * dt).sqrt() / np_radius).min(MAX_ANGULAR_SIGMA)
}

/// Standard deviation of the azimuthal step at polar angle `theta`.
///
/// The variance grows as `1/theta^2 + 1/(theta - pi)^2`, the metric factor of the
/// azimuth near the poles.
pub fn azimuth_sigma(polar_sigma: f64, theta: f64) -> f64 {
    let theta = theta.clamp(POLE_EPSILON, PI - POLE_EPSILON);
    let pole_factor = 1.0 / (theta * theta) + 1.0 / ((theta - PI) * (theta - PI));
    let sigma = polar_sigma * pole_factor.sqrt();
    if sigma.is_finite() {
        sigma.min(MAX_ANGULAR_SIGMA)
    } else {
        MAX_ANGULAR_SIGMA
    }
}

/// Attempts one random-walk move for every bound particle, visiting them in a fresh
/// random order. `dt` is the full waiting time drawn for the current event.
pub fn diffuse_surface<R: Rng + ?Sized>(
    surface: &mut SurfaceState,
    species: &SpeciesTable,
    params: &DiffusionParams,
    dt: f64,
    rng: &mut R,
) -> Result<DiffusionStats> {
    let mut stats = DiffusionStats::default();
    if surface.is_empty() || params.max_trials == 0 {
        return Ok(stats);
    }

    let mut visit_order: Vec<ParticleHandle> = surface.handles().to_vec();
    visit_order.shuffle(rng);

    let sigma_theta = polar_sigma(params.coefficient, dt, species.np_radius());
    let polar_step = Normal::new(0.0, sigma_theta)?;

    for handle in visit_order {
        let Some(&start) = surface.get(handle) else {
            continue;
        };
        let azimuth_step = Normal::new(0.0, azimuth_sigma(sigma_theta, start.theta))?;

        let mut accepted = false;
        for _ in 0..params.max_trials {
            stats.trials += 1;
            let theta = wrap_polar(start.theta + polar_step.sample(rng));
            let phi = wrap_azimuth(start.phi + azimuth_step.sample(rng));
            if !diffusion_collides(surface, species, handle, phi, theta, params.metric) {
                surface.set_position(handle, phi, theta);
                accepted = true;
                break;
            }
        }

        if accepted {
            stats.moved += 1;
        } else {
            stats.stuck += 1;
            trace!("Particle {:?} stayed put after {} trials", handle, params.max_trials);
        }
    }

    Ok(stats)
}
