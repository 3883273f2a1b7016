//! Hard-sphere exclusion tests for particles bound to a spherical nanoparticle.
//!
//! A particle of radius `r` resting on a nanoparticle of radius `R` is represented by
//! the angular position of its centre. Its footprint is the spherical cap of half-angle
//! `asin(r / (r + R))`, and two particles overlap when their caps intersect.

use corona_common::{DiffusionMetric, Vec3};
use rayon::prelude::*;
use std::f64::consts::PI;

use crate::species::SpeciesTable;
use crate::surface::{BoundParticle, ParticleHandle, SurfaceState};

/// Surfaces at least this crowded are scanned with rayon.
pub const PARALLEL_THRESHOLD: usize = 512;

/// Half-angle of the exclusion cap of a particle of `radius` on a sphere of `np_radius`.
#[inline(always)]
pub fn exclusion_angle(radius: f64, np_radius: f64) -> f64 {
    (radius / (radius + np_radius)).asin()
}

/// Smallest allowed great-circle separation between the centres of two particles.
#[inline(always)]
pub fn min_separation(radius_a: f64, radius_b: f64, np_radius: f64) -> f64 {
    exclusion_angle(radius_a, np_radius) + exclusion_angle(radius_b, np_radius)
}

/// Great-circle angle between two points, from the spherical law of cosines.
#[inline(always)]
pub fn angular_distance(phi_a: f64, theta_a: f64, phi_b: f64, theta_b: f64) -> f64 {
    let cos_angle = theta_a.cos() * theta_b.cos()
        + theta_a.sin() * theta_b.sin() * (phi_a - phi_b).cos();
    // Round-off can push coincident points just past 1.
    cos_angle.clamp(-1.0, 1.0).acos()
}

/// Area of the nanoparticle surface excluded by one particle of radius `radius`.
pub fn binding_area_sphere(np_radius: f64, radius: f64) -> f64 {
    2.0 * PI * np_radius * np_radius
        * (1.0 - (np_radius * (2.0 * radius + np_radius)).sqrt() / (radius + np_radius))
}

/// Effective number of binding sites: total surface area over the per-particle footprint.
pub fn max_binding_sites(np_radius: f64, radius: f64) -> f64 {
    4.0 * PI * np_radius * np_radius / binding_area_sphere(np_radius, radius)
}

/// Position of a particle centre sitting on the surface, `radial = R + r` from the origin.
pub fn to_cartesian(phi: f64, theta: f64, radial: f64) -> Vec3 {
    Vec3::from_spherical(phi, theta) * radial
}

/// Exact pairwise overlap test between two bound particles.
pub fn particles_overlap(a: &BoundParticle, b: &BoundParticle, species: &SpeciesTable) -> bool {
    let threshold = species.exclusion_angle(a.species_id) + species.exclusion_angle(b.species_id);
    angular_distance(a.phi, a.theta, b.phi, b.theta) < threshold
}

/// Chord-distance overlap test used for diffusion moves.
///
/// Both centres are lifted to the height of the larger particle before measuring,
/// which reproduces the angular test exactly only when the radii match.
#[inline(always)]
pub fn chord_overlap(radius_a: f64, dir_a: Vec3, radius_b: f64, dir_b: Vec3, np_radius: f64) -> bool {
    let height = radius_a.max(radius_b) + np_radius;
    let chord = height * dir_a.distance(dir_b);
    radius_a + radius_b > chord
}

fn any_particle<F>(surface: &SurfaceState, test: F) -> bool
where
    F: Fn(ParticleHandle, &BoundParticle) -> bool + Sync,
{
    if surface.len() >= PARALLEL_THRESHOLD {
        surface.par_particles().any(|(handle, particle)| test(handle, particle))
    } else {
        surface.particles().any(|(handle, particle)| test(handle, particle))
    }
}

/// Would a new particle of `species_id` at (`phi`, `theta`) overlap anything already bound?
pub fn adsorption_collides(
    surface: &SurfaceState,
    species: &SpeciesTable,
    species_id: usize,
    phi: f64,
    theta: f64,
) -> bool {
    if surface.is_empty() {
        return false;
    }
    let own_angle = species.exclusion_angle(species_id);
    any_particle(surface, |_, other| {
        let threshold = own_angle + species.exclusion_angle(other.species_id);
        angular_distance(phi, theta, other.phi, other.theta) < threshold
    })
}

/// Would moving `moving` to (`phi`, `theta`) overlap any other bound particle?
pub fn diffusion_collides(
    surface: &SurfaceState,
    species: &SpeciesTable,
    moving: ParticleHandle,
    phi: f64,
    theta: f64,
    metric: DiffusionMetric,
) -> bool {
    if surface.len() < 2 {
        return false;
    }
    let Some(mover) = surface.get(moving) else {
        return false;
    };
    let np_radius = species.np_radius();
    let moving_radius = species.radius(mover.species_id);
    let moving_angle = species.exclusion_angle(mover.species_id);
    let moving_dir = Vec3::from_spherical(phi, theta);

    any_particle(surface, |handle, other| {
        if handle == moving {
            return false;
        }
        match metric {
            DiffusionMetric::Approximate => chord_overlap(
                moving_radius,
                moving_dir,
                species.radius(other.species_id),
                Vec3::from_spherical(other.phi, other.theta),
                np_radius,
            ),
            DiffusionMetric::Exact => {
                let threshold = moving_angle + species.exclusion_angle(other.species_id);
                angular_distance(phi, theta, other.phi, other.theta) < threshold
            }
        }
    })
}

/// Checks every pair of bound particles; returns the first overlapping pair found.
pub fn find_overlap(surface: &SurfaceState, species: &SpeciesTable) -> Option<(ParticleHandle, ParticleHandle)> {
    let particles: Vec<(ParticleHandle, &BoundParticle)> = surface.particles().collect();
    for (i, (handle_a, a)) in particles.iter().enumerate() {
        for (handle_b, b) in &particles[i + 1..] {
            if particles_overlap(a, b, species) {
                return Some((*handle_a, *handle_b));
            }
        }
    }
    None
}
