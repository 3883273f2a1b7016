use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One adsorbed particle: which species it is and where its centre sits on the sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundParticle {
    pub species_id: usize,
    /// Azimuth in [0, 2pi).
    pub phi: f64,
    /// Polar angle in [0, pi].
    pub theta: f64,
}

impl BoundParticle {
    pub fn new(species_id: usize, phi: f64, theta: f64) -> Self {
        Self { species_id, phi, theta }
    }
}

/// Stable reference to a bound particle. Goes stale once the particle desorbs,
/// even if its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleHandle {
    /// Slot in the arena.
    index: u32,
    /// Generation of the slot when the particle was inserted.
    generation: u32,
}

/// One arena entry.
#[derive(Debug, Clone)]
struct Slot {
    /// Bumped every time the slot is freed, invalidating older handles.
    generation: u32,
    /// `None` while the slot sits on the free list.
    particle: Option<BoundParticle>,
}

/// The set of currently bound particles.
///
/// Particles live in a slot arena with a free list; `order` keeps the live handles
/// in insertion order, which is the order desorption channels are enumerated in.
#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    slots: Vec<Slot>,
    /// Indices of empty slots, reused before the arena grows.
    free: Vec<u32>,
    /// Live handles in insertion order.
    order: Vec<ParticleHandle>,
}

impl SurfaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Adds a particle and returns its handle. Freed slots are reused first.
    pub fn insert(&mut self, particle: BoundParticle) -> ParticleHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.particle = Some(particle);
                ParticleHandle { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, particle: Some(particle) });
                ParticleHandle { index, generation: 0 }
            }
        };
        self.order.push(handle);
        handle
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&BoundParticle> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.particle.as_ref())
    }

    pub fn contains(&self, handle: ParticleHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Live handles in insertion order.
    pub fn handles(&self) -> &[ParticleHandle] {
        &self.order
    }

    /// Moves a particle. Returns `false` for a stale handle.
    pub fn set_position(&mut self, handle: ParticleHandle, phi: f64, theta: f64) -> bool {
        match self.slot_mut(handle).and_then(|slot| slot.particle.as_mut()) {
            Some(particle) => {
                particle.phi = phi;
                particle.theta = theta;
                true
            }
            None => false,
        }
    }

    /// Removes the particle at `position` in insertion order, keeping the order of the rest.
    pub fn remove_at(&mut self, position: usize) -> Option<(ParticleHandle, BoundParticle)> {
        if position >= self.order.len() {
            return None;
        }
        let handle = self.order.remove(position);
        let particle = self.release(handle)?;
        Some((handle, particle))
    }

    pub fn remove(&mut self, handle: ParticleHandle) -> Option<BoundParticle> {
        let position = self.order.iter().position(|&h| h == handle)?;
        self.remove_at(position).map(|(_, particle)| particle)
    }

    /// Live particles in insertion order.
    pub fn particles(&self) -> impl Iterator<Item = (ParticleHandle, &BoundParticle)> + '_ {
        self.order.iter().filter_map(move |&handle| self.get(handle).map(|p| (handle, p)))
    }

    /// Live particles in slot order, for parallel scans where order does not matter.
    pub fn par_particles(&self) -> impl ParallelIterator<Item = (ParticleHandle, &BoundParticle)> + '_ {
        self.slots.par_iter().enumerate().filter_map(|(index, slot)| {
            slot.particle.as_ref().map(|particle| {
                (ParticleHandle { index: index as u32, generation: slot.generation }, particle)
            })
        })
    }

    /// Number of bound particles of each species id below `num_species`.
    pub fn count_by_species(&self, num_species: usize) -> Vec<u32> {
        let mut counts = vec![0u32; num_species];
        for (_, particle) in self.particles() {
            if let Some(count) = counts.get_mut(particle.species_id) {
                *count += 1;
            }
        }
        counts
    }

    fn slot_mut(&mut self, handle: ParticleHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    fn release(&mut self, handle: ParticleHandle) -> Option<BoundParticle> {
        let slot = self.slot_mut(handle)?;
        let particle = slot.particle.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(particle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_survives_removal() {
        let mut surface = SurfaceState::new();
        let a = surface.insert(BoundParticle::new(0, 0.1, 0.1));
        let b = surface.insert(BoundParticle::new(1, 0.2, 0.2));
        let c = surface.insert(BoundParticle::new(0, 0.3, 0.3));

        let (removed, particle) = surface.remove_at(1).unwrap();
        assert_eq!(removed, b);
        assert_eq!(particle.species_id, 1);
        assert_eq!(surface.handles(), &[a, c]);
        assert_eq!(surface.count_by_species(2), vec![2, 0]);
    }

    #[test]
    fn stale_handles_do_not_alias_reused_slots() {
        let mut surface = SurfaceState::new();
        let first = surface.insert(BoundParticle::new(0, 1.0, 1.0));
        assert!(surface.remove(first).is_some());
        let second = surface.insert(BoundParticle::new(2, 2.0, 2.0));

        assert_ne!(first, second);
        assert!(!surface.contains(first));
        assert!(!surface.set_position(first, 0.0, 0.0));
        assert_eq!(surface.get(second).unwrap().species_id, 2);
        // The slot was recycled rather than growing the arena.
        assert_eq!(surface.slots.len(), 1);
    }

    #[test]
    fn remove_past_end_is_none() {
        let mut surface = SurfaceState::new();
        assert!(surface.remove_at(0).is_none());
        surface.insert(BoundParticle::new(0, 0.0, 0.0));
        assert!(surface.remove_at(1).is_none());
        assert_eq!(surface.len(), 1);
    }

    #[test]
    fn parallel_and_serial_views_agree() {
        let mut surface = SurfaceState::new();
        for i in 0..20 {
            surface.insert(BoundParticle::new(i % 3, i as f64 * 0.1, 1.0));
        }
        surface.remove_at(4);
        surface.remove_at(10);
        let serial: usize = surface.particles().count();
        let parallel: usize = surface.par_particles().count();
        assert_eq!(serial, 18);
        assert_eq!(parallel, serial);
    }
}
