//! Pre-allocated reusable storage for short-lived entities
//!
//! Two flavors:
//! - `Pool<T>`: generational handles over a slot vector with a LIFO free list.
//!   Used for projectiles, which are referenced across a frame by handle.
//! - `ParticlePool`: active particles packed into a contiguous prefix; release
//!   swaps with the last active slot so iteration is one slice.
//!
//! Neither pool ever refuses a request: both grow the backing store instead.

use glam::Vec2;

/// Types that can live in a `Pool`
pub trait Poolable {
    type Init;

    /// Build a fresh instance
    fn create(init: Self::Init) -> Self;

    /// Overwrite every field from `init`, reusing owned buffers
    fn reinit(&mut self, init: Self::Init);
}

/// Generational reference to a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    generation: u32,
    live: bool,
}

/// Growable object pool with idempotent release
#[derive(Debug, Clone)]
pub struct Pool<T: Poolable> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Take an instance, reusing the most recently released slot if any
    pub fn acquire(&mut self, init: T::Init) -> Handle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value.reinit(init);
            slot.live = true;
            return Handle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            value: T::create(init),
            generation: 0,
            live: true,
        });
        Handle {
            index,
            generation: 0,
        }
    }

    /// Return an instance to the pool. Stale or repeated handles are ignored.
    ///
    /// Returns true if the handle was live.
    pub fn release(&mut self, handle: Handle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if !slot.live || slot.generation != handle.generation {
            return false;
        }
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        true
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.live && s.generation == handle.generation)
            .map(|s| &s.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.live && s.generation == handle.generation)
            .map(|s| &mut s.value)
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Live instances with their handles, in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.live).map(|(i, s)| {
            (
                Handle {
                    index: i as u32,
                    generation: s.generation,
                },
                &s.value,
            )
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| {
                (
                    Handle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    &mut s.value,
                )
            })
    }

    /// Release every live instance matching `pred`; returns how many were released
    pub fn release_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let mut released = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.live && pred(&slot.value) {
                slot.live = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(i as u32);
                released += 1;
            }
        }
        self.live -= released;
        released
    }

    /// Release every in-flight instance
    pub fn drain(&mut self) -> usize {
        self.release_where(|_| true)
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Size of the backing store (live + reusable)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of released slots waiting for reuse
    pub fn reusable(&self) -> usize {
        self.free.len()
    }
}

/// Render tag for particles (color lookup on the renderer side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleTag {
    #[default]
    Spark,
    Smoke,
    Ember,
    Shield,
}

/// A short-lived visual particle
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
    pub tag: ParticleTag,
    /// Current slot in the pool; kept in sync on every swap
    pub slot: usize,
}

impl Particle {
    /// Remaining life as a 0-1 fraction
    pub fn life_fraction(&self) -> f32 {
        if self.max_life <= 0.0 {
            0.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }
}

/// Spawn parameters for a particle
#[derive(Debug, Clone, Copy)]
pub struct ParticleSpawn {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub size: f32,
    pub tag: ParticleTag,
}

/// Particle storage where active particles are always `storage[..active]`
#[derive(Debug, Clone, Default)]
pub struct ParticlePool {
    storage: Vec<Particle>,
    active: usize,
}

impl ParticlePool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            active: 0,
        }
    }

    /// O(1) spawn; returns the slot index
    pub fn acquire(&mut self, spawn: ParticleSpawn) -> usize {
        let slot = self.active;
        let particle = Particle {
            pos: spawn.pos,
            vel: spawn.vel,
            life: spawn.life,
            max_life: spawn.life,
            size: spawn.size,
            tag: spawn.tag,
            slot,
        };
        if slot < self.storage.len() {
            self.storage[slot] = particle;
        } else {
            self.storage.push(particle);
        }
        self.active += 1;
        slot
    }

    /// O(1) swap-with-last release. Slots outside the active prefix are ignored.
    pub fn release(&mut self, slot: usize) -> bool {
        if slot >= self.active {
            return false;
        }
        let last = self.active - 1;
        self.storage.swap(slot, last);
        self.storage[slot].slot = slot;
        self.storage[last].slot = last;
        self.active = last;
        true
    }

    /// Integrate motion and retire expired particles
    pub fn update(&mut self, dt: f32, drag: f32) {
        let damping = (1.0 - drag * dt).clamp(0.0, 1.0);
        // Walk backward so swapped-in particles were already updated
        let mut i = self.active;
        while i > 0 {
            i -= 1;
            let p = &mut self.storage[i];
            p.pos += p.vel * dt;
            p.vel *= damping;
            p.life -= dt;
            if p.life <= 0.0 {
                self.release(i);
            }
        }
    }

    /// Active particles as one contiguous slice
    pub fn active(&self) -> &[Particle] {
        &self.storage[..self.active]
    }

    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn clear(&mut self) {
        self.active = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug)]
    struct Shot {
        damage: u32,
        tags: Vec<u32>,
    }

    impl Poolable for Shot {
        type Init = u32;

        fn create(damage: u32) -> Self {
            Self {
                damage,
                tags: Vec::new(),
            }
        }

        fn reinit(&mut self, damage: u32) {
            self.damage = damage;
            self.tags.clear();
        }
    }

    fn spark(x: f32, life: f32) -> ParticleSpawn {
        ParticleSpawn {
            pos: Vec2::new(x, 0.0),
            vel: Vec2::ZERO,
            life,
            size: 2.0,
            tag: ParticleTag::Spark,
        }
    }

    #[test]
    fn test_acquire_reuses_released_slot_lifo() {
        let mut pool: Pool<Shot> = Pool::new();
        let a = pool.acquire(1);
        let b = pool.acquire(2);
        pool.release(a);
        pool.release(b);

        let c = pool.acquire(3);
        assert_eq!(c.index(), b.index());
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.get(c).map(|s| s.damage), Some(3));
    }

    #[test]
    fn test_reacquire_resets_state() {
        let mut pool: Pool<Shot> = Pool::new();
        let a = pool.acquire(5);
        pool.get_mut(a).unwrap().tags.push(42);
        pool.release(a);

        let b = pool.acquire(7);
        let shot = pool.get(b).unwrap();
        assert_eq!(shot.damage, 7);
        assert!(shot.tags.is_empty());
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool: Pool<Shot> = Pool::new();
        let a = pool.acquire(1);
        assert!(pool.release(a));
        let reusable = pool.reusable();
        assert!(!pool.release(a));
        assert_eq!(pool.reusable(), reusable);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_stale_handle_cannot_touch_new_occupant() {
        let mut pool: Pool<Shot> = Pool::new();
        let a = pool.acquire(1);
        pool.release(a);
        let b = pool.acquire(2);
        assert_eq!(a.index(), b.index());
        assert!(pool.get(a).is_none());
        assert!(!pool.release(a));
        assert!(pool.is_live(b));
    }

    #[test]
    fn test_drain_releases_everything() {
        let mut pool: Pool<Shot> = Pool::new();
        for i in 0..10 {
            pool.acquire(i);
        }
        assert_eq!(pool.drain(), 10);
        assert!(pool.is_empty());
        assert_eq!(pool.reusable(), 10);
        assert_eq!(pool.iter().count(), 0);
    }

    #[test]
    fn test_particle_release_swaps_last_into_hole() {
        let mut pool = ParticlePool::with_capacity(4);
        pool.acquire(spark(0.0, 1.0));
        pool.acquire(spark(1.0, 1.0));
        pool.acquire(spark(2.0, 1.0));

        assert!(pool.release(0));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.active()[0].pos.x, 2.0);
        assert_eq!(pool.active()[0].slot, 0);
        assert!(!pool.release(2));
    }

    #[test]
    fn test_particle_update_expires() {
        let mut pool = ParticlePool::default();
        pool.acquire(spark(0.0, 0.05));
        pool.acquire(spark(1.0, 1.0));
        pool.acquire(spark(2.0, 0.05));
        pool.update(0.1, 0.0);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.active()[0].pos.x, 1.0);
        assert_eq!(pool.active()[0].slot, 0);
    }

    proptest! {
        #[test]
        fn prop_pool_double_release_never_duplicates(ops in prop::collection::vec((any::<bool>(), 0usize..16), 1..200)) {
            let mut pool: Pool<Shot> = Pool::new();
            let mut handles: Vec<Handle> = Vec::new();
            for (acquire, pick) in ops {
                if acquire || handles.is_empty() {
                    handles.push(pool.acquire(pick as u32));
                } else {
                    let h = handles[pick % handles.len()];
                    pool.release(h);
                    let before = pool.reusable();
                    pool.release(h);
                    prop_assert_eq!(pool.reusable(), before);
                }
            }
            let mut free = pool.free.clone();
            free.sort_unstable();
            free.dedup();
            prop_assert_eq!(free.len(), pool.reusable());
            prop_assert_eq!(pool.len() + pool.reusable(), pool.capacity());
        }

        #[test]
        fn prop_particles_stay_contiguous(ops in prop::collection::vec((any::<bool>(), 0usize..32), 1..300)) {
            let mut pool = ParticlePool::default();
            let mut expected = 0usize;
            for (acquire, pick) in ops {
                if acquire {
                    pool.acquire(spark(pick as f32, 1.0));
                    expected += 1;
                } else if pool.release(pick) {
                    expected -= 1;
                }
                prop_assert_eq!(pool.len(), expected);
                let active = pool.active();
                prop_assert_eq!(active.len(), expected);
                let mut slots: Vec<usize> = active.iter().map(|p| p.slot).collect();
                for (i, s) in slots.iter().enumerate() {
                    prop_assert_eq!(*s, i);
                }
                slots.dedup();
                prop_assert_eq!(slots.len(), expected);
            }
        }
    }
}
