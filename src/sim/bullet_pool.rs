//! Bullet recycling
//!
//! A bullet is always owned by exactly one of the in-flight set or the free
//! pool. Recycling moves it out of the set before handing it to the pool.

use serde::{Deserialize, Serialize};

use super::state::Bullet;

/// Free list of spent bullets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulletPool {
    free: Vec<Bullet>,
    /// Bullets ever allocated (reuse does not count)
    created: usize,
}

impl BulletPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a bullet from the pool (or allocate one), fully overwritten
    pub fn acquire(&mut self, x: i32, y: i32, speed: i32) -> Bullet {
        match self.free.pop() {
            Some(mut bullet) => {
                bullet.reset(x, y, speed);
                bullet
            }
            None => {
                self.created += 1;
                Bullet::new(x, y, speed)
            }
        }
    }

    pub fn release(&mut self, bullet: Bullet) {
        self.free.push(bullet);
    }

    pub fn recycle(&mut self, bullets: impl IntoIterator<Item = Bullet>) {
        self.free.extend(bullets);
    }

    /// Bullets waiting for reuse
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn created(&self) -> usize {
        self.created
    }
}

/// Where fired bullets go
pub trait BulletSink {
    fn fire(&mut self, x: i32, y: i32, speed: i32);
}

/// Bullets in flight, backed by a pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulletSet {
    active: Vec<Bullet>,
    pool: BulletPool,
    #[serde(skip)]
    scratch: Vec<Bullet>,
}

impl BulletSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bullet> {
        self.active.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bullet> {
        self.active.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Bullet> {
        self.active.get(index)
    }

    pub fn pool(&self) -> &BulletPool {
        &self.pool
    }

    /// Move every bullet matching `pred` (given its index) back to the pool.
    /// Order of the remaining bullets is preserved. Returns how many were recycled.
    pub fn recycle_if(&mut self, mut pred: impl FnMut(usize, &Bullet) -> bool) -> usize {
        let mut recycled = 0;
        self.scratch.clear();
        self.scratch.reserve(self.active.len());
        for (i, bullet) in self.active.drain(..).enumerate() {
            if pred(i, &bullet) {
                self.pool.release(bullet);
                recycled += 1;
            } else {
                self.scratch.push(bullet);
            }
        }
        std::mem::swap(&mut self.active, &mut self.scratch);
        recycled
    }

    /// Recycle the bullets at the given indices
    pub fn recycle_indices(&mut self, indices: &[usize]) -> usize {
        if indices.is_empty() {
            return 0;
        }
        self.recycle_if(|i, _| indices.contains(&i))
    }

    /// Return every in-flight bullet to the pool
    pub fn clear(&mut self) {
        self.pool.recycle(self.active.drain(..));
    }
}

impl BulletSink for BulletSet {
    fn fire(&mut self, x: i32, y: i32, speed: i32) {
        let bullet = self.pool.acquire(x, y, speed);
        self.active.push(bullet);
    }
}

impl BulletSink for Vec<Bullet> {
    fn fire(&mut self, x: i32, y: i32, speed: i32) {
        self.push(Bullet::new(x, y, speed));
    }
}
