//! Connection registry: the set of online identities and their simulated
//! state. Sole source of truth for who is online.

use crate::config::SwarmConfig;
use chrono::Utc;
use glam::Vec3;
use protocol::{ClientId, ClientSummary};
use rand::Rng;
use std::collections::HashMap;
use uuid::Uuid;

/// One connected participant with a simulated position and color.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Unique id, never reused for the process lifetime.
    pub id: ClientId,
    pub position: Vec3,
    /// Drift direction fixed at connect time; only component signs change
    /// when reflecting off the bounds.
    pub velocity: Vec3,
    /// Unit-normalized RGB.
    pub color: Vec3,
    /// Connection time in epoch milliseconds.
    pub connected_at: i64,
}

/// Registry of connected identities.
#[derive(Debug)]
pub struct Registry {
    swarm: SwarmConfig,
    clients: HashMap<ClientId, Identity>,
}

impl Registry {
    pub fn new(swarm: SwarmConfig) -> Self {
        Self {
            swarm,
            clients: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Identity> {
        self.clients.get(&id)
    }

    /// Coordinate bound for a given population.
    pub fn bounds_for(&self, population: usize) -> f32 {
        let s = &self.swarm;
        if population <= s.crowd_threshold {
            return s.base_bounds;
        }
        let extra = (population - s.crowd_threshold) as f32 * s.bounds_growth_per_client;
        s.base_bounds + extra.min(s.max_extra_bounds)
    }

    /// Minimum spawn separation for a given population.
    pub fn min_distance_for(&self, population: usize) -> f32 {
        let s = &self.swarm;
        if population <= s.crowd_threshold {
            return s.base_min_distance;
        }
        let extra = (population - s.crowd_threshold) as f32 * s.min_distance_growth_per_client;
        (s.base_min_distance + extra).min(s.max_min_distance)
    }

    /// Coordinate bound for the current population.
    pub fn bounds(&self) -> f32 {
        self.bounds_for(self.clients.len())
    }

    /// Admit a new identity with a freshly sampled position, a random drift
    /// velocity, and a random unit-length color.
    pub fn admit(&mut self) -> Identity {
        // Scaling counts the newcomer.
        let population = self.clients.len() + 1;
        let bounds = self.bounds_for(population);
        let min_distance = self.min_distance_for(population);

        let identity = Identity {
            id: Uuid::new_v4(),
            position: self.sample_position(bounds, min_distance),
            velocity: self.random_velocity(),
            color: Self::random_color(),
            connected_at: Utc::now().timestamp_millis(),
        };
        self.clients.insert(identity.id, identity.clone());
        identity
    }

    /// Discard an identity. Safe to call twice.
    pub fn remove(&mut self, id: ClientId) {
        self.clients.remove(&id);
    }

    /// Point-in-time roster view. Order is not stable across calls.
    pub fn snapshot(&self) -> Vec<ClientSummary> {
        self.clients
            .values()
            .map(|c| ClientSummary(c.id, c.position, c.color))
            .collect()
    }

    /// Mutable access for the motion simulator.
    pub fn identities_mut(&mut self) -> impl Iterator<Item = &mut Identity> {
        self.clients.values_mut()
    }

    /// Rejection-sample a spawn point at least `min_distance` from every
    /// current identity. Once the attempt budget is exhausted the last
    /// candidate is accepted unconditionally; placement is best-effort, not
    /// guaranteed collision-free.
    fn sample_position(&self, bounds: f32, min_distance: f32) -> Vec3 {
        let mut rng = rand::rng();
        let mut candidate = random_point(&mut rng, bounds);
        for _ in 0..self.swarm.max_position_attempts {
            let clear = self
                .clients
                .values()
                .all(|c| c.position.distance(candidate) >= min_distance);
            if clear {
                return candidate;
            }
            candidate = random_point(&mut rng, bounds);
        }
        candidate
    }

    fn random_velocity(&self) -> Vec3 {
        let mut rng = rand::rng();
        let drift = self.swarm.max_drift;
        Vec3::new(
            rng.random_range(-drift..=drift),
            rng.random_range(-drift..=drift),
            rng.random_range(-drift..=drift),
        )
    }

    /// Random color with components in 0.4..1.0, normalized to unit length.
    fn random_color() -> Vec3 {
        let mut rng = rand::rng();
        let base = Vec3::new(
            0.4 + rng.random::<f32>() * 0.6,
            0.4 + rng.random::<f32>() * 0.6,
            0.4 + rng.random::<f32>() * 0.6,
        );
        base.normalize()
    }
}

/// Uniform point in the spawn cube: each coordinate in ±bounds/2.
fn random_point(rng: &mut impl Rng, bounds: f32) -> Vec3 {
    Vec3::new(
        (rng.random::<f32>() - 0.5) * bounds,
        (rng.random::<f32>() - 0.5) * bounds,
        (rng.random::<f32>() - 0.5) * bounds,
    )
}
