//! Motion simulation: fixed-tick velocity integration inside
//! population-scaled bounds.

use crate::hub::Hub;
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Advance every identity one step: integrate position by velocity, and on
/// any axis that leaves the current bounds, reflect the velocity component
/// and clamp the position to the boundary.
///
/// Bounds are recomputed from the current population on every call, so the
/// roaming volume shrinks and grows as clients leave and join.
pub fn step(registry: &mut Registry) {
    let bounds = registry.bounds();
    for identity in registry.identities_mut() {
        identity.position += identity.velocity;
        for axis in 0..3 {
            if identity.position[axis].abs() > bounds {
                identity.velocity[axis] = -identity.velocity[axis];
                identity.position[axis] = identity.position[axis].clamp(-bounds, bounds);
            }
        }
    }
}

/// Drive the simulation on a fixed period. Empty registries skip the tick
/// silently; otherwise each tick ends with a full roster broadcast.
pub async fn run_sim_loop(hub: Arc<RwLock<Hub>>, tick_interval_ms: u64) {
    let start = Instant::now() + Duration::from_millis(tick_interval_ms);
    let mut ticker = interval_at(start, Duration::from_millis(tick_interval_ms));
    // Skip missed ticks instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let mut hub = hub.write().await;
        if hub.registry().is_empty() {
            continue;
        }
        hub.tick();
    }
}
