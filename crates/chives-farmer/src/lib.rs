//! Chives farmer library.
//!
//! Farmer sits between the full node, harvesters and an optional pool. Full node announces
//! signage points, harvesters respond with proofs of space for them, and the farmer correlates
//! both in [`SignagePointCache`] for as long as they may still be useful. When pooling is
//! configured, the farmer also adapts partial submission difficulty and keeps reward targets in
//! line with what the pool expects.
//!
//! Everything is owned by [`Farmer`], which is created from [`FarmerOptions`] and runs its
//! background tasks after [`Farmer::start`] until [`Farmer::close`] is called.

pub mod config;
pub mod consensus;
pub mod farmer;
pub mod harvester;
pub mod keychain;
pub mod pool;
pub mod protocol;
pub mod reward_targets;
pub mod signage_point_cache;
#[cfg(test)]
mod test_utils;
pub mod utils;

pub use farmer::{Farmer, FarmerError, FarmerOptions};
pub use signage_point_cache::SignagePointCache;
