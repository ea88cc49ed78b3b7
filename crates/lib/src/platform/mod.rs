//! Host-dependent locations and defaults.

pub mod paths;
