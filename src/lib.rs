
pub mod constants;
pub mod geodesy;
pub mod sites;
pub mod rupture;
pub mod quaddist;
pub mod gc2;
pub mod ps2ff;
pub mod distance;
pub mod error;
pub mod config;
