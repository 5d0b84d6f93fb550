// Path: crates/tx/src/system/mod.rs

//! Core, non-optional state machinery shared by every route: balances and
//! nonces, resolutions and validator power, and the resolution types.

pub mod accounts;
pub mod resolutions;
pub mod voting;
