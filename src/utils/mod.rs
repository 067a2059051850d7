// src/utils/mod.rs

pub mod access;
pub mod clock;
