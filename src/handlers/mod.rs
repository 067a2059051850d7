// src/handlers/mod.rs

pub mod access;
pub mod exam;
pub mod progress;
