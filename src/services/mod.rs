// src/services/mod.rs

pub mod entitlement;
pub mod exam;
pub mod history;
pub mod payment;
pub mod progress;
