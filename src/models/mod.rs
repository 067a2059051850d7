// src/models/mod.rs

pub mod entitlement;
pub mod exam_record;
pub mod payment;
pub mod progress;
pub mod question;
pub mod tier;
