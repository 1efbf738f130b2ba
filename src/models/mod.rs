// src/models/mod.rs

pub mod certificate;
pub mod course;
pub mod gamification;
pub mod progress;
pub mod quiz;
pub mod user;
