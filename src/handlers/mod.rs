// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod certificate;
pub mod course;
pub mod gamification;
pub mod progress;
pub mod quiz;
