//! RobKnow - An online course platform
//!
//! Instructors build courses out of ordered modules holding text, file,
//! image and video items; students browse the catalogue and enroll.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod render;
pub mod services;
