// src/lib.rs

pub mod api;
pub mod app_state;
pub mod binary;
pub mod call_trace;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod metadata;
pub mod service;
