//! Turnstile - Inbound Event Gating Pipeline
//!
//! This crate implements the admission path of a message-driven service:
//! every inbound event passes an allow-list authorization gate and a
//! per-principal fixed-window throttle before it reaches business handlers.
//! Denials short-circuit the gate chain and are reported back to the
//! originating channel through a pluggable notification sink.

pub mod admin;
pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod pipeline;
pub mod sink;
