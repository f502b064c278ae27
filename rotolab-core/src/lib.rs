//! Rotolab Core — signal engine and capital-rotation controller.
//!
//! This crate contains the heart of the rotation engine:
//! - Domain types (bars, fills, order ids)
//! - Streaming technical indicators (stochastic, RSI, MACD, SMA, EMA)
//! - Per-instrument signal state with trailing windows and OLS trend fits
//! - Composite buy/sell scoring with configurable rule variants
//! - The rotation controller state machine and its pending-order table
//! - A simulated execution venue and the day-by-day session driver

pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod rotation;
pub mod session;
pub mod signal;
pub mod universe;
