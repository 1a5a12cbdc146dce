// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Asynchronous logging core for a real-time game engine.
//!
//! - [`logging`]: bounded entry queue, drain thread, sinks and the logger
//! - [`sync`]: reader/writer spin lock guarding the sink table
//! - [`config`]: JSON5 logger configuration

pub mod config;
pub mod logging;
pub mod sync;
