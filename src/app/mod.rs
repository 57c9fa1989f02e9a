//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the Tavolo weight station:
//! FSM orchestration, threshold hysteresis, report throttling and command
//! dispatch.  All interaction with hardware happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod commands;
pub mod events;
pub mod policy;
pub mod ports;
pub mod service;
