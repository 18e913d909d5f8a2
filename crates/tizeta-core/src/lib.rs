//! Core types and trait definitions for the Tizeta seat-booking engine.
//!
//! No HTTP or database code lives here. Storage backends implement
//! [`store::InventoryStore`], payment providers implement
//! [`gateway::PaymentGateway`], and the booking layer is written against
//! those two traits only.

pub mod clock;
pub mod error;
pub mod gateway;
pub mod hold;
pub mod money;
pub mod payment;
pub mod schedule;
pub mod store;

pub use error::{Error, Result};
