//! Booking workflows for Tizeta.
//!
//! Everything here is written against the [`InventoryStore`] and
//! [`PaymentGateway`] traits from `tizeta-core`:
//!
//! - [`ReservationEngine`] creates and cancels seat holds.
//! - [`Checkout`] pairs a new hold with a gateway checkout page.
//! - [`SettlementCoordinator`] applies payment callbacks to holds.
//! - [`Sweeper`] reclaims holds whose window has closed.
//!
//! [`InventoryStore`]: tizeta_core::store::InventoryStore
//! [`PaymentGateway`]: tizeta_core::gateway::PaymentGateway

mod checkout;
mod engine;
mod settlement;
mod sweeper;

pub use checkout::{Checkout, CheckoutRequest, CheckoutSession};
pub use engine::{HoldPolicy, HoldRequest, HoldView, ReservationEngine, new_payment_ref};
pub use settlement::{Settlement, SettlementCoordinator};
pub use sweeper::{SweepReport, Sweeper};

/// Lift a backend error into the core taxonomy.
pub(crate) fn core<E: Into<tizeta_core::Error>>(e: E) -> tizeta_core::Error { e.into() }

#[cfg(test)]
mod tests;
