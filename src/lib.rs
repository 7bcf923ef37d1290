//! Room availability and booking-conflict engine for a dog hotel.
//!
//! The core decides whether a proposed check-in/check-out range can be
//! granted, derives unavailable dates per room, and guarantees that no
//! two active reservations for the same room ever overlap — including
//! under concurrent submissions, where the store's per-room lock makes
//! the conflict check and the insert one atomic unit.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod sweep;
