//! Threaded host for the arpeggiator.
//!
//! The [`Arpeggiator`](crate::Arpeggiator) is single-threaded by contract.
//! [`ArpHandle`] owns a dedicated thread that holds it, drives its clock from
//! `Instant`, and receives every mutation as an [`ArpCmd`] over channels, so
//! callers on any thread (UI, MIDI callbacks) are serialized onto one executor.

mod arp_thread;
mod commands;
mod handle;

pub use commands::{ArpCmd, ArpFeedback};
pub use handle::{ArpHandle, ArpSender, FEEDBACK_CAPACITY};
