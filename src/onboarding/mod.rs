//! Onboarding gate: does this user have a company profile yet?
//!
//! Non-admin users must register a company before they may use the
//! submission views. The answer arrives over the network, so the gate
//! caches a tri-state result and discards responses that were issued for
//! a superseded identity.

pub mod gate;

pub use gate::{OnboardingEvent, OnboardingGate, OnboardingStatus};
