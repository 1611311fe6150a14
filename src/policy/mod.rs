//! # Callback Policies
//!
//! Process-wide dispatch rules per callback category: variance, binding
//! ranking, and result acceptance. Each policy also carries a filter scope
//! for policy-wide interceptors.

pub mod callback_policy;

pub use callback_policy::{creates, handles, looksup, provides, CallbackPolicy};
