//! Client for the remote obfuscation API
//!
//! The relay never obfuscates anything itself. This module speaks the
//! `POST /api/obfuscate` contract and guards against duplicate submissions.

pub mod client;
pub mod session;

pub use client::{interpret_response, ObfuscationClient, ObfuscationError, ObfuscationRequest};
pub use session::{ObfuscatorSession, SubmissionState};
