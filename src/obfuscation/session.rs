use std::sync::Mutex;

use crate::obfuscation::client::{
    ObfuscationClient, ObfuscationError, ObfuscationRequest, DEFAULT_METHOD,
};

/// Whether a submission is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InFlight,
}

/// User-facing obfuscation state: the selected method and the in-flight guard.
#[derive(Debug)]
pub struct ObfuscatorSession {
    client: ObfuscationClient,
    method: Mutex<String>,
    state: Mutex<SubmissionState>,
}

/// Puts the session back to `Idle` when the submission ends, however it ends.
struct InFlightGuard<'a> {
    state: &'a Mutex<SubmissionState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = SubmissionState::Idle;
    }
}

impl ObfuscatorSession {
    pub fn new(client: ObfuscationClient) -> Self {
        Self {
            client,
            method: Mutex::new(DEFAULT_METHOD.to_string()),
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn select_method(&self, method: impl Into<String>) {
        let method = method.into();
        tracing::info!(method = %method, "Obfuscation method selected");
        *self.method.lock().unwrap_or_else(|e| e.into_inner()) = method;
    }

    pub fn method(&self) -> String {
        self.method.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Obfuscate `script` with the selected method and the default preset.
    ///
    /// The script is trimmed first; an empty script is rejected without a
    /// request. A second call while one is running fails with
    /// `AlreadyInFlight`.
    pub async fn obfuscate(&self, script: &str) -> Result<String, ObfuscationError> {
        let script = script.trim();
        if script.is_empty() {
            return Err(ObfuscationError::EmptyScript);
        }

        let _guard = self.begin()?;
        let request = ObfuscationRequest::new(self.method(), script);

        match self.client.submit(&request).await {
            Ok(output) => {
                tracing::info!(chars = output.chars().count(), "Script obfuscated");
                Ok(output)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Obfuscation failed");
                Err(e)
            }
        }
    }

    fn begin(&self) -> Result<InFlightGuard<'_>, ObfuscationError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == SubmissionState::InFlight {
            return Err(ObfuscationError::AlreadyInFlight);
        }
        *state = SubmissionState::InFlight;
        Ok(InFlightGuard { state: &self.state })
    }
}
