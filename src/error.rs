use std::any::Any;

use thiserror::Error;

/// The window or its event loop could not be created. Raised before any
/// GPU resource exists, so the caller can exit cleanly.
#[derive(Debug, Error)]
#[error("failed to initialize {stage}: {message}")]
pub struct WindowInitError {
    stage: &'static str,
    message: String,
}

impl WindowInitError {
    pub fn from_panic(stage: &'static str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            stage,
            message: panic_message(panic),
        }
    }

    pub fn from_error(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

/// Category of a GPU error reported by the driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuErrorKind {
    OutOfMemory,
    Validation,
    Internal,
}

/// A GPU error observed after some operation. Logged, never recovered from.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} during {stage}: {message}")]
pub struct GpuDiagnostic {
    pub kind: GpuErrorKind,
    pub stage: &'static str,
    pub message: String,
}

impl GpuDiagnostic {
    pub fn from_wgpu(stage: &'static str, error: &wgpu::Error) -> Self {
        let kind = match error {
            wgpu::Error::OutOfMemory { .. } => GpuErrorKind::OutOfMemory,
            wgpu::Error::Validation { .. } => GpuErrorKind::Validation,
            _ => GpuErrorKind::Internal,
        };
        Self {
            kind,
            stage,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_error_names_stage() {
        let err = WindowInitError::from_error("window", "no display");
        assert_eq!(err.to_string(), "failed to initialize window: no display");
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = WindowInitError::from_panic("event loop", Box::new("boom"));
        assert_eq!(err.to_string(), "failed to initialize event loop: boom");
        let err = WindowInitError::from_panic("event loop", Box::new(String::from("owned")));
        assert!(err.to_string().ends_with("owned"));
        let err = WindowInitError::from_panic("event loop", Box::new(7u8));
        assert!(err.to_string().ends_with("unknown panic"));
    }

    #[test]
    fn diagnostics_render_kind_and_stage() {
        let diagnostic = GpuDiagnostic {
            kind: GpuErrorKind::Validation,
            stage: "shadow pass",
            message: "bad binding".into(),
        };
        assert_eq!(
            diagnostic.to_string(),
            "Validation during shadow pass: bad binding"
        );
    }
}
