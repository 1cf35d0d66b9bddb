//! Audio input collaborator seam.
//!
//! The engine never touches devices, PCM, or encoders. A host supplies an
//! `AudioInput` that hands back already-encoded chunks (e.g. a browser
//! recorder's container fragments, or a desktop encoder's output).

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Requested processing features for the input stream.
///
/// The session asks for the primary set first and retries once with the
/// fallback set (all processing disabled) before giving up — some stacks
/// refuse processed capture but accept a raw stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl CaptureConstraints {
    pub fn primary() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }

    pub fn fallback() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::primary()
    }
}

/// Why an input stream could not be opened.
#[derive(Debug, Clone, Error)]
pub enum InputError {
    /// The user or OS refused access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The device is missing, busy, or misconfigured.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// An open input stream: the negotiated container mime type plus a channel of
/// encoded chunks. Implementations close the channel (drop their sender) when
/// `AudioInput::stop` releases the stream.
pub struct InputStream {
    pub mime_type: String,
    pub chunks: mpsc::Receiver<Vec<u8>>,
}

/// Capture collaborator contract.
#[async_trait]
pub trait AudioInput: Send {
    /// Open an input stream with the given constraints.
    async fn start(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<InputStream, InputError>;

    /// Release the stream. Must close the chunk channel so the session's
    /// collector can finish draining.
    async fn stop(&mut self) -> Result<(), InputError>;
}
