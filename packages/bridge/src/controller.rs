//! The blocking call into the external controller.

use thiserror::Error;

use crate::error::BridgeError;

/// Failure of a controller call.
///
/// Timeouts are the transport's business; a transport that gives up reports
/// [`ControllerError::Disconnected`] or [`ControllerError::Transport`].
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The controller handled the message and refused it.
    #[error("{0}")]
    Rejected(String),

    /// The controller went away before answering.
    #[error("controller disconnected")]
    Disconnected,

    /// Reading from or writing to the controller failed.
    #[error("controller transport failed: {0}")]
    Transport(#[from] std::io::Error),

    /// The controller answered with something we cannot interpret.
    #[error("controller protocol violation: {0}")]
    Protocol(String),
}

/// Re-entry handle given to the controller for the duration of one call.
///
/// Requests made through it run against the same bridge session as the
/// ledger operation that issued the call.
pub trait PortDispatch {
    /// Deliver `request` to the handler registered under `port`.
    ///
    /// # Errors
    /// Returns the handler's error, or [`BridgeError::UnknownPort`].
    fn call_port(&mut self, port: &str, request: &str) -> Result<String, BridgeError>;
}

/// The external controller.
///
/// `call` blocks the ledger operation until the controller answers. The
/// controller may use `ports` any number of times before it returns.
pub trait Controller {
    /// Hand `message` to the controller and wait for its response.
    ///
    /// # Errors
    /// Returns an error if the controller refuses the message or cannot be reached.
    fn call(&mut self, message: &str, ports: &mut dyn PortDispatch)
        -> Result<String, ControllerError>;
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn call(
        &mut self,
        message: &str,
        ports: &mut dyn PortDispatch,
    ) -> Result<String, ControllerError> {
        (**self).call(message, ports)
    }
}
