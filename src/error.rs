use thiserror::Error;

/// Errors reported by the platform radio
///
/// The first five variants form the status taxonomy surfaced to the stack;
/// the remaining variants are internal conditions of the submission path
/// which the public operations translate before returning.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum Error {
    /// The radio is in a state which does not permit the request, or an
    /// equivalent request is already in flight
    #[error("radio busy")]
    Busy,
    /// The submission is malformed or carries an unsupported frame type
    #[error("submission aborted")]
    Abort,
    /// The co-processor exhausted its CSMA-CA backoffs without finding a
    /// clear channel
    #[error("channel access failure")]
    ChannelAccessFailure,
    /// An acknowledgment was requested but never arrived
    #[error("no acknowledgment received")]
    NoAck,
    /// The co-processor rejected a synchronous command
    #[error("co-processor command failed")]
    Failed,
    /// All transmission handles are occupied
    #[error("in-transit table overflow")]
    Overflow,
    /// A confirm referenced a handle with no in-transit record
    #[error("unknown transmission handle")]
    UnknownHandle,
}
