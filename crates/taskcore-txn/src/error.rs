use thiserror::Error;

/// Failure applying a single [`taskcore_types::TransactionEnvelope`] (§4.C,
/// §7 `ApplyFailure`).
#[derive(Debug, Clone, Error)]
pub enum TxnError {
    #[error("side effect group for kind '{kind}' references a record of kind '{actual}'")]
    MismatchedSideEffectKind { kind: String, actual: String },

    #[error("side effect group names unknown entity kind '{0}'")]
    UnknownEntityKind(String),
}
