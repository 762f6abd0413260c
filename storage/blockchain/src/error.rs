//! Store error type.

//---------------------------------------------------------------------------------------------------- Import
use bramble_database::{InitError, RuntimeError};
use bramble_types::{KeyImage, MalformedBlob};

//---------------------------------------------------------------------------------------------------- StoreError
/// Errors surfaced by the [`Blockchain`](crate::Blockchain) store.
///
/// Two tiers: invariant violations (key image collision, height gap,
/// malformed blobs) abort the surrounding write transaction and leave the
/// store unchanged; transient IO errors are reported without retry.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A blob failed to decode. On the write path this rejects the input;
    /// on the read path it means a stored blob is corrupt, which is fatal
    /// to that operation but not the process.
    #[error(transparent)]
    MalformedBlob(#[from] MalformedBlob),

    /// A transaction tried to spend a key image the chain already marked
    /// spent: the core double-spend invariant.
    #[error("key image {0} is already marked spent")]
    KeyImageAlreadySpent(KeyImage),

    /// A stored transaction carried an input variant the engine does not
    /// index (`to_script`/`to_scripthash`).
    #[error("unsupported transaction input variant")]
    UnsupportedInput,

    /// A stored transaction carried an output target the engine does not
    /// index.
    #[error("unsupported transaction output target")]
    UnsupportedOutput,

    /// No transaction with the given hash is stored.
    #[error("transaction not found")]
    TxNotFound,

    /// No block with the given height or hash is stored.
    #[error("block not found")]
    BlockNotFound,

    /// [`pop_block`](crate::Blockchain::pop_block) on an empty chain.
    #[error("the chain is empty")]
    EmptyChain,

    /// An IO error outside the database environment (scratchpad file,
    /// bootstrap stream).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The scratchpad disagrees with `metadata.scratchpad_len`; rebuild it
    /// by replaying the chain
    /// ([`rebuild_scratchpad`](crate::Blockchain::rebuild_scratchpad)).
    #[error("corrupt scratchpad: {0}")]
    CorruptScratchpad(&'static str),

    /// The store (or its directory) is already open.
    #[error("store is already open")]
    AlreadyOpen,

    /// A write operation arrived while the store was shutting down.
    #[error("store is closing")]
    Closing,

    /// A database error bubbled up from the environment.
    #[error(transparent)]
    Database(RuntimeError),
}

impl From<RuntimeError> for StoreError {
    fn from(error: RuntimeError) -> Self {
        match error {
            RuntimeError::Io(io) => Self::Io(io),
            other => Self::Database(other),
        }
    }
}

impl From<InitError> for StoreError {
    fn from(error: InitError) -> Self {
        match error {
            InitError::AlreadyOpen => Self::AlreadyOpen,
            InitError::Io(io) => Self::Io(io),
            InitError::Corrupt(s) => Self::Database(RuntimeError::Storage(s)),
        }
    }
}
