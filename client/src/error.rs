use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] shared::PoetError),
    #[error("Invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Certificate chains from {actual}, expected {expected}")]
    ChainMismatch { expected: String, actual: String },
    #[error("Certificate covers block {actual}, expected {expected}")]
    BlockMismatch { expected: String, actual: String },
    #[error("Quote does not attest the claimed signup: {0}")]
    QuoteMismatch(String),
}
