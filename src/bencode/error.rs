use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("Unexpected end of input")]
	UnexpectedEnd,

	#[error("Invalid Integer {0}")]
	InvalidInteger(String),

	#[error("Invalid string length {0}")]
	InvalidLength(String),

	#[error("Invalid Format {0}")]
	InvalidFormat(String),

	#[error("Duplicate dictionary key '{0}'")]
	DuplicateKey(String),

	#[error("Nesting deeper than {0} levels")]
	NestingTooDeep(usize),

	#[error("{0} trailing bytes after top-level value")]
	TrailingData(usize),
}
