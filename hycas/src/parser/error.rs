use std::ops::Range;

use thiserror::Error;

use crate::pool::PoolError;

/// Rejection of an input text. Every variant carries the byte span it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("unexpected {found}")]
    UnexpectedToken { found: String, span: Range<usize> },
    #[error("invalid token `{text}`")]
    InvalidToken { text: String, span: Range<usize> },
    #[error("identifier `{name}` is longer than {max} characters")]
    IdentifierTooLong { name: String, max: usize, span: Range<usize> },
    #[error("`{name}` is a reserved name")]
    ReservedName { name: String, span: Range<usize> },
    #[error("`{name}` expects {expected} argument(s), found {found}")]
    ArityMismatch { name: String, expected: String, found: usize, span: Range<usize> },
    #[error("`{name}` must be followed by its arguments")]
    ExpectedArguments { name: String, span: Range<usize> },
    #[error("the variable of `{name}` must be a symbol")]
    ParameterNotSymbol { name: String, span: Range<usize> },
    #[error("`{name}` cannot take itself as argument")]
    RecursiveFunctionArgument { name: String, span: Range<usize> },
    #[error("matrix rows must all have {expected} entries")]
    RaggedMatrix { expected: usize, span: Range<usize> },
    #[error("matrices cannot be empty")]
    EmptyMatrix { span: Range<usize> },
    #[error("only one comparison is allowed")]
    ChainedComparison { span: Range<usize> },
    #[error("cannot store into this target")]
    InvalidStoreTarget { span: Range<usize> },
    #[error("expression is nested too deeply")]
    NestingTooDeep { span: Range<usize> },
    #[error("parsing ran out of memory: {source}")]
    AllocationFailure {
        #[source]
        source: PoolError,
        span: Range<usize>,
    },
}

impl ParserError {
    pub fn span(&self) -> Range<usize> {
        match self {
            ParserError::UnexpectedToken { span, .. }
            | ParserError::InvalidToken { span, .. }
            | ParserError::IdentifierTooLong { span, .. }
            | ParserError::ReservedName { span, .. }
            | ParserError::ArityMismatch { span, .. }
            | ParserError::ExpectedArguments { span, .. }
            | ParserError::ParameterNotSymbol { span, .. }
            | ParserError::RecursiveFunctionArgument { span, .. }
            | ParserError::RaggedMatrix { span, .. }
            | ParserError::EmptyMatrix { span }
            | ParserError::ChainedComparison { span }
            | ParserError::InvalidStoreTarget { span }
            | ParserError::NestingTooDeep { span }
            | ParserError::AllocationFailure { span, .. } => span.clone(),
        }
    }
}

pub type ParserResult<T> = Result<T, ParserError>;
