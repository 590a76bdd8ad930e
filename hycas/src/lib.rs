//! Symbolic computation engine: a pooled expression tree with a parser, a reducer and a
//! numeric approximator.
//!
//! Text enters through [`Pool::parse`], is normalized by [`Expression::reduce`] and evaluated
//! by [`Expression::approximate`]. Trees live in a fixed-capacity [`Pool`]; running out of room
//! is a recoverable error and reductions roll the pool back when they fail.
//!
//! ```rust
//! use hycas::prelude::*;
//! let pool = Pool::new();
//! let e = pool.parse("2/3-5").unwrap();
//! let reduced = e.reduce(ReductionContext::new(&EmptyContext)).unwrap();
//! assert_eq!(reduced.to_string(), "-13/3");
//! let value = reduced.approximate::<f64>(&ApproximationContext::new(&EmptyContext));
//! assert!((value.re + 13.0 / 3.0).abs() < 1e-12);
//! ```

pub mod approx;
pub mod context;
pub mod encoding;
pub mod expr;
pub mod layout;
pub mod parser;
pub mod pool;
pub mod preferences;
pub mod reduce;
pub mod serialize;
pub mod settings;

pub use expr::Expression;
pub use pool::Pool;

/// Parse `text` into a fresh pool of default capacity.
pub fn parse(text: &str) -> parser::ParserResult<Expression> {
    Pool::new().parse(text)
}

pub mod prelude {
    pub use crate::{
        Expression, Pool,
        approx::{ApproximationContext, Evaluation, Precision},
        context::{Context, EmptyContext, VariableContext},
        expr::{sign::Sign, variant::ExprType},
        reduce::{CircuitBreaker, ReductionContext, ReductionError},
        settings::{AngleUnit, ComplexFormat, PrintFloatMode, SymbolicComputation, Target, UnitFormat},
    };
}
