//! The closed set of node kinds and the static tables describing them.
//!
//! Role
//! - [`ExprType`] tags every node of the pool. Its declaration order is the global type rank
//!   used by the simplification order when two nodes of different kinds are compared.
//! - [`RESERVED_FUNCTIONS`] maps every reserved function name to its kind and arity.
//!
//! Example
//! ```rust
//! use hycas::expr::variant::{ExprType, reserved_function};
//! let info = reserved_function("cos").unwrap();
//! assert_eq!(info.kind, ExprType::Cosine);
//! assert_eq!(info.min_arity, 1);
//! ```

use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumIter, FromRepr, IntoStaticStr};

/// Kind tag of a node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, FromRepr, EnumIs, IntoStaticStr,
)]
#[repr(u8)]
pub enum ExprType {
    // Poisoned values
    Undefined,
    Nonreal,
    // Numbers
    Rational,
    Decimal,
    Infinity,
    // Leaves
    Constant,
    Symbol,
    Function,
    // Operators
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Power,
    Opposite,
    Factorial,
    Parenthesis,
    Store,
    Comparison,
    Matrix,
    List,
    // Complex parts
    AbsoluteValue,
    ComplexArgument,
    RealPart,
    ImaginaryPart,
    Conjugate,
    // Roots and logarithms
    SquareRoot,
    NthRoot,
    NaperianLogarithm,
    CommonLogarithm,
    Logarithm,
    // Trigonometry
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCosine,
    ArcTangent,
    HyperbolicSine,
    HyperbolicCosine,
    HyperbolicTangent,
    HyperbolicArcSine,
    HyperbolicArcCosine,
    HyperbolicArcTangent,
    // Rounding and integer arithmetic
    Floor,
    Ceiling,
    FracPart,
    Round,
    GreatCommonDivisor,
    LeastCommonMultiple,
    DivisionQuotient,
    DivisionRemainder,
    BinomialCoefficient,
    PermuteCoefficient,
    // Matrices
    Determinant,
    MatrixInverse,
    MatrixTrace,
    MatrixTranspose,
    MatrixDimension,
    // Lists
    ListSum,
    ListMean,
    // Parametered
    Derivative,
    Integral,
    Sum,
    Product,
}

/// Number of children a node of a given kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Addition, Multiplication and Matrix.
    Variadic,
    /// Inclusive bounds.
    Range(usize, usize),
}

impl Arity {
    /// Whether a node may carry `count` children.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::Variadic => count >= 2,
            Arity::Range(min, max) => (min..=max).contains(&count),
        }
    }
}

impl ExprType {
    /// Rational, Decimal and Infinity.
    pub fn is_number(self) -> bool {
        matches!(self, ExprType::Rational | ExprType::Decimal | ExprType::Infinity)
    }

    /// Undefined and Nonreal.
    pub fn is_poison(self) -> bool {
        matches!(self, ExprType::Undefined | ExprType::Nonreal)
    }

    /// Functions that bind their second argument as a variable over their first.
    pub fn is_parametered(self) -> bool {
        matches!(self, ExprType::Derivative | ExprType::Integral | ExprType::Sum | ExprType::Product)
    }

    pub fn is_trigonometric(self) -> bool {
        (ExprType::Sine as u8..=ExprType::HyperbolicArcTangent as u8).contains(&(self as u8))
    }

    pub fn is_matrix_function(self) -> bool {
        (ExprType::Determinant as u8..=ExprType::MatrixDimension as u8).contains(&(self as u8))
    }

    /// Functions whose arguments are lists.
    pub fn is_list_function(self) -> bool {
        matches!(self, ExprType::ListSum | ExprType::ListMean)
    }

    /// Whether this kind is spelled `name(args)`.
    pub fn is_reserved_function(self) -> bool {
        self as u8 >= ExprType::AbsoluteValue as u8
    }

    pub fn arity(self) -> Arity {
        use ExprType::*;
        match self {
            Undefined | Nonreal | Rational | Decimal | Infinity | Constant | Symbol => Arity::Fixed(0),
            Addition | Multiplication | Matrix => Arity::Variadic,
            List => Arity::Range(0, usize::MAX),
            ListMean => Arity::Range(1, 2),
            Function | Opposite | Factorial | Parenthesis => Arity::Fixed(1),
            Subtraction | Division | Power | Store | Comparison => Arity::Fixed(2),
            Logarithm | NthRoot | Round | GreatCommonDivisor | LeastCommonMultiple | DivisionQuotient
            | DivisionRemainder | BinomialCoefficient | PermuteCoefficient => Arity::Fixed(2),
            Derivative => Arity::Fixed(3),
            Integral | Sum | Product => Arity::Fixed(4),
            _ => Arity::Fixed(1),
        }
    }

    /// Name a reserved function is spelled with. `Logarithm` spells as `log` with two arguments
    /// and `ListSum` as `sum` with one.
    pub fn function_name(self) -> Option<&'static str> {
        use ExprType::*;
        let name = match self {
            AbsoluteValue => "abs",
            ComplexArgument => "arg",
            RealPart => "re",
            ImaginaryPart => "im",
            Conjugate => "conj",
            SquareRoot => "√",
            NthRoot => "root",
            NaperianLogarithm => "ln",
            CommonLogarithm | Logarithm => "log",
            Sine => "sin",
            Cosine => "cos",
            Tangent => "tan",
            ArcSine => "asin",
            ArcCosine => "acos",
            ArcTangent => "atan",
            HyperbolicSine => "sinh",
            HyperbolicCosine => "cosh",
            HyperbolicTangent => "tanh",
            HyperbolicArcSine => "asinh",
            HyperbolicArcCosine => "acosh",
            HyperbolicArcTangent => "atanh",
            Floor => "floor",
            Ceiling => "ceil",
            FracPart => "frac",
            Round => "round",
            GreatCommonDivisor => "gcd",
            LeastCommonMultiple => "lcm",
            DivisionQuotient => "quo",
            DivisionRemainder => "rem",
            BinomialCoefficient => "binomial",
            PermuteCoefficient => "permute",
            Determinant => "det",
            MatrixInverse => "inverse",
            MatrixTrace => "trace",
            MatrixTranspose => "transpose",
            MatrixDimension => "dim",
            ListMean => "mean",
            Derivative => "diff",
            Integral => "int",
            ListSum | Sum => "sum",
            Product => "product",
            _ => return None,
        };
        Some(name)
    }
}

/// Entry of the reserved function table. A call takes either `min_arity` or `max_arity`
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    pub kind: ExprType,
    pub min_arity: usize,
    pub max_arity: usize,
}

const fn unary(kind: ExprType) -> FunctionInfo {
    FunctionInfo { kind, min_arity: 1, max_arity: 1 }
}

const fn binary(kind: ExprType) -> FunctionInfo {
    FunctionInfo { kind, min_arity: 2, max_arity: 2 }
}

const fn nary(kind: ExprType, arity: usize) -> FunctionInfo {
    FunctionInfo { kind, min_arity: arity, max_arity: arity }
}

/// Reserved function names. `log` maps to the common logarithm and accepts an optional base;
/// `sum` with a single argument sums a list.
pub static RESERVED_FUNCTIONS: phf::Map<&'static str, FunctionInfo> = phf::phf_map! {
    "abs" => unary(ExprType::AbsoluteValue),
    "arg" => unary(ExprType::ComplexArgument),
    "re" => unary(ExprType::RealPart),
    "im" => unary(ExprType::ImaginaryPart),
    "conj" => unary(ExprType::Conjugate),
    "√" => unary(ExprType::SquareRoot),
    "root" => binary(ExprType::NthRoot),
    "ln" => unary(ExprType::NaperianLogarithm),
    "log" => FunctionInfo { kind: ExprType::CommonLogarithm, min_arity: 1, max_arity: 2 },
    "sin" => unary(ExprType::Sine),
    "cos" => unary(ExprType::Cosine),
    "tan" => unary(ExprType::Tangent),
    "asin" => unary(ExprType::ArcSine),
    "acos" => unary(ExprType::ArcCosine),
    "atan" => unary(ExprType::ArcTangent),
    "sinh" => unary(ExprType::HyperbolicSine),
    "cosh" => unary(ExprType::HyperbolicCosine),
    "tanh" => unary(ExprType::HyperbolicTangent),
    "asinh" => unary(ExprType::HyperbolicArcSine),
    "acosh" => unary(ExprType::HyperbolicArcCosine),
    "atanh" => unary(ExprType::HyperbolicArcTangent),
    "floor" => unary(ExprType::Floor),
    "ceil" => unary(ExprType::Ceiling),
    "frac" => unary(ExprType::FracPart),
    "round" => binary(ExprType::Round),
    "gcd" => binary(ExprType::GreatCommonDivisor),
    "lcm" => binary(ExprType::LeastCommonMultiple),
    "quo" => binary(ExprType::DivisionQuotient),
    "rem" => binary(ExprType::DivisionRemainder),
    "binomial" => binary(ExprType::BinomialCoefficient),
    "permute" => binary(ExprType::PermuteCoefficient),
    "det" => unary(ExprType::Determinant),
    "inverse" => unary(ExprType::MatrixInverse),
    "trace" => unary(ExprType::MatrixTrace),
    "transpose" => unary(ExprType::MatrixTranspose),
    "dim" => unary(ExprType::MatrixDimension),
    "diff" => nary(ExprType::Derivative, 3),
    "int" => nary(ExprType::Integral, 4),
    "mean" => FunctionInfo { kind: ExprType::ListMean, min_arity: 1, max_arity: 2 },
    "sum" => FunctionInfo { kind: ExprType::Sum, min_arity: 1, max_arity: 4 },
    "product" => nary(ExprType::Product, 4),
};

pub fn reserved_function(name: &str) -> Option<&'static FunctionInfo> {
    RESERVED_FUNCTIONS.get(name)
}

/// Longest identifier accepted by the parser, in characters.
pub const MAX_IDENTIFIER_LENGTH: usize = 7;

/// Names that can be neither stored into nor used as parameters.
pub fn is_reserved_name(name: &str) -> bool {
    reserved_function(name).is_some()
        || ConstantKind::from_symbol(name).is_some()
        || matches!(name, "ans" | "inf" | "undef" | "nonreal" | "u" | "v" | "w")
}

/// Mathematical constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromRepr)]
#[repr(u8)]
pub enum ConstantKind {
    Pi,
    E,
    ImaginaryUnit,
}

impl ConstantKind {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstantKind::Pi => "π",
            ConstantKind::E => "ℯ",
            ConstantKind::ImaginaryUnit => "𝐢",
        }
    }

    pub fn from_symbol(text: &str) -> Option<Self> {
        match text {
            "π" => Some(ConstantKind::Pi),
            "ℯ" => Some(ConstantKind::E),
            "𝐢" => Some(ConstantKind::ImaginaryUnit),
            _ => None,
        }
    }

    pub fn is_real(self) -> bool {
        !matches!(self, ConstantKind::ImaginaryUnit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromRepr)]
#[repr(u8)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl ComparisonOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "≠",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "≤",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => "≥",
        }
    }
}
