//! Calculation settings shared by reduction, approximation and printing.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

macro_rules! setting {
    ($(#[$meta:meta])* $name:ident { $(#[default] $default:ident,)? $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter,
            EnumString, Display, IntoStaticStr,
        )]
        #[serde(rename_all = "kebab-case")]
        #[strum(serialize_all = "kebab-case")]
        pub enum $name {
            $(#[default] $default,)?
            $($variant),*
        }
    };
}

setting! {
    /// What the reduced tree is for.
    Target { #[default] User, SystemForAnalysis, SystemForApproximation }
}

setting! {
    /// How complex results are presented; `Real` rejects non-real results.
    ComplexFormat { #[default] Real, Cartesian, Polar }
}

setting! {
    AngleUnit { #[default] Radian, Degree, Gradian }
}

setting! {
    UnitFormat { #[default] Metric, Imperial }
}

setting! {
    /// Which symbols and functions reduction replaces by their definition.
    SymbolicComputation {
        #[default] ReplaceAllDefinedSymbolsWithDefinition,
        ReplaceAllSymbolsWithDefinitionsOrUndefined,
        ReplaceDefinedFunctionsWithDefinitions,
        DoNotReplaceAnySymbol,
    }
}

setting! {
    /// Layout of printed floating-point numbers.
    PrintFloatMode { #[default] Decimal, Scientific, Engineering }
}

/// Significant digits printed by default.
pub const DEFAULT_SIGNIFICANT_DIGITS: usize = 10;
/// Most significant digits a float can be printed with.
pub const MAX_SIGNIFICANT_DIGITS: usize = 14;

impl AngleUnit {
    /// Measure of a half turn (π radians) in this unit, as an integer when exact.
    pub fn half_turn_degrees(self) -> Option<u32> {
        match self {
            AngleUnit::Radian => None,
            AngleUnit::Degree => Some(180),
            AngleUnit::Gradian => Some(200),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kebab_case_names() {
        assert_eq!(AngleUnit::from_str("degree").unwrap(), AngleUnit::Degree);
        assert_eq!(ComplexFormat::Cartesian.to_string(), "cartesian");
        assert_eq!(
            SymbolicComputation::from_str("do-not-replace-any-symbol").unwrap(),
            SymbolicComputation::DoNotReplaceAnySymbol
        );
        assert_eq!(Target::default(), Target::User);
    }
}
