//! Replacing user symbols and functions by their definitions.

use std::collections::HashSet;

use log::debug;

use super::{ReductionContext, ReductionResult, calculus::substitute, deep_reduce};
use crate::{
    context::{Context, Definition},
    expr::{Expression, variant::ExprType},
    pool::Payload,
    settings::SymbolicComputation,
};

/// Names of the symbols and user functions a definition refers to.
fn referenced_names(definition: &Definition) -> Vec<String> {
    let parameter = match definition {
        Definition::Function(function) => Some(function.parameter.as_str()),
        Definition::Value(_) => None,
    };
    let mut names = Vec::new();
    definition.expression().recursively_matches(|kind, payload| {
        if let Payload::Name(name) = payload {
            let is_parameter = kind == ExprType::Symbol && Some(name.as_str()) == parameter;
            if !is_parameter {
                names.push(name.clone());
            }
        }
        false
    });
    names
}

/// Whether expanding `name` eventually leads back to `name`.
pub fn is_circular(context: &dyn Context, name: &str) -> bool {
    let mut visited = HashSet::new();
    let mut pending = vec![name.to_owned()];
    while let Some(current) = pending.pop() {
        let Some(definition) = context.definition(&current) else {
            continue;
        };
        for referenced in referenced_names(&definition) {
            if referenced == name {
                return true;
            }
            if visited.insert(referenced.clone()) {
                pending.push(referenced);
            }
        }
    }
    false
}

pub(super) fn reduce_symbol(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let Some(name) = e.name() else {
        return Ok(e);
    };
    if ctx.is_bound(&name) {
        return Ok(e);
    }
    let pool = e.pool().clone();
    match ctx.symbolic_computation {
        SymbolicComputation::DoNotReplaceAnySymbol | SymbolicComputation::ReplaceDefinedFunctionsWithDefinitions => {
            return Ok(e);
        }
        SymbolicComputation::ReplaceAllDefinedSymbolsWithDefinition
        | SymbolicComputation::ReplaceAllSymbolsWithDefinitionsOrUndefined => {}
    }

    match ctx.context().symbol_definition(&name) {
        Some(_) if is_circular(ctx.context(), &name) => {
            debug!("`{name}` is defined in terms of itself");
            Ok(pool.undefined()?)
        }
        Some(definition) => {
            let value = pool.import(&definition)?;
            deep_reduce(value, ctx)
        }
        None if ctx.symbolic_computation == SymbolicComputation::ReplaceAllSymbolsWithDefinitionsOrUndefined => {
            Ok(pool.undefined()?)
        }
        None => Ok(e),
    }
}

pub(super) fn reduce_function(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let Some(name) = e.name() else {
        return Ok(e);
    };
    let pool = e.pool().clone();
    if ctx.symbolic_computation == SymbolicComputation::DoNotReplaceAnySymbol {
        return Ok(e);
    }

    match ctx.context().function_definition(&name) {
        Some(_) if is_circular(ctx.context(), &name) => {
            debug!("`{name}` is defined in terms of itself");
            Ok(pool.undefined()?)
        }
        Some(function) => {
            let Some([argument]) = e.into_operands::<1>() else {
                return Ok(pool.undefined()?);
            };
            let body = pool.import(&function.body)?;
            let expanded = substitute(body, &function.parameter, &argument)?;
            deep_reduce(expanded, ctx)
        }
        None if ctx.symbolic_computation == SymbolicComputation::ReplaceAllSymbolsWithDefinitionsOrUndefined => {
            Ok(pool.undefined()?)
        }
        None => Ok(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pool, context::VariableContext};

    #[test]
    fn detects_cycles_through_other_names() {
        let pool = Pool::with_capacity(16384);
        let mut context = VariableContext::new();
        context.store(&pool.parse("b+1→a").unwrap()).unwrap();
        context.store(&pool.parse("2a→b").unwrap()).unwrap();
        context.store(&pool.parse("3→c").unwrap()).unwrap();
        assert!(is_circular(&context, "a"));
        assert!(is_circular(&context, "b"));
        assert!(!is_circular(&context, "c"));
    }

    #[test]
    fn function_parameter_is_not_a_reference() {
        let pool = Pool::with_capacity(16384);
        let mut context = VariableContext::new();
        context.store(&pool.parse("2t→g(t)").unwrap()).unwrap();
        context.store(&pool.parse("g(3)→t").unwrap()).unwrap();
        assert!(!is_circular(&context, "t"));
        assert!(!is_circular(&context, "g"));
        context.store(&pool.parse("g(x)+1→g(x)").unwrap()).unwrap();
        assert!(is_circular(&context, "g"));
    }
}
