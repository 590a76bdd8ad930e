//! Symbol contexts: where reduction and approximation look up user definitions.
//!
//! A [`Context`] maps names to either a value (`x` defined by `3→x`) or a one-parameter
//! function (`f(t)` defined by `t^2→f(t)`). Reduction replaces defined symbols according to
//! its [`SymbolicComputation`](crate::settings::SymbolicComputation) policy; approximation
//! always evaluates them.
//!
//! ```rust
//! use hycas::{Pool, context::{Context, VariableContext}};
//! let pool = Pool::new();
//! let mut context = VariableContext::new();
//! context.store(&pool.parse("t+1→f(t)").unwrap()).unwrap();
//! let definition = context.function_definition("f").unwrap();
//! assert_eq!(definition.parameter, "t");
//! assert_eq!(definition.body.to_string(), "t+1");
//! ```

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    expr::{
        Expression,
        variant::{ExprType, is_reserved_name},
    },
    pool::PoolError,
};

/// Body of a user function together with its parameter name.
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub parameter: String,
    pub body: Expression,
}

#[derive(Debug, Clone)]
pub enum Definition {
    Value(Expression),
    Function(FunctionDefinition),
}

impl Definition {
    /// Expression the definition expands to.
    pub fn expression(&self) -> &Expression {
        match self {
            Definition::Value(value) => value,
            Definition::Function(function) => &function.body,
        }
    }
}

pub trait Context {
    fn definition(&self, name: &str) -> Option<Definition>;

    fn symbol_definition(&self, name: &str) -> Option<Expression> {
        match self.definition(name)? {
            Definition::Value(value) => Some(value),
            Definition::Function(_) => None,
        }
    }

    fn function_definition(&self, name: &str) -> Option<FunctionDefinition> {
        match self.definition(name)? {
            Definition::Function(function) => Some(function),
            Definition::Value(_) => None,
        }
    }
}

/// Context without any definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl Context for EmptyContext {
    fn definition(&self, _name: &str) -> Option<Definition> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("expected a store expression, found {0:?}")]
    NotAStore(ExprType),
    #[error("`{0}` cannot be assigned")]
    InvalidTarget(String),
    #[error(transparent)]
    Allocation(#[from] PoolError),
}

/// Name to definition store, as kept by a calculator session.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    definitions: HashMap<String, Definition>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the assignment carried by a Store node (`value→x` or `body→f(t)`).
    ///
    /// Returns the name that was defined.
    pub fn store(&mut self, store: &Expression) -> Result<String, StoreError> {
        if store.kind() != ExprType::Store {
            return Err(StoreError::NotAStore(store.kind()));
        }
        let (Some(value), Some(target)) = (store.child(0), store.child(1)) else {
            return Err(StoreError::NotAStore(store.kind()));
        };
        let name = target.name().unwrap_or_default();
        if name.is_empty() || is_reserved_name(&name) {
            return Err(StoreError::InvalidTarget(name));
        }
        match target.kind() {
            ExprType::Symbol => self.set_value(&name, &value)?,
            ExprType::Function => {
                let parameter = target
                    .child(0)
                    .filter(|parameter| parameter.kind() == ExprType::Symbol)
                    .and_then(|parameter| parameter.name())
                    .ok_or_else(|| StoreError::InvalidTarget(name.clone()))?;
                self.set_function(&name, parameter, &value)?;
            }
            _ => return Err(StoreError::InvalidTarget(name)),
        }
        Ok(name)
    }

    /// Define `name` as `value`. The value is copied out of whatever tree holds it.
    pub fn set_value(&mut self, name: &str, value: &Expression) -> Result<(), StoreError> {
        let value = value.deep_clone()?;
        self.definitions.insert(name.to_owned(), Definition::Value(value));
        Ok(())
    }

    pub fn set_function(
        &mut self,
        name: &str,
        parameter: impl Into<String>,
        body: &Expression,
    ) -> Result<(), StoreError> {
        let body = body.deep_clone()?;
        let function = FunctionDefinition { parameter: parameter.into(), body };
        self.definitions.insert(name.to_owned(), Definition::Function(function));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Definition> {
        self.definitions.remove(name)
    }

    pub fn clear(&mut self) {
        self.definitions.clear();
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

impl Context for VariableContext {
    fn definition(&self, name: &str) -> Option<Definition> {
        self.definitions.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pool;

    #[test]
    fn values_and_functions() {
        let pool = Pool::with_capacity(8192);
        let mut context = VariableContext::new();
        assert_eq!(context.store(&pool.parse("3→x").unwrap()).unwrap(), "x");
        assert_eq!(context.symbol_definition("x").unwrap().to_string(), "3");
        assert!(context.function_definition("x").is_none());

        context.store(&pool.parse("x^2→g(x)").unwrap()).unwrap();
        let g = context.function_definition("g").unwrap();
        assert_eq!(g.parameter, "x");
        assert!(context.symbol_definition("g").is_none());

        assert!(context.remove("x").is_some());
        assert!(context.symbol_definition("x").is_none());
        context.clear();
        assert!(context.is_empty());
    }

    #[test]
    fn only_store_nodes_are_accepted() {
        let pool = Pool::with_capacity(8192);
        let mut context = VariableContext::new();
        let error = context.store(&pool.parse("1+2").unwrap()).unwrap_err();
        assert_eq!(error, StoreError::NotAStore(ExprType::Addition));
    }

    #[test]
    fn stored_values_outlive_their_store_node() {
        let pool = Pool::with_capacity(8192);
        let mut context = VariableContext::new();
        let store = pool.parse("1+2→y").unwrap();
        context.store(&store).unwrap();
        drop(store);
        assert_eq!(context.symbol_definition("y").unwrap().to_string(), "1+2");
    }
}
