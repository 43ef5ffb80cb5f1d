//! Function registry.
//!
//! The registry is built before any turn runs and then shared behind an
//! `Arc`; registration needs `&mut self`, so nothing can change it while
//! turns are executing.

use crate::error::RegistryError;
use crate::function::FunctionDescriptor;
use crate::schema::ArgumentSchema;
use deferral_conversation::FunctionDeclaration;
use rootcause::Report;
use std::collections::HashMap;

/// A registered function with its compiled argument schema.
#[derive(Debug)]
pub struct RegisteredFunction {
    descriptor: FunctionDescriptor,
    schema: ArgumentSchema,
}

impl RegisteredFunction {
    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Returns the compiled argument schema.
    #[must_use]
    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }
}

/// Lookup table of callable functions, in registration order.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: Vec<RegisteredFunction>,
    by_name: HashMap<String, usize>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken, or
    /// [`RegistryError::InvalidSchema`] if its parameter schema does not
    /// compile.
    pub fn register(&mut self, descriptor: FunctionDescriptor) -> Result<(), Report<RegistryError>> {
        if self.by_name.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateName {
                name: descriptor.name,
            }
            .into());
        }

        let schema = ArgumentSchema::compile(&descriptor.name, descriptor.parameters.clone())?;
        self.by_name
            .insert(descriptor.name.clone(), self.functions.len());
        self.functions.push(RegisteredFunction { descriptor, schema });
        Ok(())
    }

    /// Registers a function, builder style.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn with(mut self, descriptor: FunctionDescriptor) -> Result<Self, Report<RegistryError>> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Returns the function named `name`, if registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.by_name.get(name).map(|&index| &self.functions[index])
    }

    /// Looks up a function by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownFunction`] if it is not registered.
    pub fn lookup(&self, name: &str) -> Result<&RegisteredFunction, Report<RegistryError>> {
        self.get(name).ok_or_else(|| {
            RegistryError::UnknownFunction {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Returns the declarations passed to the model, in registration order.
    #[must_use]
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.functions
            .iter()
            .map(|f| f.descriptor.declaration())
            .collect()
    }

    /// Returns the registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.descriptor.name.as_str())
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
