use crate::error::RegistryError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
};
use tracing::debug;

/// The group a function belongs to in the function library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunctionCategory {
    Math,
    Exposure,
    Position,
    Trade,
    Risk,
    #[serde(rename = "User Defined", alias = "UserDefined")]
    UserDefined,
}

impl Display for FunctionCategory {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Math => "Math",
            Self::Exposure => "Exposure",
            Self::Position => "Position",
            Self::Trade => "Trade",
            Self::Risk => "Risk",
            Self::UserDefined => "User Defined",
        };
        formatter.write_str(name)
    }
}

/// The call shape of a function usable inside rule expressions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FunctionSignature {
    pub(crate) name: String,
    pub(crate) min_args: usize,
    pub(crate) max_args: Option<usize>,
    pub(crate) category: FunctionCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) syntax: Option<String>,
}

impl FunctionSignature {
    /// Create a signature accepting between `min_args` and `max_args` arguments.
    ///
    /// A `max_args` of `None` means the function accepts any number of arguments past
    /// `min_args`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rule_expression::{FunctionCategory, FunctionSignature};
    ///
    /// assert!(FunctionSignature::new("ROUND", 1, Some(2), FunctionCategory::Math).is_ok());
    /// assert!(FunctionSignature::new("ROUND", 2, Some(1), FunctionCategory::Math).is_err());
    /// ```
    pub fn new(
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        category: FunctionCategory,
    ) -> Result<Self, RegistryError> {
        if let Some(max) = max_args {
            if min_args > max {
                return Err(RegistryError::InvalidArity {
                    name: name.to_owned(),
                    min: min_args,
                    max,
                });
            }
        }

        Ok(Self {
            name: name.to_owned(),
            min_args,
            max_args,
            category,
            description: None,
            syntax: None,
        })
    }

    /// Create a signature accepting exactly `arity` arguments.
    pub fn exact(name: &str, arity: usize, category: FunctionCategory) -> Self {
        Self {
            name: name.to_owned(),
            min_args: arity,
            max_args: Some(arity),
            category,
            description: None,
            syntax: None,
        }
    }

    /// Create a signature accepting at least `min_args` arguments.
    pub fn variadic(name: &str, min_args: usize, category: FunctionCategory) -> Self {
        Self {
            name: name.to_owned(),
            min_args,
            max_args: None,
            category,
            description: None,
            syntax: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// A usage hint such as `ROUND(value, 2)`.
    pub fn with_syntax(mut self, syntax: &str) -> Self {
        self.syntax = Some(syntax.to_owned());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn min_args(&self) -> usize {
        self.min_args
    }

    #[inline]
    pub fn max_args(&self) -> Option<usize> {
        self.max_args
    }

    #[inline]
    pub fn category(&self) -> FunctionCategory {
        self.category
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn syntax(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    /// Whether a call with `count` arguments fits this signature.
    #[inline]
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// A human-readable description of the accepted argument counts.
    pub fn arity(&self) -> String {
        describe_arity(self.min_args, self.max_args)
    }
}

pub(crate) fn describe_arity(min_args: usize, max_args: Option<usize>) -> String {
    match (min_args, max_args) {
        (0, Some(0)) => "no arguments".to_owned(),
        (min, Some(max)) if min == max => format!("exactly {}", plural(min)),
        (0, Some(max)) => format!("at most {}", plural(max)),
        (min, Some(max)) => format!("between {min} and {max} arguments"),
        (0, None) => "any number of arguments".to_owned(),
        (min, None) => format!("at least {}", plural(min)),
    }
}

fn plural(count: usize) -> String {
    if count == 1 {
        "1 argument".to_owned()
    } else {
        format!("{count} arguments")
    }
}

/// A case-insensitive catalog of the functions that rule expressions may call.
///
/// The registry is only read during validation, so a single instance can be shared by any number
/// of concurrent validations.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    by_names: HashMap<String, FunctionSignature>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from signatures, the later ones replacing earlier ones with the same name.
    pub fn with_signatures<I>(signatures: I) -> Self
    where
        I: IntoIterator<Item = FunctionSignature>,
    {
        let mut registry = Self::new();
        for signature in signatures {
            registry.register(signature);
        }
        registry
    }

    /// Register a signature, returning the one it replaced if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rule_expression::{FunctionCategory, FunctionRegistry, FunctionSignature};
    ///
    /// let mut registry = FunctionRegistry::new();
    /// registry.register(FunctionSignature::exact("NAV", 0, FunctionCategory::Position));
    /// let replaced = registry.register(FunctionSignature::exact("nav", 1, FunctionCategory::Position));
    ///
    /// assert!(replaced.is_some());
    /// assert_eq!(Some(1), registry.lookup("Nav").map(|signature| signature.min_args()));
    /// ```
    pub fn register(&mut self, signature: FunctionSignature) -> Option<FunctionSignature> {
        let key = signature.name.to_ascii_uppercase();
        let replaced = self.by_names.insert(key, signature);
        if let Some(previous) = &replaced {
            debug!(name = previous.name(), "replacing existing function signature");
        }
        replaced
    }

    /// Remove a signature, returning it if it was registered.
    pub fn remove(&mut self, name: &str) -> Option<FunctionSignature> {
        let removed = self.by_names.remove(&name.to_ascii_uppercase());
        if let Some(signature) = &removed {
            debug!(name = signature.name(), "removed function signature");
        }
        removed
    }

    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&FunctionSignature> {
        self.by_names.get(&name.to_ascii_uppercase())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_names.is_empty()
    }

    /// The registered signatures ordered by category, then by name.
    pub fn functions(&self) -> Vec<&FunctionSignature> {
        self.by_names
            .values()
            .sorted_by_key(|signature| (signature.category, signature.name.to_ascii_uppercase()))
            .collect_vec()
    }
}
