use crate::{
    error::RegistryError,
    registry::{FunctionCategory, FunctionRegistry, FunctionSignature},
};
use serde::Deserialize;
use tracing::debug;

/// An entry of the function library configuration.
///
/// The arity of the function is derived from its parameters: every required parameter raises the
/// minimum and every parameter raises the maximum, unless the function is `variadic`.
#[derive(Clone, Debug, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub syntax: Option<String>,
    pub category: FunctionCategory,
    #[serde(default)]
    pub params: Vec<ParameterDefinition>,
    #[serde(default)]
    pub variadic: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl FunctionDefinition {
    pub fn to_signature(&self) -> Result<FunctionSignature, RegistryError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let min_args = self.params.iter().filter(|param| param.required).count();
        let max_args = if self.variadic {
            None
        } else {
            Some(self.params.len())
        };
        let mut signature = FunctionSignature::new(name, min_args, max_args, self.category)?;
        if let Some(description) = &self.description {
            signature = signature.with_description(description);
        }
        if let Some(syntax) = &self.syntax {
            signature = signature.with_syntax(syntax);
        }
        Ok(signature)
    }
}

impl FunctionRegistry {
    /// Build a registry from the JSON function library configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rule_expression::FunctionRegistry;
    ///
    /// let registry = FunctionRegistry::from_catalog_json(r#"[
    ///     {
    ///         "name": "ROUND",
    ///         "category": "Math",
    ///         "params": [
    ///             { "name": "value", "type": "number", "required": true },
    ///             { "name": "decimals", "type": "number", "required": false }
    ///         ]
    ///     }
    /// ]"#).unwrap();
    ///
    /// let round = registry.lookup("round").unwrap();
    /// assert_eq!(1, round.min_args());
    /// assert_eq!(Some(2), round.max_args());
    /// ```
    pub fn from_catalog_json(json: &str) -> Result<Self, RegistryError> {
        let definitions: Vec<FunctionDefinition> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        registry.extend_from_definitions(&definitions)?;
        Ok(registry)
    }

    /// Register every definition, stopping at the first invalid one.
    pub fn extend_from_definitions(
        &mut self,
        definitions: &[FunctionDefinition],
    ) -> Result<(), RegistryError> {
        for definition in definitions {
            self.register(definition.to_signature()?);
        }
        debug!(
            loaded = definitions.len(),
            total = self.len(),
            "loaded function catalog"
        );
        Ok(())
    }

    /// The function library shipped with the rule builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rule_expression::FunctionRegistry;
    ///
    /// let registry = FunctionRegistry::compliance();
    /// assert!(registry.contains("EXPOSURE"));
    /// assert!(registry.contains("nav"));
    /// ```
    pub fn compliance() -> Self {
        use FunctionCategory::*;

        let ranged = |name: &str, min: usize, max: usize, category, syntax: &str, description: &str| {
            FunctionSignature {
                name: name.to_owned(),
                min_args: min,
                max_args: Some(max),
                category,
                description: Some(description.to_owned()),
                syntax: Some(syntax.to_owned()),
            }
        };

        Self::with_signatures([
            ranged("SUM", 1, 1, Math, "SUM(values)", "Sum all values in a set or column"),
            ranged(
                "AVERAGE",
                1,
                1,
                Math,
                "AVERAGE(values)",
                "Calculate the average of a set of values",
            ),
            ranged("COUNT", 1, 1, Math, "COUNT(items)", "Count the number of items in a set"),
            ranged("MAX", 1, 1, Math, "MAX(values)", "Find the maximum value in a set"),
            ranged("MIN", 1, 1, Math, "MIN(values)", "Find the minimum value in a set"),
            ranged(
                "ROUND",
                1,
                2,
                Math,
                "ROUND(value, decimals)",
                "Round a number to specified decimal places",
            ),
            ranged("ABS", 1, 1, Math, "ABS(value)", "Return the absolute value"),
            ranged(
                "EXPOSURE",
                0,
                3,
                Exposure,
                "EXPOSURE(sector='Tech')",
                "Calculate exposure for a specific sector, issuer, or category",
            ),
            ranged(
                "NAV",
                0,
                0,
                Position,
                "NAV()",
                "Returns the Net Asset Value of the portfolio",
            ),
            ranged(
                "POSITION_MV",
                0,
                1,
                Position,
                "POSITION_MV(filter=rating<'BBB')",
                "Returns market value of positions",
            ),
            ranged(
                "TRADES",
                0,
                2,
                Trade,
                "TRADES(window='1D', filter=duplicate=true)",
                "Access trade data within a time window",
            ),
            ranged(
                "VaR",
                1,
                2,
                Risk,
                "VaR(entity='Fund')",
                "Calculate Value at Risk for Fund or Benchmark",
            ),
            ranged(
                "ExposureByIssuer",
                1,
                1,
                Exposure,
                "ExposureByIssuer['Tesla']",
                "Get exposure for a specific issuer",
            ),
            ranged(
                "UnderlyingFundExposure",
                1,
                1,
                Exposure,
                "UnderlyingFundExposure['Asia']",
                "Calculate exposure to underlying fund by region",
            ),
            ranged(
                "IlliquidAssets",
                0,
                0,
                Position,
                "IlliquidAssets",
                "Total value of illiquid assets",
            ),
            ranged(
                "ERISACountAssets",
                0,
                0,
                Position,
                "ERISACountAssets",
                "Assets counted under ERISA regulations",
            ),
            ranged(
                "PlanAssets",
                0,
                0,
                Position,
                "PlanAssets",
                "Total plan assets for ERISA calculations",
            ),
            ranged(
                "CUSTOM_VALIDATION",
                1,
                1,
                UserDefined,
                "CUSTOM_VALIDATION(param)",
                "User-defined validation function",
            ),
        ])
    }
}
