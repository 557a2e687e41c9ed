//! Capability metadata published by every module.
//!
//! A [`ModuleCapability`] describes one named action a module can perform,
//! together with its declared parameters. The set of capabilities a module
//! publishes is the sole authority for what the daemon's command validator
//! permits; it is metadata only and never executable. Parameter declarations
//! exist for capability discovery and documentation — the validator does not
//! type-check individual values against them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a capability parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// UTF-8 string value.
    String,
    /// Integral number.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Nested JSON object.
    Object,
    /// JSON array.
    List,
}

impl ParameterKind {
    /// Returns the canonical wire string for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityParameter {
    name: String,
    #[serde(rename = "type")]
    kind: ParameterKind,
    description: String,
    #[serde(default)]
    required: bool,
}

impl CapabilityParameter {
    /// Creates an optional parameter declaration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
        }
    }

    /// Marks the parameter as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns the parameter name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the declared parameter type.
    #[must_use]
    pub const fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Returns the human-readable description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns whether the parameter is required.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }
}

/// One named action a module declares it can perform.
///
/// # Example
///
/// ```
/// use rootd_protocol::{CapabilityParameter, ModuleCapability, ParameterKind};
///
/// let capability = ModuleCapability::new("get_zone", "Get zone configuration")
///     .with_parameter(
///         CapabilityParameter::new("zone", ParameterKind::String, "Zone name").required(),
///     );
/// assert_eq!(capability.name(), "get_zone");
/// assert_eq!(capability.parameters().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCapability {
    name: String,
    description: String,
    #[serde(default)]
    parameters: Vec<CapabilityParameter>,
}

impl ModuleCapability {
    /// Creates a parameterless capability.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter declaration.
    #[must_use]
    pub fn with_parameter(mut self, parameter: CapabilityParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Returns the action name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the action description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the declared parameters.
    #[must_use]
    pub fn parameters(&self) -> &[CapabilityParameter] {
        &self.parameters
    }
}

/// A module's full self-description.
///
/// Assembled from the module's live capability list on every request rather
/// than cached, so the published view always matches what the validator
/// consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    name: String,
    version: String,
    description: String,
    capabilities: Vec<ModuleCapability>,
}

impl ModuleInfo {
    /// Creates a module description from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        capabilities: Vec<ModuleCapability>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            capabilities,
        }
    }

    /// Returns the module name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the module version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the module description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the declared capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[ModuleCapability] {
        &self.capabilities
    }
}
