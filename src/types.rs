//! Explicit type model for declarative interface definitions.
//!
//! Interface definitions describe their method signatures with [`TypeRef`]
//! values, and generic resolution across the single permitted level of
//! inheritance is a pure substitution over a [`TypeEnv`] - no runtime type
//! reflection is involved.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigurationError;

/// A named type with zero or more type arguments.
///
/// A bare name with no arguments doubles as a type variable: resolution
/// substitutes it when the environment binds that name.
///
/// ## Examples
///
/// ```rust
/// use pretext::types::TypeRef;
///
/// let contributors = TypeRef::generic("Stream", vec![TypeRef::new("Contributor")]);
/// assert_eq!(contributors.to_string(), "Stream<Contributor>");
/// assert!(contributors.stream_element().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    name: String,
    args: Vec<TypeRef>,
}

impl TypeRef {
    /// Creates a type reference with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Creates a parameterized type reference.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The unit type, used for methods that return nothing decodable.
    pub fn unit() -> Self {
        Self::new("()")
    }

    /// Outer type name, without arguments.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type arguments, possibly empty.
    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    /// Resolves this reference against a substitution environment.
    ///
    /// A bare name bound in the environment is replaced wholesale; otherwise
    /// the name is kept and the arguments are resolved recursively. Pure
    /// function: neither input is mutated.
    pub fn resolve(&self, env: &TypeEnv) -> TypeRef {
        if self.args.is_empty() {
            if let Some(bound) = env.lookup(&self.name) {
                return bound.clone();
            }
        }
        TypeRef {
            name: self.name.clone(),
            args: self.args.iter().map(|arg| arg.resolve(env)).collect(),
        }
    }

    /// Whether this is the unit type.
    pub fn is_unit(&self) -> bool {
        self.name == "()" && self.args.is_empty()
    }

    /// Whether this parameter type carries a per-call URL override.
    pub fn is_url(&self) -> bool {
        matches!(self.name.as_str(), "Url" | "Uri") && self.args.is_empty()
    }

    /// Whether this parameter type carries per-call request options.
    pub fn is_options(&self) -> bool {
        self.name == "Options" && self.args.is_empty()
    }

    /// Whether this return type asks for the raw response.
    pub fn is_response(&self) -> bool {
        self.name == "Response" && self.args.is_empty()
    }

    /// Whether this type is textual.
    pub fn is_textual(&self) -> bool {
        matches!(self.name.as_str(), "String" | "str") && self.args.is_empty()
    }

    /// Whether this type is map-shaped (a `*Map<K, V>` with two arguments).
    pub fn is_map(&self) -> bool {
        self.name.ends_with("Map") && self.args.len() == 2
    }

    /// Key type of a map-shaped reference.
    pub fn map_key(&self) -> Option<&TypeRef> {
        if self.is_map() {
            self.args.first()
        } else {
            None
        }
    }

    /// Element type when the outer shape is a lazy sequence (`Stream<T>`).
    pub fn stream_element(&self) -> Option<&TypeRef> {
        if self.name == "Stream" && self.args.len() == 1 {
            self.args.first()
        } else {
            None
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Substitution map from type-parameter name to concrete [`TypeRef`].
///
/// Built from an extends clause: the parent's declared type parameters are
/// zipped with the clause's type arguments.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    substitutions: BTreeMap<String, TypeRef>,
}

impl TypeEnv {
    /// An environment with no substitutions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zips declared type parameters with supplied arguments.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigurationError::TypeArgumentArity`] when the counts do
    /// not match.
    pub fn bind(
        interface: &str,
        params: &[String],
        args: &[TypeRef],
    ) -> Result<Self, ConfigurationError> {
        if params.len() != args.len() {
            return Err(ConfigurationError::TypeArgumentArity {
                interface: interface.to_string(),
                declared: params.len(),
                supplied: args.len(),
            });
        }
        Ok(Self {
            substitutions: params
                .iter()
                .cloned()
                .zip(args.iter().cloned())
                .collect(),
        })
    }

    /// Looks up the substitution for a type-parameter name.
    pub fn lookup(&self, name: &str) -> Option<&TypeRef> {
        self.substitutions.get(name)
    }
}
