//! The declarative interface definition consumed by the contract compiler.
//!
//! Marker syntax parsing is out of scope: definitions arrive with their
//! markers already parsed into the enum values below. Builders exist so a
//! definition reads roughly like the interface it describes:
//!
//! ```rust
//! use pretext::contract::{InterfaceDefinition, MethodDefinition, MethodMarker, ParamDefinition, ParamMarker};
//! use pretext::types::TypeRef;
//!
//! let github = InterfaceDefinition::new("GitHub").method(
//!     MethodDefinition::new("contributors", TypeRef::generic("Vec", vec![TypeRef::new("Contributor")]))
//!         .marker(MethodMarker::request_line("GET /repos/{owner}/{repo}/contributors"))
//!         .param(ParamDefinition::new("owner", TypeRef::new("String")).marker(ParamMarker::param()))
//!         .param(ParamDefinition::new("repo", TypeRef::new("String")).marker(ParamMarker::param())),
//! );
//! assert_eq!(github.methods().len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::request::CollectionFormat;
use crate::types::TypeRef;
use crate::value::ParamExpander;

/// A marker attached to the interface type itself.
#[derive(Debug, Clone)]
pub enum ClassMarker {
    /// Default headers for every method, as `"Name: value"` lines.
    Headers(Vec<String>),
}

/// Discriminant for class-marker registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClassMarkerKind {
    /// [`ClassMarker::Headers`].
    Headers,
}

impl ClassMarker {
    /// The registry key for this marker.
    pub fn kind(&self) -> ClassMarkerKind {
        match self {
            Self::Headers(_) => ClassMarkerKind::Headers,
        }
    }
}

/// A marker attached to a method.
#[derive(Debug, Clone)]
pub enum MethodMarker {
    /// `"<VERB> <path-template>"` plus resolution flags.
    RequestLine {
        /// The raw request line.
        value: String,
        /// Whether `%2F` in resolved path values becomes `/`.
        decode_slash: bool,
        /// Multi-value join style for query parameters.
        collection_format: CollectionFormat,
    },
    /// Body text; the presence of `{` switches to template mode.
    Body(String),
    /// Headers for this method, as `"Name: value"` lines.
    Headers(Vec<String>),
}

impl MethodMarker {
    /// A request line with the default flags (slashes decoded, exploded
    /// collections).
    pub fn request_line(value: impl Into<String>) -> Self {
        Self::RequestLine {
            value: value.into(),
            decode_slash: true,
            collection_format: CollectionFormat::default(),
        }
    }

    /// The registry key for this marker.
    pub fn kind(&self) -> MethodMarkerKind {
        match self {
            Self::RequestLine { .. } => MethodMarkerKind::RequestLine,
            Self::Body(_) => MethodMarkerKind::Body,
            Self::Headers(_) => MethodMarkerKind::Headers,
        }
    }
}

/// Discriminant for method-marker registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MethodMarkerKind {
    /// [`MethodMarker::RequestLine`].
    RequestLine,
    /// [`MethodMarker::Body`].
    Body,
    /// [`MethodMarker::Headers`].
    Headers,
}

/// A marker attached to a parameter.
#[derive(Clone)]
pub enum ParamMarker {
    /// Binds the parameter to a template variable.
    Param {
        /// Explicit variable name; the parameter's own name when absent.
        name: Option<String>,
        /// Custom value-formatting hook for this position.
        expander: Option<Arc<dyn ParamExpander>>,
    },
    /// Binds the parameter as the query map.
    QueryMap {
        /// Whether map values are already percent-encoded.
        encoded: bool,
    },
    /// Binds the parameter as the header map.
    HeaderMap,
}

impl ParamMarker {
    /// A named binding using the parameter's own name.
    pub fn param() -> Self {
        Self::Param {
            name: None,
            expander: None,
        }
    }

    /// A named binding with an explicit variable name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Param {
            name: Some(name.into()),
            expander: None,
        }
    }

    /// A named binding with a custom expander.
    pub fn expanded(name: impl Into<String>, expander: Arc<dyn ParamExpander>) -> Self {
        Self::Param {
            name: Some(name.into()),
            expander: Some(expander),
        }
    }

    /// The registry key for this marker.
    pub fn kind(&self) -> ParamMarkerKind {
        match self {
            Self::Param { .. } => ParamMarkerKind::Param,
            Self::QueryMap { .. } => ParamMarkerKind::QueryMap,
            Self::HeaderMap => ParamMarkerKind::HeaderMap,
        }
    }
}

impl fmt::Debug for ParamMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param { name, expander } => f
                .debug_struct("Param")
                .field("name", name)
                .field("expander", &expander.as_ref().map(|_| ".."))
                .finish(),
            Self::QueryMap { encoded } => {
                f.debug_struct("QueryMap").field("encoded", encoded).finish()
            }
            Self::HeaderMap => f.write_str("HeaderMap"),
        }
    }
}

/// Discriminant for parameter-marker registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamMarkerKind {
    /// [`ParamMarker::Param`].
    Param,
    /// [`ParamMarker::QueryMap`].
    QueryMap,
    /// [`ParamMarker::HeaderMap`].
    HeaderMap,
}

/// How a method is declared, which decides whether it is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodKind {
    /// A declared method, candidate for compilation.
    #[default]
    Declared,
    /// A method with a default implementation; skipped.
    Default,
    /// A static/associated method; skipped.
    Static,
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct ParamDefinition {
    name: String,
    ty: TypeRef,
    markers: Vec<ParamMarker>,
}

impl ParamDefinition {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            markers: Vec::new(),
        }
    }

    /// Attaches a marker.
    pub fn marker(mut self, marker: ParamMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// The declared parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared parameter type.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The attached markers.
    pub fn markers(&self) -> &[ParamMarker] {
        &self.markers
    }
}

/// One declared method.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    name: String,
    kind: MethodKind,
    return_type: TypeRef,
    params: Vec<ParamDefinition>,
    markers: Vec<MethodMarker>,
}

impl MethodDefinition {
    /// Creates a declared method.
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Declared,
            return_type,
            params: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Overrides the declaration kind.
    pub fn kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attaches a marker.
    pub fn marker(mut self, marker: MethodMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Appends a parameter.
    pub fn param(mut self, param: ParamDefinition) -> Self {
        self.params.push(param);
        self
    }

    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declaration kind.
    pub fn method_kind(&self) -> MethodKind {
        self.kind
    }

    /// The declared return type (unresolved).
    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    /// The declared parameters.
    pub fn params(&self) -> &[ParamDefinition] {
        &self.params
    }

    /// The attached markers.
    pub fn markers(&self) -> &[MethodMarker] {
        &self.markers
    }
}

/// A single-level extends clause: the parent definition plus the type
/// arguments instantiating its type parameters.
#[derive(Debug, Clone)]
pub struct ExtendsClause {
    interface: Box<InterfaceDefinition>,
    type_args: Vec<TypeRef>,
}

impl ExtendsClause {
    /// The extended interface.
    pub fn interface(&self) -> &InterfaceDefinition {
        &self.interface
    }

    /// The supplied type arguments.
    pub fn type_args(&self) -> &[TypeRef] {
        &self.type_args
    }
}

/// A declarative interface: the compiler's input.
#[derive(Debug, Clone)]
pub struct InterfaceDefinition {
    name: String,
    type_params: Vec<String>,
    extends: Vec<ExtendsClause>,
    markers: Vec<ClassMarker>,
    methods: Vec<MethodDefinition>,
}

impl InterfaceDefinition {
    /// Creates an empty interface definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            extends: Vec::new(),
            markers: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declares a type parameter. A target interface with any of these is
    /// rejected by the compiler; parents use them for generic methods.
    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// Adds an extends clause.
    pub fn extends(mut self, interface: InterfaceDefinition, type_args: Vec<TypeRef>) -> Self {
        self.extends.push(ExtendsClause {
            interface: Box::new(interface),
            type_args,
        });
        self
    }

    /// Attaches a class-level marker.
    pub fn marker(mut self, marker: ClassMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Appends a method.
    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// The interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type parameters.
    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    /// Extends clauses (at most one is valid).
    pub fn extends_clauses(&self) -> &[ExtendsClause] {
        &self.extends
    }

    /// Class-level markers.
    pub fn markers(&self) -> &[ClassMarker] {
        &self.markers
    }

    /// Declared methods.
    pub fn methods(&self) -> &[MethodDefinition] {
        &self.methods
    }
}
