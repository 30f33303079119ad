//! Chunk-based request templating.
//!
//! A [`Template`] is an ordered sequence of [`TemplateChunk`]s: [`Literal`]
//! text passed through verbatim and [`Expression`]s substituted from
//! call-time [`Bindings`]. Templates are immutable once parsed; resolution
//! returns new text and never mutates the shared instance, so one compiled
//! template can serve concurrent calls.

mod encoding;

use std::collections::BTreeMap;

use percent_encoding::AsciiSet;

use crate::error::TemplateError;
pub(crate) use encoding::{encode_literal, encode_value, pct_decode, QUERY};

/// Where a template's output lands, which decides its encoding rules.
///
/// Path and query literals are normalized into the safe character class at
/// parse time and expanded values are percent-encoded; header and body
/// templates carry their text raw. Path and body expressions are required;
/// query and header expressions drop their surrounding pair when unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// A URI path (segment-encoded values, required expressions).
    Path,
    /// One query-parameter value.
    Query,
    /// One header value.
    Header,
    /// A request body.
    Body,
}

impl TemplateKind {
    fn normalizes_literals(self) -> bool {
        matches!(self, Self::Path | Self::Query)
    }

    fn value_set(self) -> Option<&'static AsciiSet> {
        match self {
            Self::Path => Some(encoding::PATH_SEGMENT),
            Self::Query => Some(encoding::QUERY),
            Self::Header | Self::Body => None,
        }
    }

    fn requires_bindings(self) -> bool {
        matches!(self, Self::Path | Self::Body)
    }
}

/// Verbatim template text.
///
/// The value is never empty; for path and query templates it is normalized
/// into the safe character class before construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    value: String,
}

impl Literal {
    /// Creates a literal chunk.
    ///
    /// ## Errors
    ///
    /// Returns [`TemplateError::EmptyLiteral`] for an empty value.
    pub fn new(value: impl Into<String>) -> Result<Self, TemplateError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TemplateError::EmptyLiteral);
        }
        Ok(Self { value })
    }

    /// The literal text.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A substitution point holding one or more variable names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    names: Vec<String>,
    required: bool,
}

impl Expression {
    /// The bound variable names, in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether resolution fails when no name has a binding.
    pub fn required(&self) -> bool {
        self.required
    }
}

/// One element of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateChunk {
    /// Verbatim text.
    Literal(Literal),
    /// A substitution point.
    Expression(Expression),
}

/// Call-time variable bindings for template resolution.
///
/// A binding may carry several values (joined or exploded downstream) and
/// may be flagged pre-encoded, in which case substitution skips
/// percent-encoding.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: BTreeMap<String, BoundValue>,
}

#[derive(Debug, Clone)]
struct BoundValue {
    values: Vec<String>,
    encoded: bool,
}

impl Bindings {
    /// An empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a single value that still needs percent-encoding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert_values(name, vec![value.into()], false);
    }

    /// Binds a single pre-encoded value; substitution passes it through.
    pub fn insert_encoded(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert_values(name, vec![value.into()], true);
    }

    /// Binds one or more values.
    pub fn insert_values(&mut self, name: impl Into<String>, values: Vec<String>, encoded: bool) {
        self.values.insert(name.into(), BoundValue { values, encoded });
    }

    fn get(&self, name: &str) -> Option<&BoundValue> {
        self.values.get(name)
    }

    /// The raw values bound under `name`, if any.
    pub(crate) fn values(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(|bound| bound.values.as_slice())
    }
}

/// An ordered sequence of literal and expression chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    kind: TemplateKind,
    chunks: Vec<TemplateChunk>,
}

impl Template {
    /// Parses template text into chunks.
    ///
    /// `{name}` (or `{a,b}` for several names) marks an expression; an
    /// unmatched `{` is treated as literal text. Path and query literal
    /// runs are normalized into the safe character class.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use pretext::template::{Bindings, Template, TemplateKind};
    ///
    /// let template = Template::parse("/repos/{owner}/{repo}/contributors", TemplateKind::Path)?;
    /// let mut bindings = Bindings::new();
    /// bindings.insert("owner", "octocat");
    /// bindings.insert("repo", "Hello-World");
    /// assert_eq!(
    ///     template.resolve(&bindings)?.unwrap(),
    ///     "/repos/octocat/Hello-World/contributors"
    /// );
    /// # Ok::<(), pretext::TemplateError>(())
    /// ```
    ///
    /// ## Errors
    ///
    /// Returns [`TemplateError::MalformedExpression`] for an empty
    /// expression or an invalid variable name.
    pub fn parse(input: &str, kind: TemplateKind) -> Result<Self, TemplateError> {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut rest = input;

        while let Some(open) = rest.find('{') {
            let (before, from_open) = rest.split_at(open);
            literal.push_str(before);
            match from_open.find('}') {
                Some(close) => {
                    flush_literal(&mut chunks, &mut literal, kind)?;
                    let inner = &from_open[1..close];
                    chunks.push(TemplateChunk::Expression(parse_expression(inner, kind)?));
                    rest = &from_open[close + 1..];
                }
                None => {
                    // unmatched brace: the remainder is literal text
                    literal.push_str(from_open);
                    rest = "";
                }
            }
        }
        literal.push_str(rest);
        flush_literal(&mut chunks, &mut literal, kind)?;

        Ok(Self { kind, chunks })
    }

    /// An empty template, resolving to the empty string.
    pub(crate) fn empty(kind: TemplateKind) -> Self {
        Self { kind, chunks: Vec::new() }
    }

    /// A template of one literal chunk, bypassing brace interpretation.
    ///
    /// Used for values that are already resolved (interceptor-added headers,
    /// query-map entries). An empty value yields the empty template.
    pub(crate) fn from_literal(value: &str, kind: TemplateKind) -> Self {
        if value.is_empty() {
            return Self::empty(kind);
        }
        let value = if kind.normalizes_literals() {
            encoding::encode_literal(value)
        } else {
            value.to_string()
        };
        Self {
            kind,
            chunks: vec![TemplateChunk::Literal(Literal { value })],
        }
    }

    /// The chunks, in order.
    pub fn chunks(&self) -> &[TemplateChunk] {
        &self.chunks
    }

    /// All expression variable names, in order of appearance.
    pub fn variables(&self) -> Vec<&str> {
        self.chunks
            .iter()
            .filter_map(|chunk| match chunk {
                TemplateChunk::Expression(expr) => Some(expr.names.iter().map(String::as_str)),
                TemplateChunk::Literal(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Whether any expression binds `name`.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables().contains(&name)
    }

    /// Resolves the template against the given bindings.
    ///
    /// Returns `Ok(None)` when a droppable expression had no binding (the
    /// caller omits the surrounding pair).
    ///
    /// ## Errors
    ///
    /// Returns [`TemplateError::Unresolved`] when a required expression has
    /// no matching binding.
    pub fn resolve(&self, bindings: &Bindings) -> Result<Option<String>, TemplateError> {
        let mut out = String::new();
        for chunk in &self.chunks {
            match chunk {
                TemplateChunk::Literal(literal) => out.push_str(literal.value()),
                TemplateChunk::Expression(expr) => {
                    match self.expand(expr, bindings)? {
                        Some(values) => out.push_str(&values.join(",")),
                        None => return Ok(None),
                    }
                }
            }
        }
        Ok(Some(out))
    }

    /// Resolves to individual values instead of joined text.
    ///
    /// A template that is a single expression yields each bound value
    /// separately, which is what repeated-parameter query expansion needs;
    /// anything else degrades to the joined form.
    pub(crate) fn resolve_values(
        &self,
        bindings: &Bindings,
    ) -> Result<Option<Vec<String>>, TemplateError> {
        if let [TemplateChunk::Expression(expr)] = self.chunks.as_slice() {
            return self.expand(expr, bindings);
        }
        Ok(self.resolve(bindings)?.map(|text| vec![text]))
    }

    fn expand(
        &self,
        expr: &Expression,
        bindings: &Bindings,
    ) -> Result<Option<Vec<String>>, TemplateError> {
        let mut values = Vec::new();
        let mut any_bound = false;
        for name in &expr.names {
            let Some(bound) = bindings.get(name) else { continue };
            any_bound = true;
            for value in &bound.values {
                match self.kind.value_set() {
                    Some(set) if !bound.encoded => values.push(encode_value(value, set)),
                    _ => values.push(value.clone()),
                }
            }
        }
        if !any_bound {
            if expr.required {
                return Err(TemplateError::Unresolved {
                    name: expr.names[0].clone(),
                });
            }
            return Ok(None);
        }
        Ok(Some(values))
    }
}

fn flush_literal(
    chunks: &mut Vec<TemplateChunk>,
    literal: &mut String,
    kind: TemplateKind,
) -> Result<(), TemplateError> {
    if literal.is_empty() {
        return Ok(());
    }
    let text = if kind.normalizes_literals() {
        encoding::encode_literal(literal)
    } else {
        literal.clone()
    };
    chunks.push(TemplateChunk::Literal(Literal::new(text)?));
    literal.clear();
    Ok(())
}

fn parse_expression(inner: &str, kind: TemplateKind) -> Result<Expression, TemplateError> {
    let names: Vec<String> = inner
        .split(',')
        .map(|name| name.trim().to_string())
        .collect();
    if names.iter().any(|name| !is_valid_name(name)) {
        return Err(TemplateError::MalformedExpression {
            expression: format!("{{{inner}}}"),
        });
    }
    Ok(Expression {
        names,
        required: kind.requires_bindings(),
    })
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
