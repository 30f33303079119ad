//! The contract compiler.
//!
//! [`Contract::parse_and_validate`] turns a declarative
//! [`InterfaceDefinition`] into an ordered, validated list of
//! [`MethodDescriptor`]s - a pure function of its input: the same
//! definition always compiles to the same descriptor list.
//!
//! Marker processing is registry-driven: [`DeclarativeContract`] maps each
//! marker kind to a handler function, and the compiler looks handlers up
//! generically. [`DeclarativeContract::standard`] registers the default
//! marker set; custom contracts register their own handlers.

mod definition;

use std::collections::{BTreeMap, BTreeSet};

pub use definition::{
    ClassMarker, ClassMarkerKind, ExtendsClause, InterfaceDefinition, MethodDefinition,
    MethodKind, MethodMarker, MethodMarkerKind, ParamDefinition, ParamMarker, ParamMarkerKind,
};

use crate::builder::config_key;
use crate::descriptor::{MethodDescriptor, MethodDescriptorBuilder};
use crate::error::ConfigurationError;
use crate::types::TypeEnv;

/// Compiles declarative interface definitions into method descriptors.
pub trait Contract: Send + Sync {
    /// Produces one descriptor per candidate method, in first-seen order.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigurationError`] for any shape violation; compilation
    /// is all-or-nothing.
    fn parse_and_validate(
        &self,
        target: &InterfaceDefinition,
    ) -> Result<Vec<MethodDescriptor>, ConfigurationError>;
}

/// Handler for one class-level marker occurrence.
pub type ClassMarkerHandler =
    Box<dyn Fn(&ClassMarker, &mut MethodDescriptorBuilder) -> Result<(), ConfigurationError> + Send + Sync>;

/// Handler for one method-level marker occurrence.
pub type MethodMarkerHandler =
    Box<dyn Fn(&MethodMarker, &mut MethodDescriptorBuilder) -> Result<(), ConfigurationError> + Send + Sync>;

/// Handler for one parameter marker occurrence. Receives the parameter's
/// position and definition alongside the descriptor under construction.
pub type ParamMarkerHandler = Box<
    dyn Fn(&ParamMarker, &mut MethodDescriptorBuilder, usize, &ParamDefinition) -> Result<(), ConfigurationError>
        + Send
        + Sync,
>;

/// A registry-driven contract.
///
/// Handlers are registered once at construction; a method none of whose
/// markers match any registered handler is marked ignored (non-HTTP) and
/// skips further validation.
pub struct DeclarativeContract {
    class_handlers: BTreeMap<ClassMarkerKind, ClassMarkerHandler>,
    method_handlers: BTreeMap<MethodMarkerKind, MethodMarkerHandler>,
    param_handlers: BTreeMap<ParamMarkerKind, ParamMarkerHandler>,
}

impl DeclarativeContract {
    /// A contract with no registered handlers.
    pub fn new() -> Self {
        Self {
            class_handlers: BTreeMap::new(),
            method_handlers: BTreeMap::new(),
            param_handlers: BTreeMap::new(),
        }
    }

    /// The standard marker set: class/method `Headers`, method
    /// `RequestLine` and `Body`, parameter `Param`, `QueryMap`, and
    /// `HeaderMap`.
    pub fn standard() -> Self {
        let mut contract = Self::new();

        contract.register_class_marker(ClassMarkerKind::Headers, |marker, builder| {
            let ClassMarker::Headers(lines) = marker;
            if lines.is_empty() {
                return Err(ConfigurationError::EmptyMarker {
                    marker: "Headers",
                    config_key: builder.config_key().to_string(),
                });
            }
            apply_header_lines(lines, builder)
        });

        contract.register_method_marker(MethodMarkerKind::RequestLine, |marker, builder| {
            let MethodMarker::RequestLine {
                value,
                decode_slash,
                collection_format,
            } = marker
            else {
                return Ok(());
            };
            if value.is_empty() {
                return Err(ConfigurationError::EmptyMarker {
                    marker: "RequestLine",
                    config_key: builder.config_key().to_string(),
                });
            }
            let (verb, path) = match value.split_once(' ') {
                Some((verb, path)) => (verb, path.trim_start()),
                None => (value.as_str(), ""),
            };
            let method = verb.parse().map_err(|_| ConfigurationError::MalformedRequestLine {
                config_key: builder.config_key().to_string(),
                value: value.clone(),
            })?;
            if !decode_slash && !path.contains('{') {
                builder.add_warning("decode_slash has no effect on a path without expressions");
            }
            let config_key = builder.config_key().to_string();
            let template = builder.template_mut();
            template.set_method(method);
            template
                .uri(path)
                .map_err(|_| ConfigurationError::MalformedRequestLine {
                    config_key,
                    value: value.clone(),
                })?;
            template.set_decode_slash(*decode_slash);
            template.set_collection_format(*collection_format);
            Ok(())
        });

        contract.register_method_marker(MethodMarkerKind::Body, |marker, builder| {
            let MethodMarker::Body(text) = marker else { return Ok(()) };
            if text.is_empty() {
                return Err(ConfigurationError::EmptyMarker {
                    marker: "Body",
                    config_key: builder.config_key().to_string(),
                });
            }
            if text.contains('{') {
                let config_key = builder.config_key().to_string();
                builder
                    .template_mut()
                    .set_body_template(text)
                    .map_err(|err| ConfigurationError::MalformedBodyTemplate {
                        config_key,
                        detail: err.to_string(),
                    })?;
            } else {
                builder.template_mut().set_body(text.as_bytes());
            }
            Ok(())
        });

        contract.register_method_marker(MethodMarkerKind::Headers, |marker, builder| {
            let MethodMarker::Headers(lines) = marker else { return Ok(()) };
            if lines.is_empty() {
                return Err(ConfigurationError::EmptyMarker {
                    marker: "Headers",
                    config_key: builder.config_key().to_string(),
                });
            }
            apply_header_lines(lines, builder)
        });

        contract.register_param_marker(ParamMarkerKind::Param, |marker, builder, index, param| {
            let ParamMarker::Param { name, expander } = marker else { return Ok(()) };
            let name = name.as_deref().unwrap_or_else(|| param.name());
            if name.is_empty() {
                return Err(ConfigurationError::EmptyMarker {
                    marker: "Param",
                    config_key: format!("parameter {index} of {}", builder.config_key()),
                });
            }
            let name = name.to_string();
            builder.name_param(name.clone(), index)?;
            if let Some(expander) = expander {
                builder.expander(index, expander.clone());
            }
            // a named parameter no template binds becomes a form parameter
            if !builder.template().has_variable(&name) {
                builder.form_param(name);
            }
            Ok(())
        });

        contract.register_param_marker(ParamMarkerKind::QueryMap, |marker, builder, index, _param| {
            let ParamMarker::QueryMap { encoded } = marker else { return Ok(()) };
            builder.query_map_index(index, *encoded)?;
            Ok(())
        });

        contract.register_param_marker(ParamMarkerKind::HeaderMap, |_marker, builder, index, _param| {
            builder.header_map_index(index)?;
            Ok(())
        });

        contract
    }

    /// Registers (or replaces) the handler for a class-marker kind.
    pub fn register_class_marker<H>(&mut self, kind: ClassMarkerKind, handler: H)
    where
        H: Fn(&ClassMarker, &mut MethodDescriptorBuilder) -> Result<(), ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        self.class_handlers.insert(kind, Box::new(handler));
    }

    /// Registers (or replaces) the handler for a method-marker kind.
    pub fn register_method_marker<H>(&mut self, kind: MethodMarkerKind, handler: H)
    where
        H: Fn(&MethodMarker, &mut MethodDescriptorBuilder) -> Result<(), ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        self.method_handlers.insert(kind, Box::new(handler));
    }

    /// Registers (or replaces) the handler for a parameter-marker kind.
    pub fn register_param_marker<H>(&mut self, kind: ParamMarkerKind, handler: H)
    where
        H: Fn(&ParamMarker, &mut MethodDescriptorBuilder, usize, &ParamDefinition) -> Result<(), ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        self.param_handlers.insert(kind, Box::new(handler));
    }

    fn compile_method(
        &self,
        target: &InterfaceDefinition,
        parent: Option<&ExtendsClause>,
        method: &MethodDefinition,
        env: &TypeEnv,
    ) -> Result<MethodDescriptor, ConfigurationError> {
        let key = config_key(target.name(), method, env);
        let mut builder = MethodDescriptor::builder(key.clone());
        builder.param_count(method.params().len());
        builder.return_type(method.return_type().resolve(env));

        // class markers: the extended interface first, then the target
        if let Some(clause) = parent {
            for marker in clause.interface().markers() {
                if let Some(handler) = self.class_handlers.get(&marker.kind()) {
                    handler(marker, &mut builder)?;
                }
            }
        }
        for marker in target.markers() {
            if let Some(handler) = self.class_handlers.get(&marker.kind()) {
                handler(marker, &mut builder)?;
            }
        }

        let mut matched = false;
        for marker in method.markers() {
            if let Some(handler) = self.method_handlers.get(&marker.kind()) {
                handler(marker, &mut builder)?;
                matched = true;
            }
        }
        if !matched {
            builder.ignore_method();
            return Ok(builder.build());
        }

        if builder.template().method().is_none() {
            return Err(ConfigurationError::MissingHttpMethod {
                config_key: key,
                warnings: builder.warnings_suffix(),
            });
        }

        for (index, param) in method.params().iter().enumerate() {
            let mut is_http_marker = false;
            for marker in param.markers() {
                if let Some(handler) = self.param_handlers.get(&marker.kind()) {
                    handler(marker, &mut builder, index, param)?;
                    is_http_marker = true;
                }
            }
            if is_http_marker {
                builder.ignore_param(index);
            }

            let ty = param.ty().resolve(env);
            if ty.is_url() {
                builder.url_index(index)?;
            } else if !is_http_marker && !ty.is_options() {
                if builder.is_processed(index) {
                    if !builder.form_params().is_empty() && builder.body_index_so_far().is_some() {
                        return Err(ConfigurationError::BodyWithFormParams {
                            config_key: key,
                            warnings: builder.warnings_suffix(),
                        });
                    }
                } else {
                    if !builder.form_params().is_empty() {
                        return Err(ConfigurationError::BodyWithFormParams {
                            config_key: key,
                            warnings: builder.warnings_suffix(),
                        });
                    }
                    builder.body_index(index, ty)?;
                }
            }
        }

        if let Some(index) = builder.header_map_index_so_far() {
            let ty = method.params()[index].ty().resolve(env);
            if !ty.is_map() {
                return Err(ConfigurationError::NotAMap {
                    role: "HeaderMap",
                    config_key: key,
                    ty: ty.to_string(),
                });
            }
            check_map_key("HeaderMap", &key, &ty)?;
        }
        if let Some(index) = builder.query_map_index_so_far() {
            let ty = method.params()[index].ty().resolve(env);
            // non-map query objects are allowed; only map keys are checked
            if ty.is_map() {
                check_map_key("QueryMap", &key, &ty)?;
            }
        }

        Ok(builder.build())
    }
}

impl Default for DeclarativeContract {
    fn default() -> Self {
        Self::standard()
    }
}

impl Contract for DeclarativeContract {
    fn parse_and_validate(
        &self,
        target: &InterfaceDefinition,
    ) -> Result<Vec<MethodDescriptor>, ConfigurationError> {
        if !target.type_params().is_empty() {
            return Err(ConfigurationError::ParameterizedType {
                interface: target.name().to_string(),
            });
        }
        let clauses = target.extends_clauses();
        if clauses.len() > 1 {
            return Err(ConfigurationError::MultipleInheritance {
                interface: target.name().to_string(),
            });
        }
        let parent = clauses.first();
        if let Some(clause) = parent {
            if !clause.interface().extends_clauses().is_empty() {
                return Err(ConfigurationError::DeepInheritance {
                    interface: target.name().to_string(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        let mut result = Vec::new();

        let own_env = TypeEnv::empty();
        for method in candidate_methods(target) {
            let descriptor = self.compile_method(target, parent, method, &own_env)?;
            push_unique(&mut seen, &mut result, descriptor)?;
        }
        if let Some(clause) = parent {
            let env = TypeEnv::bind(
                target.name(),
                clause.interface().type_params(),
                clause.type_args(),
            )?;
            for method in candidate_methods(clause.interface()) {
                let descriptor = self.compile_method(target, parent, method, &env)?;
                push_unique(&mut seen, &mut result, descriptor)?;
            }
        }

        Ok(result)
    }
}

fn candidate_methods(definition: &InterfaceDefinition) -> impl Iterator<Item = &MethodDefinition> {
    definition
        .methods()
        .iter()
        .filter(|method| method.method_kind() == MethodKind::Declared)
}

fn push_unique(
    seen: &mut BTreeSet<String>,
    result: &mut Vec<MethodDescriptor>,
    descriptor: MethodDescriptor,
) -> Result<(), ConfigurationError> {
    if !seen.insert(descriptor.config_key().to_string()) {
        return Err(ConfigurationError::Override {
            config_key: descriptor.config_key().to_string(),
        });
    }
    result.push(descriptor);
    Ok(())
}

fn apply_header_lines(
    lines: &[String],
    builder: &mut MethodDescriptorBuilder,
) -> Result<(), ConfigurationError> {
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(ConfigurationError::MalformedHeader {
                header: line.clone(),
                config_key: builder.config_key().to_string(),
            });
        };
        let config_key = builder.config_key().to_string();
        builder
            .template_mut()
            .header(name.trim(), &[value.trim()])
            .map_err(|_| ConfigurationError::MalformedHeader {
                header: line.clone(),
                config_key,
            })?;
    }
    Ok(())
}

fn check_map_key(
    role: &'static str,
    config_key: &str,
    ty: &crate::types::TypeRef,
) -> Result<(), ConfigurationError> {
    if let Some(key) = ty.map_key() {
        if !key.is_textual() {
            return Err(ConfigurationError::MapKeyNotTextual {
                role,
                config_key: config_key.to_string(),
                key_ty: key.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::HttpMethod;
    use crate::types::TypeRef;

    fn string_ty() -> TypeRef {
        TypeRef::new("String")
    }

    fn string_map() -> TypeRef {
        TypeRef::generic("HashMap", vec![string_ty(), string_ty()])
    }

    fn contributors_method() -> MethodDefinition {
        MethodDefinition::new("contributors", TypeRef::generic("Vec", vec![TypeRef::new("Contributor")]))
            .marker(MethodMarker::request_line("GET /repos/{owner}/{repo}/contributors"))
            .param(ParamDefinition::new("owner", string_ty()).marker(ParamMarker::param()))
            .param(ParamDefinition::new("repo", string_ty()).marker(ParamMarker::param()))
    }

    fn github() -> InterfaceDefinition {
        InterfaceDefinition::new("GitHub").method(contributors_method())
    }

    #[test]
    fn test_compile_produces_descriptor() {
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&github())
            .unwrap();
        assert_eq!(descriptors.len(), 1);
        let md = &descriptors[0];
        assert_eq!(md.config_key(), "GitHub#contributors(String,String)");
        assert_eq!(md.template().method(), Some(HttpMethod::Get));
        assert_eq!(md.index_to_name()[&0], vec!["owner"]);
        assert_eq!(md.index_to_name()[&1], vec!["repo"]);
        assert_eq!(md.param_count(), 2);
        assert!(md.body_index().is_none());
        assert!(!md.is_ignored());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let contract = DeclarativeContract::standard();
        let definition = github().method(
            MethodDefinition::new("emojis", TypeRef::new("String"))
                .marker(MethodMarker::request_line("GET /emojis")),
        );
        let first = contract.parse_and_validate(&definition).unwrap();
        let second = contract.parse_and_validate(&definition).unwrap();
        let keys = |list: &[MethodDescriptor]| {
            list.iter().map(|md| md.config_key().to_string()).collect::<Vec<_>>()
        };
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(
            keys(&first),
            vec!["GitHub#contributors(String,String)", "GitHub#emojis()"]
        );
    }

    #[test]
    fn test_duplicate_config_key_is_rejected() {
        let definition = github().method(contributors_method());
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Override { config_key }
            if config_key == "GitHub#contributors(String,String)"));
    }

    #[test]
    fn test_parameterized_target_is_rejected() {
        let definition = github().type_param("T");
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ParameterizedType { .. }));
    }

    #[test]
    fn test_multiple_inheritance_is_rejected() {
        let definition = github()
            .extends(InterfaceDefinition::new("A"), vec![])
            .extends(InterfaceDefinition::new("B"), vec![]);
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MultipleInheritance { .. }));
    }

    #[test]
    fn test_deep_inheritance_is_rejected() {
        let grandparent = InterfaceDefinition::new("Base");
        let parent = InterfaceDefinition::new("Middle").extends(grandparent, vec![]);
        let definition = github().extends(parent, vec![]);
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DeepInheritance { .. }));
    }

    #[test]
    fn test_missing_verb_is_rejected() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("broken", string_ty())
                .marker(MethodMarker::Headers(vec!["Accept: text/plain".into()])),
        );
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingHttpMethod { config_key, .. }
            if config_key == "Api#broken()"));
    }

    #[test]
    fn test_method_without_markers_is_ignored() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("helper", string_ty()),
        );
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        assert_eq!(descriptors.len(), 1);
        assert!(descriptors[0].is_ignored());
    }

    #[test]
    fn test_default_and_static_methods_are_skipped() {
        let definition = github()
            .method(MethodDefinition::new("helper", string_ty()).kind(MethodKind::Default))
            .method(MethodDefinition::new("create", string_ty()).kind(MethodKind::Static));
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        assert_eq!(descriptors.len(), 1);
    }

    #[test]
    fn test_unbound_param_becomes_body() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("create", TypeRef::unit())
                .marker(MethodMarker::request_line("POST /users"))
                .param(ParamDefinition::new("user", TypeRef::new("User"))),
        );
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        let md = &descriptors[0];
        assert_eq!(md.body_index(), Some(0));
        assert_eq!(md.body_type().unwrap().name(), "User");
    }

    #[test]
    fn test_two_unbound_params_are_rejected() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("create", TypeRef::unit())
                .marker(MethodMarker::request_line("POST /users"))
                .param(ParamDefinition::new("a", TypeRef::new("User")))
                .param(ParamDefinition::new("b", TypeRef::new("User"))),
        );
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::TooManyBodyParams { .. }));
    }

    #[test]
    fn test_body_with_form_params_is_rejected() {
        // "login" is named but appears in no template, so it is a form
        // param; the unbound "payload" would become the body
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("create", TypeRef::unit())
                .marker(MethodMarker::request_line("POST /users"))
                .param(ParamDefinition::new("login", string_ty()).marker(ParamMarker::param()))
                .param(ParamDefinition::new("payload", TypeRef::new("User"))),
        );
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::BodyWithFormParams { .. }));
    }

    #[test]
    fn test_query_map_on_two_params_is_rejected() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("search", string_ty())
                .marker(MethodMarker::request_line("GET /search"))
                .param(ParamDefinition::new("a", string_map()).marker(ParamMarker::QueryMap { encoded: false }))
                .param(ParamDefinition::new("b", string_map()).marker(ParamMarker::QueryMap { encoded: false })),
        );
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateQueryMap { .. }));
    }

    #[test]
    fn test_header_map_requires_map_type() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("get", string_ty())
                .marker(MethodMarker::request_line("GET /x"))
                .param(ParamDefinition::new("headers", string_ty()).marker(ParamMarker::HeaderMap)),
        );
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::NotAMap { role: "HeaderMap", .. }));
    }

    #[test]
    fn test_map_key_must_be_textual() {
        let bad_map = TypeRef::generic("HashMap", vec![TypeRef::new("u32"), string_ty()]);
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("search", string_ty())
                .marker(MethodMarker::request_line("GET /search"))
                .param(ParamDefinition::new("q", bad_map).marker(ParamMarker::QueryMap { encoded: false })),
        );
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MapKeyNotTextual { role: "QueryMap", .. }));
    }

    #[test]
    fn test_class_headers_apply_and_method_headers_append() {
        let definition = InterfaceDefinition::new("Api")
            .marker(ClassMarker::Headers(vec!["Accept: application/json".into()]))
            .method(
                MethodDefinition::new("get", string_ty())
                    .marker(MethodMarker::request_line("GET /x"))
                    .marker(MethodMarker::Headers(vec!["X-Ping: 1".into()])),
            );
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        let names: Vec<_> = descriptors[0]
            .template()
            .headers()
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();
        assert_eq!(names, vec!["Accept", "X-Ping"]);
    }

    #[test]
    fn test_generic_parent_methods_resolve_through_extends_clause() {
        let parent = InterfaceDefinition::new("CrudApi").type_param("T").method(
            MethodDefinition::new("list", TypeRef::generic("Stream", vec![TypeRef::new("T")]))
                .marker(MethodMarker::request_line("GET /items")),
        );
        let definition = InterfaceDefinition::new("UserApi")
            .extends(parent, vec![TypeRef::new("User")]);
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        assert_eq!(descriptors.len(), 1);
        let md = &descriptors[0];
        assert_eq!(md.config_key(), "UserApi#list()");
        assert_eq!(md.return_type().to_string(), "Stream<User>");
    }

    #[test]
    fn test_url_param_binds_url_index() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("fetch", string_ty())
                .marker(MethodMarker::request_line("GET /data"))
                .param(ParamDefinition::new("base", TypeRef::new("Url"))),
        );
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        assert_eq!(descriptors[0].url_index(), Some(0));
        assert!(descriptors[0].body_index().is_none());
    }

    #[test]
    fn test_options_param_is_not_a_body() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("fetch", string_ty())
                .marker(MethodMarker::request_line("GET /data"))
                .param(ParamDefinition::new("options", TypeRef::new("Options"))),
        );
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        assert!(descriptors[0].body_index().is_none());
    }

    #[test]
    fn test_named_param_missing_from_template_is_form_param() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("login", TypeRef::unit())
                .marker(MethodMarker::request_line("POST /login"))
                .param(ParamDefinition::new("user", string_ty()).marker(ParamMarker::param()))
                .param(ParamDefinition::new("pass", string_ty()).marker(ParamMarker::param())),
        );
        let descriptors = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap();
        assert_eq!(descriptors[0].form_params(), &["user".to_string(), "pass".to_string()]);
    }

    #[test]
    fn test_malformed_request_line_is_rejected() {
        let definition = InterfaceDefinition::new("Api").method(
            MethodDefinition::new("get", string_ty())
                .marker(MethodMarker::request_line("FETCH /x")),
        );
        let err = DeclarativeContract::standard()
            .parse_and_validate(&definition)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedRequestLine { .. }));
    }
}
