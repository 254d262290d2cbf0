//! Engine catalog and the content-type keyed mapper registry.

use std::collections::HashMap;

use crate::mapping::engines::{CanonicalJsonMapper, WrappedJsonMapper, CANONICAL_JSON, WRAPPED_JSON};
use crate::mapping::{MapperError, MappingContext, PayloadMapper};

/// Constructs a mapper from engine options.
pub type EngineConstructor =
    fn(&HashMap<String, String>) -> Result<Box<dyn PayloadMapper>, MapperError>;

/// Resolution order: built-in symbolic names first, then constructors
/// registered under fully-qualified names by embedding code.
pub struct EngineCatalog {
    builtin: HashMap<&'static str, EngineConstructor>,
    registered: HashMap<String, EngineConstructor>,
}

impl Default for EngineCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl EngineCatalog {
    pub fn with_builtins() -> Self {
        let mut builtin: HashMap<&'static str, EngineConstructor> = HashMap::new();
        builtin.insert(CANONICAL_JSON, CanonicalJsonMapper::construct);
        builtin.insert(WRAPPED_JSON, WrappedJsonMapper::construct);
        Self {
            builtin,
            registered: HashMap::new(),
        }
    }

    /// Register a constructor under a fully-qualified name, consulted when no
    /// built-in engine matches.
    pub fn register(&mut self, name: impl Into<String>, constructor: EngineConstructor) {
        self.registered.insert(name.into(), constructor);
    }

    pub fn resolve(&self, name: &str) -> Result<EngineConstructor, MapperError> {
        self.builtin
            .get(name)
            .or_else(|| self.registered.get(name))
            .copied()
            .ok_or_else(|| MapperError::UnknownEngine(name.to_string()))
    }
}

/// Content-type keyed mapper lookup, built once from configuration and
/// read-only afterwards. Lookup is O(1) by exact string match; there is no
/// wildcard or prefix matching.
pub struct MapperRegistry {
    mappers: HashMap<String, Box<dyn PayloadMapper>>,
}

impl MapperRegistry {
    /// Build the registry from the ordered mapping contexts. A failing entry
    /// is logged and leaves its content-type unmapped; it does not abort
    /// startup. Later records win on duplicate content-types.
    pub fn from_contexts(catalog: &EngineCatalog, contexts: &[MappingContext]) -> Self {
        let mut mappers: HashMap<String, Box<dyn PayloadMapper>> = HashMap::new();
        for context in contexts {
            let constructed = catalog
                .resolve(&context.mapping_engine)
                .and_then(|constructor| constructor(&context.options));
            match constructed {
                Ok(mapper) => {
                    mappers.insert(context.content_type.clone(), mapper);
                }
                Err(err) => {
                    tracing::error!(
                        "could not initialize mapping engine '{}' for content-type '{}': {}",
                        context.mapping_engine,
                        context.content_type,
                        err
                    );
                }
            }
        }
        Self { mappers }
    }

    pub fn empty() -> Self {
        Self {
            mappers: HashMap::new(),
        }
    }

    pub fn get(&self, content_type: &str) -> Option<&dyn PayloadMapper> {
        self.mappers.get(content_type).map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MapperInput;
    use crate::messaging::inbound::MessageBody;
    use crate::messaging::protocol::Envelope;

    fn context(content_type: &str, engine: &str, options: &[(&str, &str)]) -> MappingContext {
        MappingContext {
            content_type: content_type.to_string(),
            mapping_engine: engine.to_string(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn builds_mappers_for_known_engines() {
        let catalog = EngineCatalog::with_builtins();
        let registry = MapperRegistry::from_contexts(
            &catalog,
            &[
                context("application/custom", CANONICAL_JSON, &[]),
                context(
                    "application/sensor+json",
                    WRAPPED_JSON,
                    &[("topic", "sensors/env"), ("path", "/readings")],
                ),
            ],
        );
        assert_eq!(registry.len(), 2);
        assert!(registry.get("application/custom").is_some());
        assert!(registry.get("application/sensor+json").is_some());
        assert!(registry.get("application/unknown").is_none());
    }

    #[test]
    fn unknown_engine_skips_entry_without_aborting() {
        let catalog = EngineCatalog::with_builtins();
        let registry = MapperRegistry::from_contexts(
            &catalog,
            &[
                context("application/a", "no-such-engine", &[]),
                context("application/b", CANONICAL_JSON, &[]),
            ],
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.get("application/a").is_none());
        assert!(registry.get("application/b").is_some());
    }

    #[test]
    fn bad_options_skip_entry_without_aborting() {
        let catalog = EngineCatalog::with_builtins();
        let registry = MapperRegistry::from_contexts(
            &catalog,
            &[context("application/sensor+json", WRAPPED_JSON, &[])],
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn later_duplicate_content_type_wins() {
        let catalog = EngineCatalog::with_builtins();
        let registry = MapperRegistry::from_contexts(
            &catalog,
            &[
                context("application/custom", CANONICAL_JSON, &[]),
                context(
                    "application/custom",
                    WRAPPED_JSON,
                    &[("topic", "late/winner"), ("path", "/")],
                ),
            ],
        );
        assert_eq!(registry.len(), 1);
        let mapper = registry.get("application/custom").unwrap();
        let headers = HashMap::new();
        let body = MessageBody::text("{}");
        let envelope = mapper
            .map_inbound(&MapperInput {
                content_type: "application/custom",
                body: &body,
                headers: &headers,
            })
            .unwrap();
        assert_eq!(envelope.topic, "late/winner");
    }

    #[test]
    fn registered_constructor_is_a_fallback_after_builtins() {
        fn fixed(_options: &HashMap<String, String>) -> Result<Box<dyn PayloadMapper>, MapperError> {
            struct Fixed;
            impl PayloadMapper for Fixed {
                fn map_inbound(&self, _input: &MapperInput<'_>) -> Result<Envelope, MapperError> {
                    Ok(Envelope {
                        topic: "fixed".into(),
                        path: "/".into(),
                        headers: HashMap::new(),
                        value: serde_json::Value::Null,
                    })
                }
                fn map_outbound(&self, _envelope: &Envelope) -> Result<MessageBody, MapperError> {
                    Ok(MessageBody::text("{}"))
                }
            }
            Ok(Box::new(Fixed))
        }

        let mut catalog = EngineCatalog::with_builtins();
        catalog.register("org.example.mapping.FixedMapper", fixed);
        assert!(catalog.resolve("org.example.mapping.FixedMapper").is_ok());
        assert!(matches!(
            catalog.resolve("org.example.mapping.Missing"),
            Err(MapperError::UnknownEngine(_))
        ));
    }
}
