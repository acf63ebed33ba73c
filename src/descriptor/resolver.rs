//! Descriptor resolution.
//!
//! # Responsibilities
//! - Introspect an explicitly named type, or scan every registered type
//! - Resolve stereotype delegation (one level) down to a concrete marker
//! - Reject zero, multiple or conflicting entry points

use thiserror::Error;

use crate::descriptor::marker::{AppMeta, Marker};
use crate::descriptor::registry::{AppRegistry, EntryType};
use crate::descriptor::AppDescriptor;
use crate::lifecycle::hooks::HookSet;

/// Fatal descriptor resolution failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("No application entry point found among {scanned} registered types")]
    NoEntryPoint { scanned: usize },

    #[error("Multiple application entry points found: {}", .0.join(", "))]
    MultipleEntryPoints(Vec<String>),

    #[error("Type '{0}' is not registered")]
    UnknownType(String),

    #[error("Type '{0}' does not carry an application marker")]
    NotMarked(String),

    #[error("Type '{0}' declares both the current and the deprecated application marker")]
    ConflictingMarkerForms(String),

    #[error("Type '{0}' declares more than one application marker")]
    AmbiguousMarkers(String),

    #[error("Stereotype '{stereotype}' on type '{type_name}' delegates to another stereotype")]
    NestedStereotype { type_name: String, stereotype: String },

    #[error("Application marker on type '{0}' has an empty name")]
    EmptyName(String),

    #[error("Container entry point '{entry_point}' of type '{type_name}' is not registered")]
    UnknownEntryPoint { type_name: String, entry_point: String },
}

/// Resolves the single application descriptor from a registry.
pub struct DescriptorResolver<'a> {
    registry: &'a AppRegistry,
}

impl<'a> DescriptorResolver<'a> {
    pub fn new(registry: &'a AppRegistry) -> Self {
        Self { registry }
    }

    /// Resolve the descriptor, introspecting only `explicit` when given.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<AppDescriptor, DescriptorError> {
        let descriptor = match explicit {
            Some(name) => {
                let entry = self
                    .registry
                    .get(name)
                    .ok_or_else(|| DescriptorError::UnknownType(name.to_string()))?;
                let meta = self
                    .concrete_marker(entry)?
                    .ok_or_else(|| DescriptorError::NotMarked(name.to_string()))?;
                self.describe(entry, meta)?
            }
            None => self.scan()?,
        };

        tracing::info!(
            app = %descriptor.name,
            type_name = %descriptor.type_name,
            requires_container = descriptor.requires_container,
            "Application descriptor resolved"
        );
        Ok(descriptor)
    }

    /// Collect the hooks of the descriptor's type followed by its container entry points.
    pub fn hooks_for(&self, descriptor: &AppDescriptor) -> Result<HookSet, DescriptorError> {
        let mut hooks = HookSet::default();
        for name in descriptor.entry_types() {
            let entry = self
                .registry
                .get(name)
                .ok_or_else(|| DescriptorError::UnknownType(name.to_string()))?;
            hooks.extend(entry.hooks());
        }
        Ok(hooks)
    }

    fn scan(&self) -> Result<AppDescriptor, DescriptorError> {
        let mut candidates: Vec<(&EntryType, &AppMeta)> = Vec::new();
        for entry in self.registry.types() {
            if let Some(meta) = self.concrete_marker(entry)? {
                candidates.push((entry, meta));
            }
        }

        match candidates.as_slice() {
            [] => Err(DescriptorError::NoEntryPoint {
                scanned: self.registry.len(),
            }),
            [(entry, meta)] => self.describe(entry, meta),
            many => Err(DescriptorError::MultipleEntryPoints(
                many.iter().map(|(entry, _)| entry.name().to_string()).collect(),
            )),
        }
    }

    /// The single concrete marker a type carries, if any.
    fn concrete_marker<'e>(&'e self, entry: &'e EntryType) -> Result<Option<&'e AppMeta>, DescriptorError> {
        let mut found: Vec<&Marker> = Vec::new();
        for marker in entry.markers() {
            match marker {
                Marker::Application(_) | Marker::LegacyApplication(_) => found.push(marker),
                Marker::Stereotype(name) => match self.registry.stereotype_target(name) {
                    Some(Marker::Stereotype(_)) => {
                        return Err(DescriptorError::NestedStereotype {
                            type_name: entry.name().to_string(),
                            stereotype: name.clone(),
                        })
                    }
                    Some(target) => found.push(target),
                    None => {}
                },
            }
        }

        match found.as_slice() {
            [] => Ok(None),
            [marker] => Ok(marker.meta()),
            many => {
                let legacy = many.iter().any(|m| m.is_legacy());
                let current = many.iter().any(|m| !m.is_legacy());
                if legacy && current {
                    Err(DescriptorError::ConflictingMarkerForms(entry.name().to_string()))
                } else {
                    Err(DescriptorError::AmbiguousMarkers(entry.name().to_string()))
                }
            }
        }
    }

    fn describe(&self, entry: &EntryType, meta: &AppMeta) -> Result<AppDescriptor, DescriptorError> {
        if meta.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName(entry.name().to_string()));
        }

        let mut entry_points: Vec<String> = Vec::new();
        for name in &meta.container_entry_points {
            if self.registry.get(name).is_none() {
                return Err(DescriptorError::UnknownEntryPoint {
                    type_name: entry.name().to_string(),
                    entry_point: name.clone(),
                });
            }
            if name != entry.name() && !entry_points.contains(name) {
                entry_points.push(name.clone());
            }
        }

        Ok(AppDescriptor {
            type_name: entry.name().to_string(),
            name: meta.name.clone(),
            properties_location: meta.properties_location.clone(),
            requires_container: meta.requires_container,
            container_entry_points: entry_points,
            remote_required: meta.remote_required,
            version: meta.version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::registry::EntryType;

    fn registry_with(types: Vec<EntryType>) -> AppRegistry {
        let mut registry = AppRegistry::new();
        for t in types {
            registry.register(t);
        }
        registry
    }

    #[test]
    fn test_single_marked_type_is_resolved() {
        let registry = registry_with(vec![
            EntryType::new("app::Helper"),
            EntryType::new("app::Orders")
                .marker(Marker::application(AppMeta::new("orders").properties("classpath:orders.properties"))),
        ]);

        let descriptor = DescriptorResolver::new(&registry).resolve(None).unwrap();
        assert_eq!(descriptor.name, "orders");
        assert_eq!(descriptor.type_name, "app::Orders");
        assert_eq!(descriptor.properties_location.as_deref(), Some("classpath:orders.properties"));
    }

    #[test]
    fn test_zero_marked_types_fail() {
        let registry = registry_with(vec![EntryType::new("app::Helper")]);
        let err = DescriptorResolver::new(&registry).resolve(None).unwrap_err();
        assert_eq!(err, DescriptorError::NoEntryPoint { scanned: 1 });
    }

    #[test]
    fn test_two_marked_types_fail() {
        let registry = registry_with(vec![
            EntryType::new("app::A").marker(Marker::application(AppMeta::new("a"))),
            EntryType::new("app::B").marker(Marker::legacy(AppMeta::new("b"))),
        ]);
        let err = DescriptorResolver::new(&registry).resolve(None).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::MultipleEntryPoints(vec!["app::A".into(), "app::B".into()])
        );
    }

    #[test]
    fn test_explicit_type_skips_scan() {
        let registry = registry_with(vec![
            EntryType::new("app::A").marker(Marker::application(AppMeta::new("a"))),
            EntryType::new("app::B").marker(Marker::application(AppMeta::new("b"))),
        ]);
        let descriptor = DescriptorResolver::new(&registry).resolve(Some("app::B")).unwrap();
        assert_eq!(descriptor.name, "b");
    }

    #[test]
    fn test_explicit_type_without_marker_fails() {
        let registry = registry_with(vec![EntryType::new("app::Plain")]);
        let resolver = DescriptorResolver::new(&registry);
        assert_eq!(
            resolver.resolve(Some("app::Plain")).unwrap_err(),
            DescriptorError::NotMarked("app::Plain".into())
        );
        assert_eq!(
            resolver.resolve(Some("app::Missing")).unwrap_err(),
            DescriptorError::UnknownType("app::Missing".into())
        );
    }

    #[test]
    fn test_current_and_legacy_markers_conflict() {
        let registry = registry_with(vec![EntryType::new("app::A")
            .marker(Marker::application(AppMeta::new("a")))
            .marker(Marker::legacy(AppMeta::new("a")))]);
        assert_eq!(
            DescriptorResolver::new(&registry).resolve(None).unwrap_err(),
            DescriptorError::ConflictingMarkerForms("app::A".into())
        );
    }

    #[test]
    fn test_stereotype_delegation_resolves_one_level() {
        let mut registry = registry_with(vec![
            EntryType::new("app::Svc").marker(Marker::stereotype("Microservice")),
            EntryType::new("app::Other").marker(Marker::stereotype("Unrelated")),
        ]);
        registry.stereotype("Microservice", Marker::application(AppMeta::new("svc").requires_container(true)));

        let descriptor = DescriptorResolver::new(&registry).resolve(None).unwrap();
        assert_eq!(descriptor.type_name, "app::Svc");
        assert!(descriptor.requires_container);
    }

    #[test]
    fn test_nested_stereotype_is_rejected() {
        let mut registry = registry_with(vec![EntryType::new("app::Svc").marker(Marker::stereotype("Outer"))]);
        registry.stereotype("Outer", Marker::stereotype("Inner"));
        registry.stereotype("Inner", Marker::application(AppMeta::new("svc")));

        assert_eq!(
            DescriptorResolver::new(&registry).resolve(None).unwrap_err(),
            DescriptorError::NestedStereotype {
                type_name: "app::Svc".into(),
                stereotype: "Outer".into()
            }
        );
    }

    #[test]
    fn test_empty_name_and_unknown_entry_point() {
        let registry = registry_with(vec![EntryType::new("app::A").marker(Marker::application(AppMeta::new(" ")))]);
        assert_eq!(
            DescriptorResolver::new(&registry).resolve(None).unwrap_err(),
            DescriptorError::EmptyName("app::A".into())
        );

        let registry = registry_with(vec![
            EntryType::new("app::A").marker(Marker::application(AppMeta::new("a").entry_point("app::Gone")))
        ]);
        assert!(matches!(
            DescriptorResolver::new(&registry).resolve(None),
            Err(DescriptorError::UnknownEntryPoint { .. })
        ));
    }

    #[test]
    fn test_hooks_follow_entry_point_order() {
        let registry = registry_with(vec![
            EntryType::new("app::Web").on_init(|_| Ok(())),
            EntryType::new("app::A")
                .marker(Marker::application(
                    AppMeta::new("a").entry_point("app::Web").entry_point("app::Web"),
                ))
                .on_init(|_| Ok(()))
                .on_stop(|_| Ok(())),
        ]);
        let resolver = DescriptorResolver::new(&registry);
        let descriptor = resolver.resolve(None).unwrap();
        assert_eq!(descriptor.container_entry_points, vec!["app::Web".to_string()]);

        let hooks = resolver.hooks_for(&descriptor).unwrap();
        let labels: Vec<_> = hooks
            .hooks(crate::lifecycle::hooks::HookPhase::Init)
            .iter()
            .map(|h| h.label().to_string())
            .collect();
        assert_eq!(labels, vec!["app::A#init0", "app::Web#init0"]);
        assert_eq!(hooks.hooks(crate::lifecycle::hooks::HookPhase::Stop).len(), 1);
    }
}
