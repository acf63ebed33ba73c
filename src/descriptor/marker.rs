//! Entry-point markers.
//!
//! A type becomes an application entry point by carrying a concrete marker,
//! either directly or through a stereotype: a named marker that is itself
//! tagged with a concrete one. Only one level of stereotype delegation is
//! allowed.
//!
//! ```text
//! EntryType ──▶ Marker::Application(meta)            (current form)
//!           ──▶ Marker::LegacyApplication(meta)      (deprecated form)
//!           ──▶ Marker::Stereotype("name") ──▶ Application | LegacyApplication
//! ```

/// Static metadata declared by an entry-point marker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppMeta {
    /// Application name, used for the remote path and default resource name.
    pub name: String,
    /// URI-like location of the local properties resource.
    pub properties_location: Option<String>,
    /// Whether startup must hand the configuration to a container.
    pub requires_container: bool,
    /// Additional registered types contributing hooks, in declaration order.
    pub container_entry_points: Vec<String>,
    /// Fail startup when the remote store cannot be reached.
    pub remote_required: bool,
    /// Version segment of the remote path; the bootstrap settings supply it when unset.
    pub version: Option<String>,
}

impl AppMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn properties(mut self, location: impl Into<String>) -> Self {
        self.properties_location = Some(location.into());
        self
    }

    pub fn requires_container(mut self, required: bool) -> Self {
        self.requires_container = required;
        self
    }

    pub fn entry_point(mut self, type_name: impl Into<String>) -> Self {
        self.container_entry_points.push(type_name.into());
        self
    }

    pub fn remote_required(mut self, required: bool) -> Self {
        self.remote_required = required;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A marker attached to a registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Current entry-point marker.
    Application(AppMeta),
    /// Deprecated entry-point marker, still honoured.
    LegacyApplication(AppMeta),
    /// Reference to a registered stereotype by name.
    ///
    /// Names that are not registered as stereotypes are ordinary markers and
    /// do not make the type an entry point.
    Stereotype(String),
}

impl Marker {
    pub fn application(meta: AppMeta) -> Self {
        Marker::Application(meta)
    }

    pub fn legacy(meta: AppMeta) -> Self {
        Marker::LegacyApplication(meta)
    }

    pub fn stereotype(name: impl Into<String>) -> Self {
        Marker::Stereotype(name.into())
    }

    /// Metadata carried by a concrete marker.
    pub fn meta(&self) -> Option<&AppMeta> {
        match self {
            Marker::Application(meta) | Marker::LegacyApplication(meta) => Some(meta),
            Marker::Stereotype(_) => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Marker::LegacyApplication(_))
    }
}
