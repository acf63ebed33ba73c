//! Remote path layout: `/{environment}/{app}/{version}/config/{key}`.

use crate::remote::store::RemoteError;

/// Base path of an application's configuration tree in the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    environment: String,
    app: String,
    version: String,
}

fn check_segment(segment: &str) -> Result<(), RemoteError> {
    if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
        return Err(RemoteError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

impl RemotePath {
    pub fn new(
        environment: impl Into<String>,
        app: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let path = Self {
            environment: environment.into(),
            app: app.into(),
            version: version.into(),
        };
        check_segment(&path.environment)?;
        check_segment(&path.app)?;
        check_segment(&path.version)?;
        Ok(path)
    }

    /// `/{environment}/{app}/{version}/config`
    pub fn root(&self) -> String {
        format!("/{}/{}/{}/config", self.environment, self.app, self.version)
    }

    /// Node path holding `key`.
    pub fn key_path(&self, key: &str) -> Result<String, RemoteError> {
        check_segment(key)?;
        Ok(format!("{}/{}", self.root(), key))
    }

    /// The key named by `path` when it is a direct child of the root.
    pub fn key_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        let root = self.root();
        let key = path.strip_prefix(root.as_str())?.strip_prefix('/')?;
        if key.is_empty() || key.contains('/') {
            None
        } else {
            Some(key)
        }
    }
}
