//! Auflösung von `schemaLocation`-URIs zu Dokumentinhalten.
//!
//! Der Kern führt selbst keinerlei Netzwerk- oder Dateisystemzugriffe aus;
//! die Collection delegiert jede Auflösung an einen injizierten
//! [`SchemaResolver`]. [`FileResolver`] liest relative Pfade vom Verzeichnis
//! des einbindenden Dokuments; [`MapResolver`] bedient Auflösungen aus einer
//! In-Memory-Tabelle (Tests, eingebettete Schemas).

use std::path::{Path, PathBuf};

use crate::FastHashMap;

/// Kombiniert eine relative Location mit der Adresse des einbindenden
/// Dokuments (letztes Pfadsegment der Basis wird ersetzt). Absolute
/// Locations bleiben unverändert.
pub(crate) fn combine_uri(base_uri: Option<&str>, location: &str) -> String {
    if location.contains("://") || location.starts_with('/') {
        return location.to_string();
    }
    match base_uri {
        Some(base) => match base.rfind('/') {
            Some(pos) => format!("{}/{}", &base[..pos], location),
            None => location.to_string(),
        },
        None => location.to_string(),
    }
}

/// Löst eine Schema-Location zu Dokumentinhalt auf.
///
/// `None` bedeutet: diese Quelle kann die Location nicht liefern. Die
/// Collection fällt dann auf ihre Known-Schema-Tabelle zurück.
pub trait SchemaResolver {
    /// Liefert den Dokumentinhalt für `schema_location`, relativ zu
    /// `base_uri` (der Adresse des einbindenden Dokuments).
    fn resolve_entity(
        &self,
        target_namespace: Option<&str>,
        schema_location: &str,
        base_uri: Option<&str>,
    ) -> Option<String>;
}

/// Dateisystem-Resolver: `schemaLocation` relativ zum Verzeichnis des
/// einbindenden Dokuments.
#[derive(Debug, Default)]
pub struct FileResolver;

impl FileResolver {
    fn resolve_path(schema_location: &str, base_uri: Option<&str>) -> PathBuf {
        let location = Path::new(schema_location);
        if location.is_absolute() {
            return location.to_path_buf();
        }
        match base_uri {
            Some(base) => {
                // base_uri ist die Adresse des einbindenden *Dokuments*;
                // relative Locations lösen von dessen Verzeichnis auf.
                let base = Path::new(base);
                let dir = base.parent().unwrap_or(Path::new("."));
                dir.join(location)
            }
            None => location.to_path_buf(),
        }
    }
}

impl SchemaResolver for FileResolver {
    fn resolve_entity(
        &self,
        _target_namespace: Option<&str>,
        schema_location: &str,
        base_uri: Option<&str>,
    ) -> Option<String> {
        let path = Self::resolve_path(schema_location, base_uri);
        std::fs::read_to_string(path).ok()
    }
}

/// In-Memory-Resolver: Location → Inhalt.
#[derive(Debug, Default)]
pub struct MapResolver {
    entries: FastHashMap<String, String>,
}

impl MapResolver {
    /// Erstellt einen leeren Resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hinterlegt Dokumentinhalt für eine Location.
    pub fn insert(&mut self, schema_location: &str, content: &str) -> &mut Self {
        self.entries
            .insert(schema_location.to_string(), content.to_string());
        self
    }
}

impl SchemaResolver for MapResolver {
    fn resolve_entity(
        &self,
        _target_namespace: Option<&str>,
        schema_location: &str,
        base_uri: Option<&str>,
    ) -> Option<String> {
        if let Some(content) = self.entries.get(schema_location) {
            return Some(content.clone());
        }
        self.entries
            .get(&combine_uri(base_uri, schema_location))
            .cloned()
    }
}
