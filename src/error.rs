//! Zentrale Fehlertypen für das Schema-Modell.
//!
//! Jede Variante entspricht einer fatalen Fehlerklasse der Schema-Akquisition;
//! wiederherstellbare Abwesenheiten (optionale Attribute, optionale
//! Kind-Elemente) sind keine Fehler und werden beim Parsen übersprungen.

use core::fmt;

/// All fatal error classes raised while loading schema documents.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The underlying XML text could not be parsed into an element tree.
    ///
    /// Trägt die Meldung des XML-Parsers. Es wird kein partielles Schema
    /// registriert.
    XmlParse(String),
    /// A `{uri}local` QName literal has an unmatched opening brace.
    MalformedQName(String),
    /// A prefixed name uses a prefix with no in-scope declaration.
    UnknownPrefix {
        /// Der nicht gebundene Prefix.
        prefix: String,
        /// Der QName-String in dem der Prefix auftrat.
        name: String,
    },
    /// A restriction contains a child element that is not a facet
    /// (XSD 1.0 Part 2 §4.3).
    UnknownFacet(String),
    /// An included/imported/redefined document's target namespace disagrees
    /// with the declaring construct (XSD 1.0 Part 1 §4.2).
    NamespaceMismatch {
        /// `include`, `import` oder `redefine`.
        construct: &'static str,
        /// Erwarteter Namespace (leer = kein Namespace).
        expected: String,
        /// Tatsächlicher Namespace des aufgelösten Dokuments.
        actual: String,
    },
    /// Two documents with the same (namespace, systemId) key were registered
    /// in one collection.
    DuplicateSchema {
        /// Target Namespace des Dokuments.
        namespace: String,
        /// System-Id des Dokuments.
        system_id: String,
    },
    /// A structural violation of the schema-for-schemas: missing required
    /// attribute, invalid occurs bounds, unknown enumeration value, and the
    /// like (XSD 1.0 Part 1 §3).
    SchemaStructure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XmlParse(msg) => write!(f, "XML parse error: {msg}"),
            Self::MalformedQName(s) => {
                write!(f, "malformed QName literal '{s}': unmatched '{{'")
            }
            Self::UnknownPrefix { prefix, name } => {
                write!(f, "unknown namespace prefix '{prefix}' in '{name}'")
            }
            Self::UnknownFacet(name) => {
                write!(f, "unknown facet '{name}' in restriction (XSD Part 2 §4.3)")
            }
            Self::NamespaceMismatch {
                construct,
                expected,
                actual,
            } => write!(
                f,
                "target namespace mismatch on {construct}: expected '{expected}', found '{actual}' (XSD Part 1 §4.2)"
            ),
            Self::DuplicateSchema {
                namespace,
                system_id,
            } => write!(
                f,
                "schema with namespace '{namespace}' and system id '{system_id}' is already registered"
            ),
            Self::SchemaStructure(msg) => write!(f, "invalid schema structure: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Result-Alias für alle öffentlichen Operationen dieser Crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Display-Meldungen nennen das fehlerhafte Konstrukt.
    #[test]
    fn display_names_the_offending_construct() {
        let err = Error::NamespaceMismatch {
            construct: "include",
            expected: "http://example.org/a".to_string(),
            actual: "http://example.org/b".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("include"));
        assert!(msg.contains("http://example.org/a"));
        assert!(msg.contains("http://example.org/b"));
    }

    #[test]
    fn display_unknown_prefix() {
        let err = Error::UnknownPrefix {
            prefix: "tns".to_string(),
            name: "tns:BookType".to_string(),
        };
        assert!(err.to_string().contains("'tns'"));
    }
}
