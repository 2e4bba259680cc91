//! Namespace-qualifizierte Namen und Dokument-Identitäten.
//!
//! Ein [`QName`] ist das Tripel aus Namespace-URI, Local-Name und optionalem
//! Prefix. Der Prefix ist reine Metadaten: zwei QNames mit gleicher URI und
//! gleichem Local-Name sind gleich, unabhängig vom Prefix (Namespaces in
//! XML 1.0 §2.3). `PartialEq`, `Eq`, `Ord` und `Hash` ignorieren ihn daher.
//!
//! Die kanonische String-Form ist `{uri}local` (bzw. nur `local` bei leerer
//! URI); [`QName::parse`] akzeptiert dieselbe Syntax zurück.
//!
//! Ein [`SchemaKey`] identifiziert ein geparstes Dokument innerhalb einer
//! Collection: das Paar aus Target Namespace und System-Id.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ahash::AHasher;

use crate::error::{Error, Result};

/// A QName value with URI, local-name, and optional prefix.
///
/// `identity` ist ein vorberechneter 64-Bit-Hash von (uri, local_name).
/// Vermeidet wiederholtes String-Hashing bei Map-Operationen; wird bei
/// Konstruktion berechnet, nie persistiert.
#[derive(Clone)]
pub struct QName {
    /// The namespace URI. Empty string means no namespace.
    pub uri: Rc<str>,
    /// The local name.
    pub local_name: Rc<str>,
    /// The optional prefix, kept only for diagnostics and re-serialization.
    pub prefix: Option<Rc<str>>,
    /// Vorberechneter Hash von (uri, local_name).
    identity: u64,
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QName")
            .field("uri", &self.uri)
            .field("local_name", &self.local_name)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Berechnet den Identity-Hash für ein QName (uri + local_name).
fn compute_identity(uri: &str, local_name: &str) -> u64 {
    let mut hasher = AHasher::default();
    uri.hash(&mut hasher);
    local_name.hash(&mut hasher);
    hasher.finish()
}

impl QName {
    /// Erstellt einen QName ohne Prefix.
    pub fn new(uri: &str, local_name: &str) -> Self {
        Self {
            uri: Rc::from(uri),
            local_name: Rc::from(local_name),
            prefix: None,
            identity: compute_identity(uri, local_name),
        }
    }

    /// Erstellt einen QName mit Prefix.
    pub fn with_prefix(uri: &str, local_name: &str, prefix: &str) -> Self {
        Self {
            uri: Rc::from(uri),
            local_name: Rc::from(local_name),
            prefix: Some(Rc::from(prefix)),
            identity: compute_identity(uri, local_name),
        }
    }

    /// Parsed die kanonische `{uri}local`-Form.
    ///
    /// Ein Name ohne öffnende Klammer liegt im leeren Namespace. Eine
    /// öffnende Klammer ohne schließende ist ein harter Formatfehler.
    ///
    /// # Beispiel
    ///
    /// ```
    /// use xsom::QName;
    ///
    /// let q = QName::parse("{http://example.org}book").unwrap();
    /// assert_eq!(&*q.uri, "http://example.org");
    /// assert_eq!(&*q.local_name, "book");
    ///
    /// let bare = QName::parse("book").unwrap();
    /// assert!(bare.uri.is_empty());
    /// ```
    pub fn parse(literal: &str) -> Result<Self> {
        match literal.strip_prefix('{') {
            Some(rest) => {
                let close = rest
                    .find('}')
                    .ok_or_else(|| Error::MalformedQName(literal.to_string()))?;
                Ok(Self::new(&rest[..close], &rest[close + 1..]))
            }
            None => Ok(Self::new("", literal)),
        }
    }

    /// Ob der QName im leeren Namespace liegt.
    pub fn has_no_namespace(&self) -> bool {
        self.uri.is_empty()
    }
}

/// Kanonische String-Form: `{uri}local`, bzw. `local` bei leerer URI.
/// Der Prefix erscheint nie — er ist nicht Teil der Identität.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.uri, self.local_name)
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.uri == other.uri
            && self.local_name == other.local_name
    }
}

impl Eq for QName {}

/// Ermöglicht `rc_qname == qname` Vergleiche.
impl PartialEq<QName> for Rc<QName> {
    fn eq(&self, other: &QName) -> bool {
        **self == *other
    }
}

impl PartialEq<Rc<QName>> for QName {
    fn eq(&self, other: &Rc<QName>) -> bool {
        *self == **other
    }
}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.identity);
    }
}

/// Ordering konsistent mit PartialEq: nur uri und local_name, prefix ignoriert.
/// Sortierung: erst local_name, dann uri.
impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

/// Composite identity of one parsed document within a collection.
///
/// Zwei Dokumente mit demselben Key können nicht in einer Collection
/// koexistieren; die Registrierung erzwingt das.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    /// Target Namespace des Dokuments (leer = kein Namespace).
    pub namespace: Rc<str>,
    /// System-Id (Adresse) des Dokuments; leer für anonym gelesene Dokumente.
    pub system_id: Rc<str>,
}

impl SchemaKey {
    /// Erstellt einen Key aus Namespace und System-Id.
    pub fn new(namespace: &str, system_id: &str) -> Self {
        Self {
            namespace: Rc::from(namespace),
            system_id: Rc::from(system_id),
        }
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.namespace, self.system_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// parse(to_string) ist die Identität (Prefix ignoriert).
    #[test]
    fn roundtrip_display_parse() {
        let q = QName::with_prefix("http://example.org", "book", "bk");
        let parsed = QName::parse(&q.to_string()).unwrap();
        assert_eq!(parsed, q);
        assert!(parsed.prefix.is_none());
    }

    #[test]
    fn roundtrip_no_namespace() {
        let q = QName::new("", "book");
        assert_eq!(q.to_string(), "book");
        assert_eq!(QName::parse("book").unwrap(), q);
    }

    /// Unterschiedliche Prefixe ändern weder Gleichheit noch Hash.
    #[test]
    fn prefix_is_metadata_only() {
        let a = QName::with_prefix("http://example.org", "book", "a");
        let b = QName::with_prefix("http://example.org", "book", "b");
        let c = QName::new("http://example.org", "book");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.cmp(&b), Ordering::Equal);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    /// Fehlende schließende Klammer ist ein harter Formatfehler.
    #[test]
    fn unmatched_brace_is_error() {
        let err = QName::parse("{http://example.org-book").unwrap_err();
        assert!(matches!(err, Error::MalformedQName(_)));
    }

    #[test]
    fn ordering_local_name_first() {
        let a = QName::new("http://z.example", "alpha");
        let b = QName::new("http://a.example", "beta");
        assert!(a < b);
    }

    #[test]
    fn schema_key_equality() {
        let a = SchemaKey::new("http://example.org", "a.xsd");
        let b = SchemaKey::new("http://example.org", "a.xsd");
        let c = SchemaKey::new("http://example.org", "b.xsd");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
