//! xsom – XML Schema (XSD) Objektmodell in Rust
//!
//! Ein rekursiver Schema-Loader, der XSD-Dokumente in ein vollständig
//! verlinktes, abfragbares Objektmodell überführt: Dokumente, Typen,
//! Particles, Attribute, Facets, Identity Constraints. Die
//! [`SchemaCollection`] besitzt alle geparsten Dokumente, löst
//! dokumentübergreifende Referenzen (`import`/`include`/`redefine`) auf,
//! memoisiert bereits geparste Dokumente, erkennt zyklische Includes und
//! registriert beim Aufbau die komplette Built-in-Datentyp-Hierarchie.
//!
//! Das Modell wird einmal pro `read` gebaut und ist danach aus
//! Konsumentensicht unveränderlich; Validierung von Instanzdokumenten ist
//! nicht Teil dieser Crate.
//!
//! # Beispiel
//!
//! ```
//! use xsom::{QName, SchemaCollection};
//!
//! let xsd = r#"
//!     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
//!                xmlns:tns="http://example.org/books"
//!                targetNamespace="http://example.org/books">
//!         <xs:element name="book" type="tns:BookType"/>
//!         <xs:complexType name="BookType">
//!             <xs:sequence>
//!                 <xs:element name="title" type="xs:string"/>
//!             </xs:sequence>
//!         </xs:complexType>
//!     </xs:schema>
//! "#;
//!
//! let mut collection = SchemaCollection::new();
//! let schema = collection.read(xsd).unwrap();
//!
//! let book = schema
//!     .get_element(&QName::new("http://example.org/books", "book"))
//!     .unwrap();
//! let book_type = book.resolved_type().unwrap();
//! assert!(book_type.is_complex());
//! ```

mod builder;
mod builtins;
pub mod collection;
pub mod error;
pub mod extension;
pub mod qname;
pub mod resolver;
pub mod schema;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent — für interne
/// Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (Einfügereihenfolge + schnelles Hashing — für die
/// benannten Registries der Dokumente).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Namen und Dokument-Identitäten
pub use qname::{QName, SchemaKey};

// Public API: Collection
pub use collection::{AcceptAnyNamespace, SchemaCollection, TargetNamespaceValidator};

// Public API: Objektmodell
pub use schema::{
    AttributeDecl, AttributeEntry, AttributeGroupDecl, AttributeGroupRef, AttributeUse,
    ComplexType, Compositor, ContentDerivation, ContentExtension, ContentModel, ContentModelKind,
    ContentRestriction, ElementDecl, Facet, FacetKind, Form, GroupRef, IdentityConstraint,
    IdentityConstraintKind, MaxOccurs, ModelGroup, ModelGroupDecl, NamespaceConstraint, Notation,
    ObjectMeta, Particle, ParticleTerm, ProcessContents, SchemaImport, SchemaInclude, SchemaItem,
    SchemaRedefine, SchemaType, SimpleType, SimpleTypeContent, TypeKind, TypeSlot, Wildcard,
    XmlSchema, XS_NS,
};

// Public API: Resolver und Extensions
pub use extension::{ExtensionDeserializer, ExtensionRegistry, MetadataBucketHandler};
pub use resolver::{FileResolver, MapResolver, SchemaResolver};
