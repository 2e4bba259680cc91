//! Die Collection: Registry aller geparsten Dokumente.
//!
//! Eine [`SchemaCollection`] besitzt alle [`XmlSchema`]-Dokumente, die
//! Pending-Tabelle für Vorwärts-Typ-Referenzen, den Auflösungs-Cache für
//! `(namespace, location, baseURI)`-Tripel und den Auflösungs-Stack, der
//! zyklische Includes erkennt. Bei Konstruktion wird die vollständige
//! XSD-Built-in-Datentyp-Hierarchie registriert, bevor irgendein
//! Nutzerdokument geparst wird.
//!
//! Jedes Dokument durchläuft die Zustände *unregistriert* → *in Auflösung*
//! (auf dem Stack) → *registriert* (gecacht); zurück nach „in Auflösung"
//! führt kein Weg, damit entsteht weder Doppelarbeit noch
//! Doppelregistrierung.
//!
//! Die Collection ist die einzige veränderliche geteilte Ressource: ein
//! Besitzer, keine nebenläufigen `read`-Aufrufe. Unabhängige Collections
//! teilen nichts miteinander.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};
use roxmltree::{Document, ParsingOptions};

use crate::FastHashMap;
use crate::builder::SchemaBuilder;
use crate::builtins;
use crate::error::{Error, Result};
use crate::extension::ExtensionRegistry;
use crate::qname::{QName, SchemaKey};
use crate::resolver::{FileResolver, SchemaResolver, combine_uri};
use crate::schema::{
    AttributeDecl, AttributeGroupDecl, ElementDecl, ModelGroupDecl, Notation, SchemaType,
    TypeSlot, XmlSchema, XS_NS,
};

/// Maximale Größe eines Schema-Dokuments (16 MiB).
const MAX_SCHEMA_SIZE: usize = 16 * 1024 * 1024;

// ============================================================================
// Validatoren
// ============================================================================

/// Prüft ein frisch gebautes Dokument, bevor es registriert wird.
///
/// `read` reicht den übergebenen Validator an jede verschachtelte
/// `import`/`include`/`redefine`-Auflösung durch, sodass jede Ebene die
/// Target-Namespace-Konsistenz gegen ihren Parent durchsetzen kann.
pub trait TargetNamespaceValidator {
    /// Gibt `Err` zurück, um die Registrierung des Dokuments abzubrechen.
    fn validate(&self, schema: &XmlSchema) -> Result<()>;
}

/// No-op-Validator für Aufrufer ohne eigene Konsistenzanforderungen.
#[derive(Debug, Default)]
pub struct AcceptAnyNamespace;

impl TargetNamespaceValidator for AcceptAnyNamespace {
    fn validate(&self, _schema: &XmlSchema) -> Result<()> {
        Ok(())
    }
}

/// Namespace-Erwartung eines `import`/`include`/`redefine`.
pub(crate) struct ExpectedNamespace {
    /// Das deklarierende Konstrukt, für die Fehlermeldung.
    pub(crate) construct: &'static str,
    /// Erwarteter Target Namespace (None = kein Namespace erwartet).
    pub(crate) expected: Option<String>,
    /// Ob ein Dokument ohne eigenen Target Namespace zulässig ist
    /// (Chameleon-Include: es erbt den des Parents).
    pub(crate) allow_inherit: bool,
}

impl ExpectedNamespace {
    fn check(&self, schema: &XmlSchema) -> Result<()> {
        let syntactic = schema.target_namespace();
        if self.allow_inherit && syntactic.is_none() {
            return Ok(());
        }
        let expected = self.expected.as_deref().unwrap_or("");
        let actual = syntactic.unwrap_or("");
        if expected != actual {
            return Err(Error::NamespaceMismatch {
                construct: self.construct,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

/// Kombination aus Namespace-Erwartung und durchgereichtem Nutzer-Validator.
pub(crate) struct NestedValidator<'a> {
    pub(crate) user: &'a dyn TargetNamespaceValidator,
    pub(crate) expect: ExpectedNamespace,
}

impl TargetNamespaceValidator for NestedValidator<'_> {
    fn validate(&self, schema: &XmlSchema) -> Result<()> {
        self.expect.check(schema)?;
        self.user.validate(schema)
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Cache-Schlüssel einer Auflösung: das volle Tripel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    namespace: String,
    location: String,
    base_uri: String,
}

/// Registry aller geparsten Schema-Dokumente einer Verarbeitungseinheit.
pub struct SchemaCollection {
    /// Registrierte Dokumente in Lese-Reihenfolge.
    schemas: Vec<Rc<XmlSchema>>,
    /// Dokumente nach [`SchemaKey`]; erzwingt die Key-Eindeutigkeit.
    schemas_by_key: FastHashMap<SchemaKey, Rc<XmlSchema>>,
    /// Auflösungs-Stack: Keys der gerade in Arbeit befindlichen Dokumente.
    resolution_stack: Vec<SchemaKey>,
    /// Memoisierte Auflösungen nach `(namespace, location, baseURI)`.
    resolved_cache: FastHashMap<ResolutionKey, Rc<XmlSchema>>,
    /// Out-of-band bereitgestellte Dokumente nach Namespace (Fallback, wenn
    /// der Resolver eine Location nicht liefern kann).
    known_schemas: FastHashMap<Rc<str>, Rc<XmlSchema>>,
    /// Global-Index aller benannten Typen (Built-ins und alle Dokumente,
    /// auch gerade in Arbeit befindliche).
    type_index: FastHashMap<Rc<QName>, Rc<SchemaType>>,
    /// Offene Typ-Referenzen: QName → wartende Slots. Wird bei jeder
    /// Typ-Registrierung für den betroffenen Namen geleert.
    pending_types: BTreeMap<Rc<QName>, Vec<TypeSlot>>,
    /// Injizierter Location-Resolver; der Kern macht selbst kein I/O.
    resolver: Box<dyn SchemaResolver>,
    /// Registry für fremde Attribute/Elemente.
    pub(crate) extensions: ExtensionRegistry,
    /// Basis-URI für per `read` gelesene Dokumente.
    base_uri: Option<Rc<str>>,
}

impl SchemaCollection {
    /// Collection mit Dateisystem-Resolver.
    ///
    /// Registriert beim Aufbau die vollständige Built-in-Datentyp-Hierarchie
    /// (XSD 1.0 Part 2 §3): Nutzerdokumente dürfen diese Typen sofort
    /// referenzieren und einschränken.
    pub fn new() -> Self {
        Self::with_resolver(Box::new(FileResolver))
    }

    /// Collection mit injiziertem Resolver.
    pub fn with_resolver(resolver: Box<dyn SchemaResolver>) -> Self {
        let mut collection = Self {
            schemas: Vec::new(),
            schemas_by_key: FastHashMap::default(),
            resolution_stack: Vec::new(),
            resolved_cache: FastHashMap::default(),
            known_schemas: FastHashMap::default(),
            type_index: FastHashMap::default(),
            pending_types: BTreeMap::new(),
            resolver,
            extensions: ExtensionRegistry::new(),
            base_uri: None,
        };
        builtins::register_builtin_schema(&mut collection);
        collection
    }

    /// Ersetzt den Resolver.
    pub fn set_resolver(&mut self, resolver: Box<dyn SchemaResolver>) {
        self.resolver = resolver;
    }

    /// Basis-URI für nachfolgend per [`Self::read`] gelesene Dokumente.
    pub fn set_base_uri(&mut self, base_uri: &str) {
        self.base_uri = Some(Rc::from(base_uri));
    }

    /// Hinterlegt ein out-of-band bereitgestelltes Dokument für einen
    /// Namespace (Seitenkanal für z.B. eingebettete Schemas).
    pub fn add_known_schema(&mut self, namespace: &str, schema: Rc<XmlSchema>) {
        self.known_schemas.insert(Rc::from(namespace), schema);
    }

    /// Zugriff auf die Extension-Registry (Handler-Registrierung).
    pub fn extensions_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.extensions
    }

    // ------------------------------------------------------------------------
    // Lesen und Registrieren
    // ------------------------------------------------------------------------

    /// Parsed ein Dokument aus rohem XSD-Text und registriert es.
    ///
    /// # Beispiel
    ///
    /// ```
    /// use xsom::SchemaCollection;
    ///
    /// let xsd = r#"
    ///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    ///                targetNamespace="http://example.org/books">
    ///         <xs:element name="book" type="xs:string"/>
    ///     </xs:schema>
    /// "#;
    ///
    /// let mut collection = SchemaCollection::new();
    /// let schema = collection.read(xsd).unwrap();
    /// assert_eq!(schema.elements().len(), 1);
    /// ```
    pub fn read(&mut self, content: &str) -> Result<Rc<XmlSchema>> {
        self.read_with_validator(content, &AcceptAnyNamespace)
    }

    /// Wie [`Self::read`], mit durchgereichtem Validator.
    pub fn read_with_validator(
        &mut self,
        content: &str,
        validator: &dyn TargetNamespaceValidator,
    ) -> Result<Rc<XmlSchema>> {
        let base = self.base_uri.clone();
        self.build_and_register(content, base.as_deref(), None, validator)
    }

    /// Wie [`Self::read`], mit expliziter System-Id für den [`SchemaKey`]
    /// (und als Basis für relative `schemaLocation`-Auflösung).
    pub fn read_with_system_id(
        &mut self,
        content: &str,
        system_id: &str,
        validator: &dyn TargetNamespaceValidator,
    ) -> Result<Rc<XmlSchema>> {
        self.build_and_register(content, Some(system_id), None, validator)
    }

    /// Parsed und registriert ein Dokument; der eigene Key liegt während des
    /// Baus auf dem Auflösungs-Stack (Zyklus-Schutz).
    fn build_and_register(
        &mut self,
        content: &str,
        system_id: Option<&str>,
        inherited_namespace: Option<&str>,
        validator: &dyn TargetNamespaceValidator,
    ) -> Result<Rc<XmlSchema>> {
        if content.len() > MAX_SCHEMA_SIZE {
            return Err(Error::XmlParse(format!(
                "schema document too large: {} bytes (max {} bytes)",
                content.len(),
                MAX_SCHEMA_SIZE
            )));
        }

        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let document = Document::parse_with_options(content, options)
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        let root = document.root_element();
        if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XS_NS) {
            return Err(Error::SchemaStructure(
                "root element must be xs:schema".to_string(),
            ));
        }

        let logical = root
            .attribute("targetNamespace")
            .or(inherited_namespace)
            .unwrap_or("");
        let key = SchemaKey::new(logical, system_id.unwrap_or(""));

        self.resolution_stack.push(key);
        let built = SchemaBuilder::build(
            self,
            root,
            content,
            system_id,
            inherited_namespace,
            validator,
        );
        self.resolution_stack.pop();

        let schema = built?;
        validator.validate(&schema)?;
        self.register(schema)
    }

    /// Registriert ein fertig gebautes Dokument; der [`SchemaKey`] muss in
    /// dieser Collection eindeutig sein.
    fn register(&mut self, schema: XmlSchema) -> Result<Rc<XmlSchema>> {
        let key = schema.schema_key();
        if self.schemas_by_key.contains_key(&key) {
            return Err(Error::DuplicateSchema {
                namespace: key.namespace.to_string(),
                system_id: key.system_id.to_string(),
            });
        }
        debug!("registered schema {key}");
        let schema = Rc::new(schema);
        self.schemas.push(schema.clone());
        self.schemas_by_key.insert(key, schema.clone());
        Ok(schema)
    }

    /// Registriert ein Dokument ohne Key-Prüfung (nur Bootstrap).
    pub(crate) fn insert_schema(&mut self, schema: XmlSchema) -> Rc<XmlSchema> {
        let key = schema.schema_key();
        let schema = Rc::new(schema);
        self.schemas.push(schema.clone());
        self.schemas_by_key.insert(key, schema.clone());
        schema
    }

    // ------------------------------------------------------------------------
    // Dokumentübergreifende Auflösung
    // ------------------------------------------------------------------------

    /// Löst ein `import`/`include`/`redefine`-Ziel zu einem Dokument auf.
    ///
    /// Reihenfolge: (1) Cache-Treffer für das Tripel; (2) injizierter
    /// Resolver, bei Fehlschlag die Known-Schema-Tabelle; (3) Zyklus-Check
    /// gegen den Auflösungs-Stack; (4) rekursiver Bau mit `validator`;
    /// (5) Ergebnis cachen. `Ok(None)` heißt: Location nicht auflösbar oder
    /// Zyklus — beides überlässt dem Aufrufer die Entscheidung, nie ein
    /// halbfertiges Dokument.
    pub(crate) fn resolve_xml_schema(
        &mut self,
        target_namespace: Option<&str>,
        schema_location: &str,
        base_uri: Option<&str>,
        inherited_namespace: Option<&str>,
        validator: &dyn TargetNamespaceValidator,
    ) -> Result<Option<Rc<XmlSchema>>> {
        let cache_key = ResolutionKey {
            namespace: target_namespace.unwrap_or("").to_string(),
            location: schema_location.to_string(),
            base_uri: base_uri.unwrap_or("").to_string(),
        };
        if let Some(cached) = self.resolved_cache.get(&cache_key) {
            debug!("resolution cache hit for '{schema_location}'");
            return Ok(Some(cached.clone()));
        }

        let Some(content) =
            self.resolver
                .resolve_entity(target_namespace, schema_location, base_uri)
        else {
            warn!("cannot resolve '{schema_location}', trying known schemas");
            let fallback =
                target_namespace.and_then(|ns| self.known_schemas.get(ns).cloned());
            return Ok(fallback);
        };

        // Target Namespace vorab lesen: der SchemaKey wird für Zyklus- und
        // Bereits-registriert-Checks vor dem eigentlichen Bau gebraucht.
        let system_id = combine_uri(base_uri, schema_location);
        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let probe = Document::parse_with_options(&content, options)
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        let logical = probe
            .root_element()
            .attribute("targetNamespace")
            .or(inherited_namespace)
            .unwrap_or("")
            .to_string();
        drop(probe);

        let key = SchemaKey::new(&logical, &system_id);
        if self.resolution_stack.contains(&key) {
            debug!("cyclic reference to {key}, skipping re-entry");
            return Ok(None);
        }
        if let Some(existing) = self.schemas_by_key.get(&key) {
            let existing = existing.clone();
            self.resolved_cache.insert(cache_key, existing.clone());
            return Ok(Some(existing));
        }

        let schema = self.build_and_register(
            &content,
            Some(&system_id),
            inherited_namespace,
            validator,
        )?;
        self.resolved_cache.insert(cache_key, schema.clone());
        Ok(Some(schema))
    }

    // ------------------------------------------------------------------------
    // Typ-Index und Pending Receiver
    // ------------------------------------------------------------------------

    /// Löst eine Typ-Referenz auf: sofortige Zuweisung bei Treffer im
    /// Global-Index, sonst wird der Slot als Pending Receiver eingereiht.
    pub(crate) fn request_type(&mut self, name: &Rc<QName>, slot: &TypeSlot) {
        if let Some(ty) = self.type_index.get(name) {
            slot.assign(ty.clone());
        } else {
            self.pending_types
                .entry(name.clone())
                .or_default()
                .push(slot.clone());
        }
    }

    /// Registriert eine benannte Typdefinition im Global-Index und befüllt
    /// alle auf diesen Namen wartenden Slots.
    pub(crate) fn register_type(&mut self, name: Rc<QName>, ty: Rc<SchemaType>) {
        if let Some(waiting) = self.pending_types.remove(&name) {
            debug!("satisfying {} pending receivers for {name}", waiting.len());
            for slot in waiting {
                slot.assign(ty.clone());
            }
        }
        self.type_index.insert(name, ty);
    }

    /// Known-Schema-Lookup für `import` ohne `schemaLocation`.
    pub(crate) fn known_schema(&self, namespace: &str) -> Option<Rc<XmlSchema>> {
        self.known_schemas.get(namespace).cloned()
    }

    // ------------------------------------------------------------------------
    // Globale Lookups
    // ------------------------------------------------------------------------

    /// Registrierte Dokumente in Lese-Reihenfolge.
    pub fn schemas(&self) -> &[Rc<XmlSchema>] {
        &self.schemas
    }

    /// Dokument-Lookup per [`SchemaKey`].
    pub fn schema_by_key(&self, key: &SchemaKey) -> Option<&Rc<XmlSchema>> {
        self.schemas_by_key.get(key)
    }

    fn documents_in_namespace<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a Rc<XmlSchema>> {
        // Linear über alle Dokumente: Collections enthalten Dutzende
        // Dokumente, keine Millionen.
        self.schemas
            .iter()
            .filter(move |s| s.logical_target_namespace() == namespace)
    }

    /// Typ-Lookup über alle registrierten Dokumente.
    pub fn get_type_by_qname(&self, name: &QName) -> Option<Rc<SchemaType>> {
        self.documents_in_namespace(&name.uri)
            .find_map(|s| s.get_type(name).cloned())
    }

    /// Element-Lookup über alle registrierten Dokumente.
    pub fn get_element_by_qname(&self, name: &QName) -> Option<Rc<ElementDecl>> {
        self.documents_in_namespace(&name.uri)
            .find_map(|s| s.get_element(name).cloned())
    }

    /// Attribut-Lookup über alle registrierten Dokumente.
    pub fn get_attribute_by_qname(&self, name: &QName) -> Option<Rc<AttributeDecl>> {
        self.documents_in_namespace(&name.uri)
            .find_map(|s| s.get_attribute(name).cloned())
    }

    /// Group-Lookup über alle registrierten Dokumente.
    pub fn get_group_by_qname(&self, name: &QName) -> Option<Rc<ModelGroupDecl>> {
        self.documents_in_namespace(&name.uri)
            .find_map(|s| s.get_group(name).cloned())
    }

    /// Attribute-Group-Lookup über alle registrierten Dokumente.
    pub fn get_attribute_group_by_qname(&self, name: &QName) -> Option<Rc<AttributeGroupDecl>> {
        self.documents_in_namespace(&name.uri)
            .find_map(|s| s.get_attribute_group(name).cloned())
    }

    /// Notation-Lookup über alle registrierten Dokumente.
    pub fn get_notation_by_qname(&self, name: &QName) -> Option<Rc<Notation>> {
        self.documents_in_namespace(&name.uri)
            .find_map(|s| s.get_notation(name).cloned())
    }
}

impl Default for SchemaCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCollection")
            .field("schemas", &self.schemas.len())
            .field("cached_resolutions", &self.resolved_cache.len())
            .field("pending_types", &self.pending_types.len())
            .finish()
    }
}
