//! Schema-Objektmodell: die geparsten XSD-Konstrukte.
//!
//! Dieses Modul stellt die Datenträger bereit, die der Builder aus einem
//! Element-Baum instanziiert: Dokumente ([`XmlSchema`]), Typen
//! ([`SchemaType`]), Particles, Attribute, Content Models, Facets,
//! Identity Constraints, Notations und externe Referenzen.
//!
//! Das Modell ist als kleine Menge getaggter Varianten aufgebaut
//! (Typ-Art, Particle-Art, Content-Art), jede mit einem gemeinsamen
//! annotierbaren Payload ([`ObjectMeta`]) per Komposition. Nach dem Bau
//! eines Dokuments ist das Modell aus Konsumentensicht unveränderlich;
//! nur offene Typ-Referenzen ([`TypeSlot`]) werden von der Collection
//! nachträglich vervollständigt, wenn spätere Dokumente die fehlenden
//! Definitionen liefern.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::FastIndexMap;
use crate::qname::{QName, SchemaKey};

/// XML Schema Namespace (XSD 1.0 Part 1 §2.6).
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

// ============================================================================
// Annotierbarer Payload
// ============================================================================

/// Gemeinsamer Payload aller annotierbaren Schema-Objekte.
///
/// Trägt `id`, die Quellposition (Byte-Offset im Eingabetext) sowie die
/// beiden Metadaten-Buckets für fremde Attribute und Elemente, die der
/// Extension-Mechanismus befüllt.
#[derive(Debug, Clone, Default)]
pub struct ObjectMeta {
    /// Wert des `id`-Attributs, falls vorhanden.
    pub id: Option<Rc<str>>,
    /// Byte-Offset des Konstrukts im Quelltext.
    pub source_offset: Option<usize>,
    /// Text aller `xs:documentation`-Kinder der Annotation.
    pub documentation: Vec<String>,
    /// Roh-Text aller `xs:appinfo`-Kinder der Annotation.
    pub app_info: Vec<String>,
    /// Fremde (nicht-XSD) Attribute, roh nach QName abgelegt.
    pub external_attributes: BTreeMap<QName, String>,
    /// Fremde (nicht-XSD) Kind-Elemente, roh nach QName abgelegt.
    pub external_elements: BTreeMap<QName, String>,
}

// ============================================================================
// Deferred Type Resolution
// ============================================================================

/// Zuweisungs-Slot für eine per QName referenzierte Typdefinition.
///
/// Ein Slot ist entweder aufgelöst (Typ vorhanden) oder offen (der QName
/// wartet in der Pending-Tabelle der Collection) — nie stillschweigend
/// abwesend. Klone teilen denselben Zustand; die Collection hält Klone
/// offener Slots und befüllt sie, sobald der Typ irgendwo registriert wird.
#[derive(Clone, Default)]
pub struct TypeSlot(Rc<RefCell<Option<Rc<SchemaType>>>>);

impl TypeSlot {
    /// Erstellt einen offenen Slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Der aufgelöste Typ, falls der Slot bereits befüllt wurde.
    pub fn get(&self) -> Option<Rc<SchemaType>> {
        self.0.borrow().clone()
    }

    /// Ob der Slot bereits aufgelöst ist.
    pub fn is_resolved(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Befüllt den Slot. Eine spätere Zuweisung überschreibt die frühere
    /// (Redefine-Semantik: die letzte Registrierung gewinnt).
    pub(crate) fn assign(&self, ty: Rc<SchemaType>) {
        *self.0.borrow_mut() = Some(ty);
    }
}

impl fmt::Debug for TypeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Absichtlich flach: der Slot kann Zyklen in den Typgraphen schließen.
        match self.0.borrow().as_ref() {
            Some(ty) => write!(f, "TypeSlot(resolved: {:?})", ty.name),
            None => write!(f, "TypeSlot(pending)"),
        }
    }
}

// ============================================================================
// Formen, Occurs, Compositor
// ============================================================================

/// Form lokaler Deklarationen (XSD 1.0 Part 1 §3.3.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Form {
    /// Lokale Namen sind nicht namespace-qualifiziert.
    #[default]
    Unqualified,
    /// Lokale Namen liegen im Target Namespace.
    Qualified,
}

/// Obere Occurs-Schranke eines Particles (XSD 1.0 Part 1 §3.9).
///
/// `unbounded` ist ein eigener Sentinel-Wert, kein mit echten großen
/// Zählern geteiltes Literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    /// Endliche obere Schranke.
    Bounded(u64),
    /// `maxOccurs="unbounded"`.
    Unbounded,
}

impl MaxOccurs {
    /// Ob die Schranke `unbounded` ist.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl Default for MaxOccurs {
    fn default() -> Self {
        Self::Bounded(1)
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Compositor einer Model Group (XSD 1.0 Part 1 §3.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    /// `xs:sequence` — geordnete Kinder.
    Sequence,
    /// `xs:choice` — genau eine Alternative.
    Choice,
    /// `xs:all` — alle Kinder, Reihenfolge frei.
    All,
}

// ============================================================================
// Wildcards
// ============================================================================

/// Namespace-Constraint eines Wildcards (XSD 1.0 Part 1 §3.10.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceConstraint {
    /// `##any` — jeder Namespace.
    Any,
    /// `##other` — jeder Namespace außer dem Target Namespace.
    Other,
    /// Explizite Namespace-Liste; `##targetNamespace` und `##local` sind
    /// bereits zum konkreten bzw. leeren Namespace aufgelöst.
    List(Vec<Rc<str>>),
}

/// processContents-Modus eines Wildcards (XSD 1.0 Part 1 §3.10.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessContents {
    /// Volle Validierung gegen deklarierte Komponenten.
    #[default]
    Strict,
    /// Validierung wenn Deklaration auffindbar.
    Lax,
    /// Keine Validierung.
    Skip,
}

/// Element- oder Attribut-Wildcard (`xs:any` / `xs:anyAttribute`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    /// Erlaubte Namespaces.
    pub namespace_constraint: NamespaceConstraint,
    /// Validierungsmodus für getroffene Inhalte.
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// Wildcard das jeden Namespace lax akzeptiert.
    pub fn lax_any() -> Self {
        Self {
            namespace_constraint: NamespaceConstraint::Any,
            process_contents: ProcessContents::Lax,
        }
    }
}

// ============================================================================
// Facets
// ============================================================================

/// Art eines einschränkenden Facets (XSD 1.0 Part 2 §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    Length,
    MinLength,
    MaxLength,
    Pattern,
    Enumeration,
    WhiteSpace,
    MinInclusive,
    MaxInclusive,
    MinExclusive,
    MaxExclusive,
    TotalDigits,
    FractionDigits,
}

impl FacetKind {
    /// Dispatch über den Local-Name des Facet-Elements.
    pub fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "length" => Self::Length,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "pattern" => Self::Pattern,
            "enumeration" => Self::Enumeration,
            "whiteSpace" => Self::WhiteSpace,
            "minInclusive" => Self::MinInclusive,
            "maxInclusive" => Self::MaxInclusive,
            "minExclusive" => Self::MinExclusive,
            "maxExclusive" => Self::MaxExclusive,
            "totalDigits" => Self::TotalDigits,
            "fractionDigits" => Self::FractionDigits,
            _ => return None,
        })
    }

    /// Der XSD-Elementname des Facets.
    pub fn local_name(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::Enumeration => "enumeration",
            Self::WhiteSpace => "whiteSpace",
            Self::MinInclusive => "minInclusive",
            Self::MaxInclusive => "maxInclusive",
            Self::MinExclusive => "minExclusive",
            Self::MaxExclusive => "maxExclusive",
            Self::TotalDigits => "totalDigits",
            Self::FractionDigits => "fractionDigits",
        }
    }
}

/// Ein einschränkendes Facet mit Wert und `fixed`-Flag.
///
/// `fixed="true"` verbietet abgeleiteten Typen, das Facet weiter zu
/// verändern (XSD 1.0 Part 2 §4.3).
#[derive(Debug, Clone)]
pub struct Facet {
    /// Art des Facets.
    pub kind: FacetKind,
    /// Der Facet-Wert, unverändert wie geschrieben.
    pub value: Rc<str>,
    /// Ob das Facet fixiert ist.
    pub fixed: bool,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

impl Facet {
    /// Erstellt ein Facet ohne Annotation.
    pub fn new(kind: FacetKind, value: &str, fixed: bool) -> Self {
        Self {
            kind,
            value: Rc::from(value),
            fixed,
            meta: ObjectMeta::default(),
        }
    }
}

// ============================================================================
// Identity Constraints
// ============================================================================

/// Art eines Identity Constraints (XSD 1.0 Part 1 §3.11).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityConstraintKind {
    /// `xs:unique`.
    Unique,
    /// `xs:key`.
    Key,
    /// `xs:keyref` mit dem referenzierten key/unique Constraint.
    KeyRef {
        /// QName des referenzierten Constraints.
        refer: Rc<QName>,
    },
}

/// Ein Identity Constraint: Selector-XPath plus Feld-XPaths.
#[derive(Debug, Clone)]
pub struct IdentityConstraint {
    /// Name des Constraints im Target Namespace.
    pub name: Rc<QName>,
    /// Art (unique / key / keyref).
    pub kind: IdentityConstraintKind,
    /// XPath des `xs:selector`-Kinds.
    pub selector: Rc<str>,
    /// XPaths der `xs:field`-Kinder (mindestens eines).
    pub fields: Vec<Rc<str>>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

// ============================================================================
// Elemente und Attribute
// ============================================================================

/// Eine Element-Deklaration (global oder lokal, Name oder Ref).
///
/// Der Schema-Typ hängt an einem [`TypeSlot`]: bei `type="…"` befüllt ihn
/// die Collection (sofort oder nachträglich), bei Inline-Typen sofort der
/// Builder. Ein Ref-Element trägt nur `ref_name`.
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Qualifizierter Name (None bei reinen Ref-Particles).
    pub name: Option<Rc<QName>>,
    /// Referenz auf ein globales Element (`ref="…"`).
    pub ref_name: Option<Rc<QName>>,
    /// QName des deklarierten Typs (`type="…"`).
    pub type_name: Option<Rc<QName>>,
    /// Anonyme Inline-Typdefinition, falls vorhanden.
    pub inline_type: Option<Rc<SchemaType>>,
    /// Aufgelöster Schema-Typ (deklariert oder inline).
    pub schema_type: TypeSlot,
    /// `nillable="true"`.
    pub nillable: bool,
    /// `abstract="true"` — nur auf globalen Elementen sinnvoll.
    pub is_abstract: bool,
    /// Kopf der Substitution Group (nur globale Elemente,
    /// XSD 1.0 Part 1 §3.3.6).
    pub substitution_group: Option<Rc<QName>>,
    /// `default`-Wert.
    pub default_value: Option<Rc<str>>,
    /// `fixed`-Wert.
    pub fixed_value: Option<Rc<str>>,
    /// Explizites `form`-Attribut (None = Schema-Default).
    pub form: Option<Form>,
    /// `block`-Attribut, wie geschrieben.
    pub block: Option<Rc<str>>,
    /// `final`-Attribut, wie geschrieben.
    pub final_: Option<Rc<str>>,
    /// Identity Constraints (`xs:unique` / `xs:key` / `xs:keyref`).
    pub identity_constraints: Vec<IdentityConstraint>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

impl ElementDecl {
    /// Erstellt eine leere Deklaration mit Namen.
    pub(crate) fn named(name: Rc<QName>) -> Self {
        Self {
            name: Some(name),
            ref_name: None,
            type_name: None,
            inline_type: None,
            schema_type: TypeSlot::new(),
            nillable: false,
            is_abstract: false,
            substitution_group: None,
            default_value: None,
            fixed_value: None,
            form: None,
            block: None,
            final_: None,
            identity_constraints: Vec::new(),
            meta: ObjectMeta::default(),
        }
    }

    /// Der effektive Name: Deklarationsname oder Ref-Ziel.
    pub fn qname(&self) -> Option<&Rc<QName>> {
        self.name.as_ref().or(self.ref_name.as_ref())
    }

    /// Der aufgelöste Schema-Typ, falls bereits bekannt.
    pub fn resolved_type(&self) -> Option<Rc<SchemaType>> {
        self.schema_type.get()
    }
}

/// Verwendung eines Attributs (XSD 1.0 Part 1 §3.2.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttributeUse {
    /// Darf fehlen.
    #[default]
    Optional,
    /// Muss vorhanden sein.
    Required,
    /// Darf nicht vorhanden sein.
    Prohibited,
}

/// Eine Attribut-Deklaration (global oder lokal, Name oder Ref).
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Qualifizierter Name (None bei reinen Refs).
    pub name: Option<Rc<QName>>,
    /// Referenz auf ein globales Attribut (`ref="…"`).
    pub ref_name: Option<Rc<QName>>,
    /// QName des deklarierten Typs.
    pub type_name: Option<Rc<QName>>,
    /// Anonymer Inline-Simple-Type.
    pub inline_type: Option<Rc<SchemaType>>,
    /// Aufgelöster Schema-Typ.
    pub schema_type: TypeSlot,
    /// required / optional / prohibited.
    pub use_: AttributeUse,
    /// `default`-Wert.
    pub default_value: Option<Rc<str>>,
    /// `fixed`-Wert.
    pub fixed_value: Option<Rc<str>>,
    /// Explizites `form`-Attribut.
    pub form: Option<Form>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

impl AttributeDecl {
    pub(crate) fn named(name: Rc<QName>) -> Self {
        Self {
            name: Some(name),
            ref_name: None,
            type_name: None,
            inline_type: None,
            schema_type: TypeSlot::new(),
            use_: AttributeUse::Optional,
            default_value: None,
            fixed_value: None,
            form: None,
            meta: ObjectMeta::default(),
        }
    }

    /// Der effektive Name: Deklarationsname oder Ref-Ziel.
    pub fn qname(&self) -> Option<&Rc<QName>> {
        self.name.as_ref().or(self.ref_name.as_ref())
    }

    /// Der aufgelöste Schema-Typ, falls bereits bekannt.
    pub fn resolved_type(&self) -> Option<Rc<SchemaType>> {
        self.schema_type.get()
    }
}

/// Referenz auf eine benannte Attribute Group.
#[derive(Clone)]
pub struct AttributeGroupRef {
    /// QName der referenzierten Group.
    pub ref_name: Rc<QName>,
    /// Aufgelöste Group; None solange (noch) unaufgelöst.
    pub resolved: RefCell<Option<Rc<AttributeGroupDecl>>>,
}

impl fmt::Debug for AttributeGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Flach — aufgelöste Groups können rekursiv aufeinander verweisen.
        write!(
            f,
            "AttributeGroupRef({}, resolved: {})",
            self.ref_name,
            self.resolved.borrow().is_some()
        )
    }
}

/// Eintrag einer Attributliste: direktes Attribut oder Group-Referenz.
#[derive(Debug, Clone)]
pub enum AttributeEntry {
    /// Direkte Attribut-Deklaration.
    Attribute(Rc<AttributeDecl>),
    /// Referenz auf eine benannte Attribute Group.
    GroupRef(AttributeGroupRef),
}

/// Eine benannte Attribute Group (top-level) bzw. ihr anonymer Inhalt.
#[derive(Debug, Clone)]
pub struct AttributeGroupDecl {
    /// Name (None nur für den Redefine-Zwischenzustand).
    pub name: Option<Rc<QName>>,
    /// Attribute und verschachtelte Group-Referenzen.
    pub attributes: Vec<AttributeEntry>,
    /// Optionales `xs:anyAttribute`-Wildcard.
    pub any_attribute: Option<Wildcard>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

// ============================================================================
// Particles
// ============================================================================

/// Ein Content-Model-Knoten mit Occurs-Schranken (XSD 1.0 Part 1 §3.9).
#[derive(Debug, Clone)]
pub struct Particle {
    /// Untere Schranke; Default 1.
    pub min_occurs: u64,
    /// Obere Schranke; Default 1.
    pub max_occurs: MaxOccurs,
    /// Der Term des Particles.
    pub term: ParticleTerm,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

/// Term-Varianten eines Particles.
#[derive(Debug, Clone)]
pub enum ParticleTerm {
    /// Element-Deklaration oder Element-Referenz.
    Element(Rc<ElementDecl>),
    /// `xs:any`-Wildcard.
    Any(Wildcard),
    /// Anonyme Model Group (`sequence` / `choice` / `all`).
    Group(ModelGroup),
    /// Referenz auf eine benannte top-level Group.
    GroupRef(GroupRef),
}

/// Anonyme Model Group: Compositor plus Kind-Particles.
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// sequence / choice / all.
    pub compositor: Compositor,
    /// Kind-Particles in Dokumentreihenfolge.
    pub particles: Vec<Rc<Particle>>,
}

/// Referenz auf eine benannte top-level Group (`xs:group ref="…"`).
#[derive(Clone)]
pub struct GroupRef {
    /// QName der referenzierten Group.
    pub ref_name: Rc<QName>,
    /// Aufgelöste Group-Definition; None solange (noch) unaufgelöst.
    pub resolved: RefCell<Option<Rc<ModelGroupDecl>>>,
}

impl GroupRef {
    /// Das Particle der referenzierten Group, falls aufgelöst.
    pub fn particle(&self) -> Option<Rc<Particle>> {
        self.resolved.borrow().as_ref().map(|g| g.particle.clone())
    }
}

impl fmt::Debug for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Flach — eine Group kann sich (fehlerhaft) selbst referenzieren.
        write!(
            f,
            "GroupRef({}, resolved: {})",
            self.ref_name,
            self.resolved.borrow().is_some()
        )
    }
}

/// Eine benannte top-level Group-Definition.
#[derive(Debug, Clone)]
pub struct ModelGroupDecl {
    /// Name der Group.
    pub name: Rc<QName>,
    /// Das eine sequence/choice/all-Particle der Group.
    pub particle: Rc<Particle>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

// ============================================================================
// Typen
// ============================================================================

/// Eine Typdefinition: benannt oder anonym, simple oder complex.
#[derive(Debug, Clone)]
pub struct SchemaType {
    /// QName (None für anonyme Typen).
    pub name: Option<Rc<QName>>,
    /// Simple- oder Complex-Variante.
    pub kind: TypeKind,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

/// Die beiden Typ-Arten.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Simple Type (XSD 1.0 Part 2).
    Simple(SimpleType),
    /// Complex Type (XSD 1.0 Part 1 §3.4).
    Complex(ComplexType),
}

impl SchemaType {
    /// Ob dies ein Simple Type ist.
    pub fn is_simple(&self) -> bool {
        matches!(self.kind, TypeKind::Simple(_))
    }

    /// Ob dies ein Complex Type ist.
    pub fn is_complex(&self) -> bool {
        matches!(self.kind, TypeKind::Complex(_))
    }

    /// Das Content-Particle eines Complex Types.
    pub fn particle(&self) -> Option<&Rc<Particle>> {
        match &self.kind {
            TypeKind::Complex(c) => c.particle.as_ref(),
            TypeKind::Simple(_) => None,
        }
    }

    /// Die direkte Attributliste eines Complex Types.
    pub fn attributes(&self) -> &[AttributeEntry] {
        match &self.kind {
            TypeKind::Complex(c) => &c.attributes,
            TypeKind::Simple(_) => &[],
        }
    }

    /// Das Content Model eines Complex Types.
    pub fn content_model(&self) -> Option<&ContentModel> {
        match &self.kind {
            TypeKind::Complex(c) => c.content_model.as_ref(),
            TypeKind::Simple(_) => None,
        }
    }

    /// Die Facet-Liste einer Simple-Type-Restriction.
    pub fn facets(&self) -> &[Facet] {
        match &self.kind {
            TypeKind::Simple(s) => match &s.content {
                Some(SimpleTypeContent::Restriction { facets, .. }) => facets,
                _ => &[],
            },
            TypeKind::Complex(_) => &[],
        }
    }

    /// QName des Restriction-Base-Typs (nur Simple Types).
    pub fn base_type_name(&self) -> Option<&Rc<QName>> {
        match &self.kind {
            TypeKind::Simple(s) => match &s.content {
                Some(SimpleTypeContent::Restriction { base, .. }) => base.as_ref(),
                _ => None,
            },
            TypeKind::Complex(_) => None,
        }
    }

    /// Aufgelöster Restriction-Base-Typ (nur Simple Types).
    pub fn base_type(&self) -> Option<Rc<SchemaType>> {
        match &self.kind {
            TypeKind::Simple(s) => match &s.content {
                Some(SimpleTypeContent::Restriction { base_type, .. }) => base_type.get(),
                _ => None,
            },
            TypeKind::Complex(_) => None,
        }
    }
}

/// Inhalt eines Simple Types: genau eine der drei Varianten
/// (XSD 1.0 Part 2 §4.1.2).
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// restriction / list / union; None bei den Ur-Typen.
    pub content: Option<SimpleTypeContent>,
}

/// Die drei Ableitungsarten eines Simple Types.
#[derive(Debug, Clone)]
pub enum SimpleTypeContent {
    /// Einschränkung eines Base-Typs über Facets.
    Restriction {
        /// QName des Base-Typs (None bei Inline-Base).
        base: Option<Rc<QName>>,
        /// Aufgelöster Base-Typ.
        base_type: TypeSlot,
        /// Anonymer Inline-Base-Typ.
        inline_base: Option<Rc<SchemaType>>,
        /// Facets in Dokumentreihenfolge.
        facets: Vec<Facet>,
    },
    /// Whitespace-separierte Liste eines Item-Typs.
    List {
        /// QName des Item-Typs (`itemType="…"`).
        item_type: Option<Rc<QName>>,
        /// Anonymer Inline-Item-Typ.
        inline_item: Option<Rc<SchemaType>>,
    },
    /// Vereinigung mehrerer Member-Typen.
    Union {
        /// QNames der Member-Typen (`memberTypes="…"`).
        member_types: Vec<Rc<QName>>,
        /// Anonyme Inline-Member.
        inline_members: Vec<Rc<SchemaType>>,
    },
}

/// Ein Complex Type: Particle-Baum, Attribute, optionales Content Model.
#[derive(Debug, Clone, Default)]
pub struct ComplexType {
    /// Content-Particle (sequence/choice/all/group-ref).
    pub particle: Option<Rc<Particle>>,
    /// Direkte Attribute und Attribute-Group-Referenzen.
    pub attributes: Vec<AttributeEntry>,
    /// Optionales `xs:anyAttribute`-Wildcard.
    pub any_attribute: Option<Wildcard>,
    /// simpleContent / complexContent, falls vorhanden.
    pub content_model: Option<ContentModel>,
    /// `abstract="true"`.
    pub is_abstract: bool,
    /// `mixed="true"`.
    pub is_mixed: bool,
    /// `block`-Attribut, wie geschrieben.
    pub block: Option<Rc<str>>,
    /// `final`-Attribut, wie geschrieben.
    pub final_: Option<Rc<str>>,
}

/// Content Model eines Complex Types (XSD 1.0 Part 1 §3.4.2).
#[derive(Debug, Clone)]
pub struct ContentModel {
    /// simpleContent oder complexContent.
    pub kind: ContentModelKind,
    /// Die Extension- bzw. Restriction-Ableitung.
    pub content: ContentDerivation,
}

/// Die beiden Content-Model-Arten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentModelKind {
    /// `xs:simpleContent`.
    Simple,
    /// `xs:complexContent`, ggf. mit `mixed="true"`.
    Complex {
        /// mixed-Flag am complexContent.
        mixed: bool,
    },
}

/// Ableitung innerhalb eines Content Models.
#[derive(Debug, Clone)]
pub enum ContentDerivation {
    /// `xs:extension`.
    Extension(ContentExtension),
    /// `xs:restriction`.
    Restriction(ContentRestriction),
}

impl ContentDerivation {
    /// QName des Base-Typs der Ableitung.
    pub fn base(&self) -> &Rc<QName> {
        match self {
            Self::Extension(e) => &e.base,
            Self::Restriction(r) => &r.base,
        }
    }
}

/// Eine Extension: Base-Typ plus hinzugefügter Content und Attribute.
#[derive(Debug, Clone)]
pub struct ContentExtension {
    /// QName des Base-Typs.
    pub base: Rc<QName>,
    /// Aufgelöster Base-Typ.
    pub base_type: TypeSlot,
    /// Hinzugefügtes Content-Particle.
    pub particle: Option<Rc<Particle>>,
    /// Hinzugefügte Attribute.
    pub attributes: Vec<AttributeEntry>,
    /// Optionales `xs:anyAttribute`.
    pub any_attribute: Option<Wildcard>,
}

/// Eine Restriction: Base-Typ plus eingeschränkter Content, Attribute
/// und (bei simpleContent) Facets.
#[derive(Debug, Clone)]
pub struct ContentRestriction {
    /// QName des Base-Typs.
    pub base: Rc<QName>,
    /// Aufgelöster Base-Typ.
    pub base_type: TypeSlot,
    /// Eingeschränktes Content-Particle.
    pub particle: Option<Rc<Particle>>,
    /// Attribute der Restriction.
    pub attributes: Vec<AttributeEntry>,
    /// Optionales `xs:anyAttribute`.
    pub any_attribute: Option<Wildcard>,
    /// Facets (nur bei simpleContent-Restriction belegt).
    pub facets: Vec<Facet>,
}

// ============================================================================
// Notations und externe Referenzen
// ============================================================================

/// Eine `xs:notation`-Deklaration (XSD 1.0 Part 1 §3.12).
#[derive(Debug, Clone)]
pub struct Notation {
    /// Name der Notation im Target Namespace.
    pub name: Rc<QName>,
    /// `public`-Identifier.
    pub public_id: Option<Rc<str>>,
    /// `system`-Identifier.
    pub system_id: Option<Rc<str>>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

/// Ein `xs:import` auf ein Dokument eines anderen Namespace.
#[derive(Clone)]
pub struct SchemaImport {
    /// Deklarierter Namespace des importierten Dokuments.
    pub namespace: Option<Rc<str>>,
    /// `schemaLocation`, falls angegeben.
    pub schema_location: Option<Rc<str>>,
    /// Das aufgelöste Dokument; None wenn die Auflösung scheiterte.
    pub schema: RefCell<Option<Rc<XmlSchema>>>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

impl fmt::Debug for SchemaImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Flach — Importe können zyklisch aufeinander verweisen.
        write!(
            f,
            "SchemaImport(namespace: {:?}, location: {:?}, resolved: {})",
            self.namespace,
            self.schema_location,
            self.schema.borrow().is_some()
        )
    }
}

/// Ein `xs:include` auf ein Dokument desselben (oder keines) Namespace.
#[derive(Clone)]
pub struct SchemaInclude {
    /// `schemaLocation` des eingebundenen Dokuments.
    pub schema_location: Rc<str>,
    /// Das aufgelöste Dokument; None bei Zyklus oder Fehlschlag.
    pub schema: RefCell<Option<Rc<XmlSchema>>>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

impl fmt::Debug for SchemaInclude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SchemaInclude({}, resolved: {})",
            self.schema_location,
            self.schema.borrow().is_some()
        )
    }
}

/// Ein `xs:redefine`: Include plus überschreibende Definitionen.
#[derive(Clone)]
pub struct SchemaRedefine {
    /// `schemaLocation` des redefinierten Dokuments.
    pub schema_location: Rc<str>,
    /// Das aufgelöste Dokument; None bei Zyklus oder Fehlschlag.
    pub schema: RefCell<Option<Rc<XmlSchema>>>,
    /// Die überschreibenden Definitionen in Dokumentreihenfolge.
    pub items: Vec<SchemaItem>,
    /// Annotations-Payload.
    pub meta: ObjectMeta,
}

impl fmt::Debug for SchemaRedefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SchemaRedefine({}, resolved: {}, items: {})",
            self.schema_location,
            self.schema.borrow().is_some(),
            self.items.len()
        )
    }
}

/// Ein top-level Eintrag eines Dokuments, in Dokumentreihenfolge.
///
/// Die Reihenfolge ist für Re-Serialisierung relevant, nicht für Lookups —
/// dafür existieren die benannten Registries.
#[derive(Debug, Clone)]
pub enum SchemaItem {
    Element(Rc<ElementDecl>),
    Attribute(Rc<AttributeDecl>),
    Type(Rc<SchemaType>),
    Group(Rc<ModelGroupDecl>),
    AttributeGroup(Rc<AttributeGroupDecl>),
    Notation(Rc<Notation>),
    Import(Rc<SchemaImport>),
    Include(Rc<SchemaInclude>),
    Redefine(Rc<SchemaRedefine>),
}

// ============================================================================
// Dokument
// ============================================================================

/// Ein geparstes Schema-Dokument.
///
/// Unterscheidet den *syntaktischen* Target Namespace (wie im Dokument
/// geschrieben) vom *logischen* (ggf. vom einbindenden Dokument geerbt —
/// Chameleon-Include). Die benannten Registries sind QName-indiziert und
/// erhalten die Einfügereihenfolge.
#[derive(Debug)]
pub struct XmlSchema {
    pub(crate) syntactic_target_namespace: Option<Rc<str>>,
    pub(crate) logical_target_namespace: Rc<str>,
    pub(crate) element_form_default: Form,
    pub(crate) attribute_form_default: Form,
    pub(crate) block_default: Option<Rc<str>>,
    pub(crate) final_default: Option<Rc<str>>,
    pub(crate) version: Option<Rc<str>>,
    pub(crate) system_id: Option<Rc<str>>,
    /// Prefix→URI des Wurzelelements; Default-Namespace unter "".
    pub(crate) namespace_context: BTreeMap<Rc<str>, Rc<str>>,
    pub(crate) elements: FastIndexMap<Rc<QName>, Rc<ElementDecl>>,
    pub(crate) attributes: FastIndexMap<Rc<QName>, Rc<AttributeDecl>>,
    pub(crate) types: FastIndexMap<Rc<QName>, Rc<SchemaType>>,
    pub(crate) groups: FastIndexMap<Rc<QName>, Rc<ModelGroupDecl>>,
    pub(crate) attribute_groups: FastIndexMap<Rc<QName>, Rc<AttributeGroupDecl>>,
    pub(crate) notations: FastIndexMap<Rc<QName>, Rc<Notation>>,
    pub(crate) items: Vec<SchemaItem>,
    pub(crate) meta: ObjectMeta,
}

impl XmlSchema {
    pub(crate) fn new(
        syntactic_target_namespace: Option<&str>,
        inherited_namespace: Option<&str>,
        system_id: Option<&str>,
    ) -> Self {
        let logical = syntactic_target_namespace
            .or(inherited_namespace)
            .unwrap_or("");
        Self {
            syntactic_target_namespace: syntactic_target_namespace.map(Rc::from),
            logical_target_namespace: Rc::from(logical),
            element_form_default: Form::default(),
            attribute_form_default: Form::default(),
            block_default: None,
            final_default: None,
            version: None,
            system_id: system_id.map(Rc::from),
            namespace_context: BTreeMap::new(),
            elements: FastIndexMap::default(),
            attributes: FastIndexMap::default(),
            types: FastIndexMap::default(),
            groups: FastIndexMap::default(),
            attribute_groups: FastIndexMap::default(),
            notations: FastIndexMap::default(),
            items: Vec::new(),
            meta: ObjectMeta::default(),
        }
    }

    /// Der syntaktische Target Namespace, wie im Dokument geschrieben.
    pub fn target_namespace(&self) -> Option<&str> {
        self.syntactic_target_namespace.as_deref()
    }

    /// Der logische Target Namespace (geschrieben oder geerbt; leer = keiner).
    pub fn logical_target_namespace(&self) -> &str {
        &self.logical_target_namespace
    }

    /// Form-Default für lokale Elemente.
    pub fn element_form_default(&self) -> Form {
        self.element_form_default
    }

    /// Form-Default für lokale Attribute.
    pub fn attribute_form_default(&self) -> Form {
        self.attribute_form_default
    }

    /// `blockDefault`, wie geschrieben.
    pub fn block_default(&self) -> Option<&str> {
        self.block_default.as_deref()
    }

    /// `finalDefault`, wie geschrieben.
    pub fn final_default(&self) -> Option<&str> {
        self.final_default.as_deref()
    }

    /// `version`-Attribut des Dokuments.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// System-Id (Adresse) des Dokuments, falls bekannt.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Namespace-Kontext des Wurzelelements (Prefix→URI, Default unter "").
    pub fn namespace_context(&self) -> &BTreeMap<Rc<str>, Rc<str>> {
        &self.namespace_context
    }

    /// Identität dieses Dokuments innerhalb einer Collection.
    pub fn schema_key(&self) -> SchemaKey {
        SchemaKey::new(
            &self.logical_target_namespace,
            self.system_id.as_deref().unwrap_or(""),
        )
    }

    /// Annotations-Payload des Dokuments.
    pub fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    /// Globale Elemente in Dokumentreihenfolge.
    pub fn elements(&self) -> impl ExactSizeIterator<Item = (&Rc<QName>, &Rc<ElementDecl>)> {
        self.elements.iter()
    }

    /// Globale Attribute in Dokumentreihenfolge.
    pub fn attributes(&self) -> impl ExactSizeIterator<Item = (&Rc<QName>, &Rc<AttributeDecl>)> {
        self.attributes.iter()
    }

    /// Globale Typen in Dokumentreihenfolge.
    pub fn types(&self) -> impl ExactSizeIterator<Item = (&Rc<QName>, &Rc<SchemaType>)> {
        self.types.iter()
    }

    /// Benannte Groups in Dokumentreihenfolge.
    pub fn groups(&self) -> impl ExactSizeIterator<Item = (&Rc<QName>, &Rc<ModelGroupDecl>)> {
        self.groups.iter()
    }

    /// Benannte Attribute Groups in Dokumentreihenfolge.
    pub fn attribute_groups(
        &self,
    ) -> impl ExactSizeIterator<Item = (&Rc<QName>, &Rc<AttributeGroupDecl>)> {
        self.attribute_groups.iter()
    }

    /// Notations in Dokumentreihenfolge.
    pub fn notations(&self) -> impl ExactSizeIterator<Item = (&Rc<QName>, &Rc<Notation>)> {
        self.notations.iter()
    }

    /// Alle top-level Einträge in Dokumentreihenfolge.
    pub fn items(&self) -> &[SchemaItem] {
        &self.items
    }

    /// Lookup eines globalen Elements.
    pub fn get_element(&self, name: &QName) -> Option<&Rc<ElementDecl>> {
        self.elements.get(name)
    }

    /// Lookup eines globalen Attributs.
    pub fn get_attribute(&self, name: &QName) -> Option<&Rc<AttributeDecl>> {
        self.attributes.get(name)
    }

    /// Lookup eines benannten Typs.
    pub fn get_type(&self, name: &QName) -> Option<&Rc<SchemaType>> {
        self.types.get(name)
    }

    /// Lookup einer benannten Group.
    pub fn get_group(&self, name: &QName) -> Option<&Rc<ModelGroupDecl>> {
        self.groups.get(name)
    }

    /// Lookup einer benannten Attribute Group.
    pub fn get_attribute_group(&self, name: &QName) -> Option<&Rc<AttributeGroupDecl>> {
        self.attribute_groups.get(name)
    }

    /// Lookup einer Notation.
    pub fn get_notation(&self, name: &QName) -> Option<&Rc<Notation>> {
        self.notations.get(name)
    }
}
