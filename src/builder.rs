//! Rekursiver Abstieg über ein Dokument: Element-Baum → Objektmodell.
//!
//! Der Builder verarbeitet genau ein Dokument. Top-level dispatcht er über
//! den Local-Name (`simpleType`, `complexType`, `element`, `attribute`,
//! `attributeGroup`, `group`, `import`, `include`, `redefine`, `notation`,
//! `annotation`); jeder Handler steigt in seine eigene feste Sub-Dispatch-
//! Tabelle ab. Lokale (dokumentinterne) Referenzen werden im Anschluss an
//! den Durchlauf aufgelöst; Typ-Referenzen per QName gehen an den
//! Global-Index der Collection und warten dort als Pending Receiver, wenn
//! der Typ noch nicht definiert ist.
//!
//! Bei `import`/`include`/`redefine` ruft der Builder in die Collection
//! zurück, die das referenzierte Dokument auflöst (oder aus dem Cache
//! wiederverwendet) und dabei rekursiv einen weiteren Builder startet.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use roxmltree::Node;

use crate::collection::{ExpectedNamespace, NestedValidator, SchemaCollection, TargetNamespaceValidator};
use crate::error::{Error, Result};
use crate::extension::ExtensionRegistry;
use crate::qname::QName;
use crate::schema::{
    AttributeDecl, AttributeEntry, AttributeGroupDecl, AttributeGroupRef, AttributeUse,
    ComplexType, Compositor, ContentDerivation, ContentExtension, ContentModel, ContentModelKind,
    ContentRestriction, ElementDecl, Facet, FacetKind, Form, GroupRef, IdentityConstraint,
    IdentityConstraintKind, MaxOccurs, ModelGroup, ModelGroupDecl, NamespaceConstraint, Notation,
    ObjectMeta, Particle, ParticleTerm, ProcessContents, SchemaImport, SchemaInclude, SchemaItem,
    SchemaRedefine, SchemaType, SimpleType, SimpleTypeContent, TypeKind, TypeSlot, Wildcard,
    XmlSchema, XS_NS,
};

/// XML Namespace; der Prefix `xml` ist implizit immer gebunden
/// (Namespaces in XML 1.0 §3).
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Ob ein Knoten ein Element im XSD-Namespace ist.
fn is_xs(node: &Node) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(XS_NS)
}

/// Die XSD-Kind-Elemente eines Knotens in Dokumentreihenfolge.
fn xs_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| is_xs(n))
}

/// Gesammelter Text aller Text-Nachfahren eines Knotens.
fn collect_text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Basis-Payload eines Konstrukts: `id`-Attribut und Quellposition.
fn base_meta(node: &Node) -> ObjectMeta {
    ObjectMeta {
        id: node.attribute("id").map(Rc::from),
        source_offset: Some(node.range().start),
        ..ObjectMeta::default()
    }
}

/// Liest `xs:documentation` / `xs:appinfo` einer Annotation in den Payload.
fn read_annotation(node: &Node, meta: &mut ObjectMeta) {
    for child in xs_children(*node) {
        match child.tag_name().name() {
            "documentation" => meta.documentation.push(collect_text(child)),
            "appinfo" => meta.app_info.push(collect_text(child)),
            _ => {}
        }
    }
}

/// Reicht fremde (nicht-XSD) Attribute eines Knotens an die Extension-Registry.
fn foreign_attributes(
    extensions: &ExtensionRegistry,
    node: &Node,
    meta: &mut ObjectMeta,
) -> Result<()> {
    for attr in node.attributes() {
        if let Some(ns) = attr.namespace()
            && ns != XS_NS
        {
            let qname = QName::new(ns, attr.name());
            extensions.deserialize_attribute(meta, &qname, attr.value())?;
        }
    }
    Ok(())
}

/// Reicht ein fremdes Kind-Element (Roh-Quelltext) an die Extension-Registry.
fn foreign_element(
    extensions: &ExtensionRegistry,
    source: &str,
    node: &Node,
    meta: &mut ObjectMeta,
) -> Result<()> {
    let ns = node.tag_name().namespace().unwrap_or("");
    let qname = QName::new(ns, node.tag_name().name());
    let raw = &source[node.range()];
    extensions.deserialize_element(meta, &qname, raw)
}

/// Parsed `minOccurs`/`maxOccurs`; beide defaulten zu 1, das Literal
/// `unbounded` wird zum Sentinel (XSD 1.0 Part 1 §3.9).
fn parse_occurs(node: &Node) -> Result<(u64, MaxOccurs)> {
    let min = match node.attribute("minOccurs") {
        Some(s) => s
            .parse()
            .map_err(|_| Error::SchemaStructure(format!("invalid minOccurs '{s}'")))?,
        None => 1,
    };

    let max = match node.attribute("maxOccurs") {
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(s) => MaxOccurs::Bounded(
            s.parse()
                .map_err(|_| Error::SchemaStructure(format!("invalid maxOccurs '{s}'")))?,
        ),
        None => MaxOccurs::Bounded(1),
    };

    if let MaxOccurs::Bounded(m) = max
        && min > m
    {
        return Err(Error::SchemaStructure(format!(
            "minOccurs ({min}) cannot be greater than maxOccurs ({m})"
        )));
    }

    Ok((min, max))
}

/// Parsed das `form`-Attribut eines lokalen Elements/Attributs.
fn parse_form(node: &Node) -> Result<Option<Form>> {
    match node.attribute("form") {
        None => Ok(None),
        Some("qualified") => Ok(Some(Form::Qualified)),
        Some("unqualified") => Ok(Some(Form::Unqualified)),
        Some(other) => Err(Error::SchemaStructure(format!(
            "invalid form value '{other}'"
        ))),
    }
}

/// Builder-Zustand für genau ein Dokument.
pub(crate) struct SchemaBuilder<'c, 'v, 's> {
    collection: &'c mut SchemaCollection,
    validator: &'v dyn TargetNamespaceValidator,
    source: &'s str,
    schema: XmlSchema,
}

impl<'c, 'v, 's> SchemaBuilder<'c, 'v, 's> {
    /// Baut ein [`XmlSchema`] aus dem Wurzelelement eines Dokuments.
    ///
    /// `inherited_namespace` ist der logische Target Namespace des
    /// einbindenden Dokuments (Chameleon-Include); `validator` wird an jede
    /// verschachtelte `import`/`include`/`redefine`-Auflösung durchgereicht.
    pub(crate) fn build(
        collection: &'c mut SchemaCollection,
        root: Node,
        source: &'s str,
        system_id: Option<&str>,
        inherited_namespace: Option<&str>,
        validator: &'v dyn TargetNamespaceValidator,
    ) -> Result<XmlSchema> {
        let syntactic = root.attribute("targetNamespace");
        let mut builder = SchemaBuilder {
            collection,
            validator,
            source,
            schema: XmlSchema::new(syntactic, inherited_namespace, system_id),
        };
        builder.read_root(&root)?;
        builder.read_top_level(&root)?;
        builder.resolve_local_refs();
        Ok(builder.schema)
    }

    // ========================================================================
    // Wurzelelement
    // ========================================================================

    fn read_root(&mut self, root: &Node) -> Result<()> {
        if root.attribute("elementFormDefault") == Some("qualified") {
            self.schema.element_form_default = Form::Qualified;
        }
        if root.attribute("attributeFormDefault") == Some("qualified") {
            self.schema.attribute_form_default = Form::Qualified;
        }
        self.schema.block_default = root.attribute("blockDefault").map(Rc::from);
        self.schema.final_default = root.attribute("finalDefault").map(Rc::from);
        self.schema.version = root.attribute("version").map(Rc::from);

        for ns in root.namespaces() {
            self.schema
                .namespace_context
                .insert(Rc::from(ns.name().unwrap_or("")), Rc::from(ns.uri()));
        }

        let mut meta = mem::take(&mut self.schema.meta);
        meta.id = root.attribute("id").map(Rc::from);
        meta.source_offset = Some(root.range().start);
        let outcome = foreign_attributes(&self.collection.extensions, root, &mut meta);
        self.schema.meta = meta;
        outcome
    }

    // ========================================================================
    // Top-level Dispatch
    // ========================================================================

    fn read_top_level(&mut self, root: &Node) -> Result<()> {
        for child in root.children().filter(|n| n.is_element()) {
            if !is_xs(&child) {
                let mut meta = mem::take(&mut self.schema.meta);
                let outcome =
                    foreign_element(&self.collection.extensions, self.source, &child, &mut meta);
                self.schema.meta = meta;
                outcome?;
                continue;
            }
            match child.tag_name().name() {
                "simpleType" => {
                    let ty = self.read_global_simple_type(&child, false)?;
                    self.schema.items.push(SchemaItem::Type(ty));
                }
                "complexType" => {
                    let ty = self.read_global_complex_type(&child, false)?;
                    self.schema.items.push(SchemaItem::Type(ty));
                }
                "element" => {
                    let elem = self.read_global_element(&child)?;
                    self.schema.items.push(SchemaItem::Element(elem));
                }
                "attribute" => {
                    let attr = self.read_global_attribute(&child)?;
                    self.schema.items.push(SchemaItem::Attribute(attr));
                }
                "attributeGroup" => {
                    let group = self.read_global_attribute_group(&child, false)?;
                    self.schema.items.push(SchemaItem::AttributeGroup(group));
                }
                "group" => {
                    let group = self.read_global_group(&child, false)?;
                    self.schema.items.push(SchemaItem::Group(group));
                }
                "import" => self.read_import(&child)?,
                "include" => self.read_include(&child)?,
                "redefine" => self.read_redefine(&child)?,
                "notation" => {
                    let notation = self.read_notation(&child)?;
                    self.schema.items.push(SchemaItem::Notation(notation));
                }
                "annotation" => {
                    let mut meta = mem::take(&mut self.schema.meta);
                    read_annotation(&child, &mut meta);
                    self.schema.meta = meta;
                }
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected top-level element xs:{other}"
                    )));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Gemeinsame Helfer
    // ========================================================================

    /// Payload eines Konstrukts: id, Quellposition, Annotation, fremde
    /// Attribute/Elemente.
    fn read_meta(&self, node: &Node) -> Result<ObjectMeta> {
        let mut meta = base_meta(node);
        foreign_attributes(&self.collection.extensions, node, &mut meta)?;
        for child in node.children().filter(|n| n.is_element()) {
            if is_xs(&child) {
                if child.tag_name().name() == "annotation" {
                    read_annotation(&child, &mut meta);
                }
            } else {
                foreign_element(&self.collection.extensions, self.source, &child, &mut meta)?;
            }
        }
        Ok(meta)
    }

    /// Löst einen möglicherweise gepräfixten Namen aus einem Attributwert auf
    /// (`type`, `ref`, `base`, `refer`, `substitutionGroup`).
    ///
    /// Gepräfixte Namen lösen über die am Knoten sichtbaren Namespaces auf
    /// (roxmltree vererbt Ancestor-Deklarationen); ein ungebundener Prefix
    /// ist ein harter Fehler. Ungepräfixte Namen lösen zum Default-Namespace
    /// auf. Gibt es keinen Default-Namespace **und** hat das Dokument keinen
    /// syntaktischen Target Namespace, gehört der Name zum *logischen*
    /// Target Namespace — so referenzieren chameleon-eingebundene Dokumente
    /// ihre eigenen, in den Parent-Namespace gehobenen Definitionen.
    fn resolve_ref_qname(&self, raw: &str, node: &Node) -> Result<Rc<QName>> {
        if let Some((prefix, local)) = raw.split_once(':') {
            if prefix == "xml" {
                return Ok(Rc::new(QName::with_prefix(XML_NS, local, prefix)));
            }
            let uri = node
                .namespaces()
                .find(|ns| ns.name() == Some(prefix))
                .map(|ns| ns.uri())
                .ok_or_else(|| Error::UnknownPrefix {
                    prefix: prefix.to_string(),
                    name: raw.to_string(),
                })?;
            Ok(Rc::new(QName::with_prefix(uri, local, prefix)))
        } else {
            let default_ns = node
                .namespaces()
                .find(|ns| ns.name().is_none())
                .map(|ns| ns.uri())
                .filter(|uri| !uri.is_empty());
            match default_ns {
                Some(uri) => Ok(Rc::new(QName::new(uri, raw))),
                None if self.schema.target_namespace().is_none() => Ok(Rc::new(QName::new(
                    self.schema.logical_target_namespace(),
                    raw,
                ))),
                None => Ok(Rc::new(QName::new("", raw))),
            }
        }
    }

    /// QName eines benannten top-level Konstrukts im logischen Namespace.
    fn global_qname(&self, node: &Node, construct: &str) -> Result<Rc<QName>> {
        let name = node.attribute("name").ok_or_else(|| {
            Error::SchemaStructure(format!("global {construct} missing name attribute"))
        })?;
        Ok(Rc::new(QName::new(
            self.schema.logical_target_namespace(),
            name,
        )))
    }

    /// Namespace eines lokalen Elements/Attributs nach `form` bzw. Default.
    fn local_namespace(&self, node: &Node, form_default: Form) -> Result<String> {
        let form = parse_form(node)?.unwrap_or(form_default);
        Ok(match form {
            Form::Qualified => self.schema.logical_target_namespace().to_string(),
            Form::Unqualified => String::new(),
        })
    }

    // ========================================================================
    // Typen
    // ========================================================================

    fn read_global_simple_type(&mut self, node: &Node, replace: bool) -> Result<Rc<SchemaType>> {
        let qname = self.global_qname(node, "simpleType")?;
        let ty = Rc::new(self.read_simple_type(node, Some(qname.clone()))?);
        if !replace && self.schema.types.contains_key(&qname) {
            return Err(Error::SchemaStructure(format!(
                "duplicate global type '{qname}'"
            )));
        }
        self.schema.types.insert(qname.clone(), ty.clone());
        self.collection.register_type(qname, ty.clone());
        Ok(ty)
    }

    fn read_global_complex_type(&mut self, node: &Node, replace: bool) -> Result<Rc<SchemaType>> {
        let qname = self.global_qname(node, "complexType")?;
        let ty = Rc::new(self.read_complex_type(node, Some(qname.clone()))?);
        if !replace && self.schema.types.contains_key(&qname) {
            return Err(Error::SchemaStructure(format!(
                "duplicate global type '{qname}'"
            )));
        }
        self.schema.types.insert(qname.clone(), ty.clone());
        self.collection.register_type(qname, ty.clone());
        Ok(ty)
    }

    fn read_simple_type(&mut self, node: &Node, name: Option<Rc<QName>>) -> Result<SchemaType> {
        let meta = self.read_meta(node)?;
        let mut content = None;

        for child in xs_children(*node) {
            match child.tag_name().name() {
                "restriction" => content = Some(self.read_simple_restriction(&child)?),
                "list" => content = Some(self.read_simple_list(&child)?),
                "union" => content = Some(self.read_simple_union(&child)?),
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in simpleType"
                    )));
                }
            }
        }

        Ok(SchemaType {
            name,
            kind: TypeKind::Simple(SimpleType { content }),
            meta,
        })
    }

    fn read_simple_restriction(&mut self, node: &Node) -> Result<SimpleTypeContent> {
        let base = node
            .attribute("base")
            .map(|s| self.resolve_ref_qname(s, node))
            .transpose()?;
        let base_type = TypeSlot::new();
        if let Some(base_qname) = &base {
            self.collection.request_type(base_qname, &base_type);
        }

        let mut inline_base = None;
        let mut facets = Vec::new();
        for child in xs_children(*node) {
            let local = child.tag_name().name();
            match local {
                "annotation" => {}
                "simpleType" => {
                    let ty = Rc::new(self.read_simple_type(&child, None)?);
                    base_type.assign(ty.clone());
                    inline_base = Some(ty);
                }
                _ => match FacetKind::from_local_name(local) {
                    Some(kind) => facets.push(read_facet(&child, kind)?),
                    None => return Err(Error::UnknownFacet(local.to_string())),
                },
            }
        }

        Ok(SimpleTypeContent::Restriction {
            base,
            base_type,
            inline_base,
            facets,
        })
    }

    fn read_simple_list(&mut self, node: &Node) -> Result<SimpleTypeContent> {
        let item_type = node
            .attribute("itemType")
            .map(|s| self.resolve_ref_qname(s, node))
            .transpose()?;

        let mut inline_item = None;
        for child in xs_children(*node) {
            if child.tag_name().name() == "simpleType" {
                inline_item = Some(Rc::new(self.read_simple_type(&child, None)?));
            }
        }

        Ok(SimpleTypeContent::List {
            item_type,
            inline_item,
        })
    }

    fn read_simple_union(&mut self, node: &Node) -> Result<SimpleTypeContent> {
        let mut member_types = Vec::new();
        if let Some(members) = node.attribute("memberTypes") {
            for token in members.split_whitespace() {
                member_types.push(self.resolve_ref_qname(token, node)?);
            }
        }

        let mut inline_members = Vec::new();
        for child in xs_children(*node) {
            if child.tag_name().name() == "simpleType" {
                inline_members.push(Rc::new(self.read_simple_type(&child, None)?));
            }
        }

        Ok(SimpleTypeContent::Union {
            member_types,
            inline_members,
        })
    }

    fn read_complex_type(&mut self, node: &Node, name: Option<Rc<QName>>) -> Result<SchemaType> {
        let meta = self.read_meta(node)?;
        let mut ct = ComplexType {
            is_abstract: node.attribute("abstract") == Some("true"),
            is_mixed: node.attribute("mixed") == Some("true"),
            block: node.attribute("block").map(Rc::from),
            final_: node.attribute("final").map(Rc::from),
            ..ComplexType::default()
        };

        for child in xs_children(*node) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" | "group" => {
                    ct.particle = Some(self.read_particle(&child)?);
                }
                "attribute" => {
                    let attr = Rc::new(self.read_attribute(&child, false)?);
                    ct.attributes.push(AttributeEntry::Attribute(attr));
                }
                "attributeGroup" => {
                    ct.attributes.push(self.read_attribute_group_ref(&child)?);
                }
                "anyAttribute" => ct.any_attribute = Some(self.read_wildcard(&child)?),
                "simpleContent" => {
                    ct.content_model =
                        Some(self.read_content_model(&child, ContentModelKind::Simple)?);
                }
                "complexContent" => {
                    let mixed = child.attribute("mixed") == Some("true");
                    ct.content_model =
                        Some(self.read_content_model(&child, ContentModelKind::Complex { mixed })?);
                }
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in complexType"
                    )));
                }
            }
        }

        Ok(SchemaType {
            name,
            kind: TypeKind::Complex(ct),
            meta,
        })
    }

    fn read_content_model(&mut self, node: &Node, kind: ContentModelKind) -> Result<ContentModel> {
        let simple = kind == ContentModelKind::Simple;
        for child in xs_children(*node) {
            match child.tag_name().name() {
                "annotation" => {}
                "extension" => {
                    return Ok(ContentModel {
                        kind,
                        content: ContentDerivation::Extension(self.read_content_extension(&child)?),
                    });
                }
                "restriction" => {
                    return Ok(ContentModel {
                        kind,
                        content: ContentDerivation::Restriction(
                            self.read_content_restriction(&child, simple)?,
                        ),
                    });
                }
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in content model"
                    )));
                }
            }
        }
        Err(Error::SchemaStructure(
            "content model without extension or restriction".to_string(),
        ))
    }

    fn content_base(&mut self, node: &Node) -> Result<(Rc<QName>, TypeSlot)> {
        let base_str = node.attribute("base").ok_or_else(|| {
            Error::SchemaStructure(format!(
                "xs:{} missing base attribute",
                node.tag_name().name()
            ))
        })?;
        let base = self.resolve_ref_qname(base_str, node)?;
        let base_type = TypeSlot::new();
        self.collection.request_type(&base, &base_type);
        Ok((base, base_type))
    }

    fn read_content_extension(&mut self, node: &Node) -> Result<ContentExtension> {
        let (base, base_type) = self.content_base(node)?;
        let mut extension = ContentExtension {
            base,
            base_type,
            particle: None,
            attributes: Vec::new(),
            any_attribute: None,
        };

        for child in xs_children(*node) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" | "group" => {
                    extension.particle = Some(self.read_particle(&child)?);
                }
                "attribute" => {
                    let attr = Rc::new(self.read_attribute(&child, false)?);
                    extension.attributes.push(AttributeEntry::Attribute(attr));
                }
                "attributeGroup" => {
                    extension
                        .attributes
                        .push(self.read_attribute_group_ref(&child)?);
                }
                "anyAttribute" => extension.any_attribute = Some(self.read_wildcard(&child)?),
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in extension"
                    )));
                }
            }
        }
        Ok(extension)
    }

    fn read_content_restriction(&mut self, node: &Node, simple: bool) -> Result<ContentRestriction> {
        let (base, base_type) = self.content_base(node)?;
        let mut restriction = ContentRestriction {
            base,
            base_type,
            particle: None,
            attributes: Vec::new(),
            any_attribute: None,
            facets: Vec::new(),
        };

        for child in xs_children(*node) {
            let local = child.tag_name().name();
            match local {
                "sequence" | "choice" | "all" | "group" => {
                    restriction.particle = Some(self.read_particle(&child)?);
                }
                "attribute" => {
                    let attr = Rc::new(self.read_attribute(&child, false)?);
                    restriction.attributes.push(AttributeEntry::Attribute(attr));
                }
                "attributeGroup" => {
                    restriction
                        .attributes
                        .push(self.read_attribute_group_ref(&child)?);
                }
                "anyAttribute" => restriction.any_attribute = Some(self.read_wildcard(&child)?),
                "simpleType" if simple => {
                    // Inline-Base einer simpleContent-Restriction.
                    let ty = Rc::new(self.read_simple_type(&child, None)?);
                    restriction.base_type.assign(ty);
                }
                "annotation" => {}
                _ if simple => match FacetKind::from_local_name(local) {
                    Some(kind) => restriction.facets.push(read_facet(&child, kind)?),
                    None => return Err(Error::UnknownFacet(local.to_string())),
                },
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in restriction"
                    )));
                }
            }
        }
        Ok(restriction)
    }

    // ========================================================================
    // Particles
    // ========================================================================

    fn read_particle(&mut self, node: &Node) -> Result<Rc<Particle>> {
        let (min_occurs, max_occurs) = parse_occurs(node)?;
        let mut meta = base_meta(node);

        let term = match node.tag_name().name() {
            "element" => ParticleTerm::Element(Rc::new(self.read_element(node, false)?)),
            "any" => ParticleTerm::Any(self.read_wildcard(node)?),
            "sequence" => ParticleTerm::Group(self.read_model_group(node, Compositor::Sequence)?),
            "choice" => ParticleTerm::Group(self.read_model_group(node, Compositor::Choice)?),
            "all" => ParticleTerm::Group(self.read_model_group(node, Compositor::All)?),
            "group" => {
                let ref_str = node.attribute("ref").ok_or_else(|| {
                    Error::SchemaStructure("xs:group particle missing ref attribute".to_string())
                })?;
                ParticleTerm::GroupRef(GroupRef {
                    ref_name: self.resolve_ref_qname(ref_str, node)?,
                    resolved: RefCell::new(None),
                })
            }
            other => {
                return Err(Error::SchemaStructure(format!(
                    "unknown particle term xs:{other}"
                )));
            }
        };

        for child in xs_children(*node) {
            if child.tag_name().name() == "annotation" {
                read_annotation(&child, &mut meta);
            }
        }

        Ok(Rc::new(Particle {
            min_occurs,
            max_occurs,
            term,
            meta,
        }))
    }

    fn read_model_group(&mut self, node: &Node, compositor: Compositor) -> Result<ModelGroup> {
        let mut particles = Vec::new();
        for child in xs_children(*node) {
            match child.tag_name().name() {
                "element" | "any" | "sequence" | "choice" | "all" | "group" => {
                    particles.push(self.read_particle(&child)?);
                }
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in model group"
                    )));
                }
            }
        }
        Ok(ModelGroup {
            compositor,
            particles,
        })
    }

    fn read_global_group(&mut self, node: &Node, replace: bool) -> Result<Rc<ModelGroupDecl>> {
        let qname = self.global_qname(node, "group")?;
        let meta = self.read_meta(node)?;

        let mut particle = None;
        for child in xs_children(*node) {
            if matches!(child.tag_name().name(), "sequence" | "choice" | "all") {
                particle = Some(self.read_particle(&child)?);
            }
        }
        let particle = particle.ok_or_else(|| {
            Error::SchemaStructure(format!("group '{qname}' has no model group content"))
        })?;

        if !replace && self.schema.groups.contains_key(&qname) {
            return Err(Error::SchemaStructure(format!(
                "duplicate global group '{qname}'"
            )));
        }
        let decl = Rc::new(ModelGroupDecl {
            name: qname.clone(),
            particle,
            meta,
        });
        self.schema.groups.insert(qname, decl.clone());
        Ok(decl)
    }

    // ========================================================================
    // Elemente
    // ========================================================================

    fn read_global_element(&mut self, node: &Node) -> Result<Rc<ElementDecl>> {
        let elem = Rc::new(self.read_element(node, true)?);
        let qname = elem
            .name
            .clone()
            .ok_or_else(|| Error::SchemaStructure("global element missing name".to_string()))?;
        if self.schema.elements.contains_key(&qname) {
            return Err(Error::SchemaStructure(format!(
                "duplicate global element '{qname}'"
            )));
        }
        self.schema.elements.insert(qname, elem.clone());
        Ok(elem)
    }

    fn read_element(&mut self, node: &Node, global: bool) -> Result<ElementDecl> {
        let meta = self.read_meta(node)?;

        // Lokale Ref-Particles tragen nur den Zielnamen; Occurs sitzen am
        // umgebenden Particle.
        if !global && let Some(ref_str) = node.attribute("ref") {
            let ref_name = self.resolve_ref_qname(ref_str, node)?;
            let mut decl = ElementDecl::named(ref_name.clone());
            decl.name = None;
            decl.ref_name = Some(ref_name);
            decl.meta = meta;
            return Ok(decl);
        }

        if !global && node.attribute("substitutionGroup").is_some() {
            return Err(Error::SchemaStructure(
                "substitutionGroup is only allowed on global elements (XSD Part 1 §3.3.3)"
                    .to_string(),
            ));
        }

        let name = node
            .attribute("name")
            .ok_or_else(|| Error::SchemaStructure("element missing name attribute".to_string()))?;
        let namespace = if global {
            self.schema.logical_target_namespace().to_string()
        } else {
            self.local_namespace(node, self.schema.element_form_default())?
        };
        let qname = Rc::new(QName::new(&namespace, name));

        let mut decl = ElementDecl::named(qname);
        decl.meta = meta;
        decl.nillable = node.attribute("nillable") == Some("true");
        decl.is_abstract = node.attribute("abstract") == Some("true");
        decl.default_value = node.attribute("default").map(Rc::from);
        decl.fixed_value = node.attribute("fixed").map(Rc::from);
        decl.form = parse_form(node)?;
        decl.block = node.attribute("block").map(Rc::from);
        decl.final_ = node.attribute("final").map(Rc::from);

        if global && let Some(head) = node.attribute("substitutionGroup") {
            decl.substitution_group = Some(self.resolve_ref_qname(head, node)?);
        }

        if let Some(type_str) = node.attribute("type") {
            let type_name = self.resolve_ref_qname(type_str, node)?;
            self.collection.request_type(&type_name, &decl.schema_type);
            decl.type_name = Some(type_name);
        }

        for child in xs_children(*node) {
            match child.tag_name().name() {
                "simpleType" => {
                    let ty = Rc::new(self.read_simple_type(&child, None)?);
                    decl.schema_type.assign(ty.clone());
                    decl.inline_type = Some(ty);
                }
                "complexType" => {
                    let ty = Rc::new(self.read_complex_type(&child, None)?);
                    decl.schema_type.assign(ty.clone());
                    decl.inline_type = Some(ty);
                }
                "unique" | "key" | "keyref" => {
                    let constraint = self.read_identity_constraint(&child)?;
                    decl.identity_constraints.push(constraint);
                }
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in element declaration"
                    )));
                }
            }
        }

        Ok(decl)
    }

    fn read_identity_constraint(&mut self, node: &Node) -> Result<IdentityConstraint> {
        let constraint_kind = node.tag_name().name();
        let name = node.attribute("name").ok_or_else(|| {
            Error::SchemaStructure(format!("xs:{constraint_kind} missing name attribute"))
        })?;
        let qname = Rc::new(QName::new(self.schema.logical_target_namespace(), name));

        let kind = match constraint_kind {
            "unique" => IdentityConstraintKind::Unique,
            "key" => IdentityConstraintKind::Key,
            _ => {
                let refer = node.attribute("refer").ok_or_else(|| {
                    Error::SchemaStructure(format!(
                        "xs:keyref '{name}' missing refer attribute"
                    ))
                })?;
                IdentityConstraintKind::KeyRef {
                    refer: self.resolve_ref_qname(refer, node)?,
                }
            }
        };

        let meta = self.read_meta(node)?;
        let mut selector = None;
        let mut fields = Vec::new();
        for child in xs_children(*node) {
            match child.tag_name().name() {
                "selector" => {
                    let xpath = child.attribute("xpath").ok_or_else(|| {
                        Error::SchemaStructure(format!(
                            "selector of '{name}' missing xpath attribute"
                        ))
                    })?;
                    selector = Some(Rc::from(xpath));
                }
                "field" => {
                    let xpath = child.attribute("xpath").ok_or_else(|| {
                        Error::SchemaStructure(format!(
                            "field of '{name}' missing xpath attribute"
                        ))
                    })?;
                    fields.push(Rc::from(xpath));
                }
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in identity constraint"
                    )));
                }
            }
        }

        let selector = selector.ok_or_else(|| {
            Error::SchemaStructure(format!("identity constraint '{name}' missing selector"))
        })?;
        if fields.is_empty() {
            return Err(Error::SchemaStructure(format!(
                "identity constraint '{name}' requires at least one field"
            )));
        }

        Ok(IdentityConstraint {
            name: qname,
            kind,
            selector,
            fields,
            meta,
        })
    }

    // ========================================================================
    // Attribute
    // ========================================================================

    fn read_global_attribute(&mut self, node: &Node) -> Result<Rc<AttributeDecl>> {
        let attr = Rc::new(self.read_attribute(node, true)?);
        let qname = attr
            .name
            .clone()
            .ok_or_else(|| Error::SchemaStructure("global attribute missing name".to_string()))?;
        if self.schema.attributes.contains_key(&qname) {
            return Err(Error::SchemaStructure(format!(
                "duplicate global attribute '{qname}'"
            )));
        }
        self.schema.attributes.insert(qname, attr.clone());
        Ok(attr)
    }

    fn read_attribute(&mut self, node: &Node, global: bool) -> Result<AttributeDecl> {
        let meta = self.read_meta(node)?;

        let use_ = match node.attribute("use") {
            None | Some("optional") => AttributeUse::Optional,
            Some("required") => AttributeUse::Required,
            Some("prohibited") => AttributeUse::Prohibited,
            Some(other) => {
                return Err(Error::SchemaStructure(format!(
                    "invalid attribute use '{other}'"
                )));
            }
        };

        if !global && let Some(ref_str) = node.attribute("ref") {
            let ref_name = self.resolve_ref_qname(ref_str, node)?;
            let mut decl = AttributeDecl::named(ref_name.clone());
            decl.name = None;
            decl.ref_name = Some(ref_name);
            decl.use_ = use_;
            decl.default_value = node.attribute("default").map(Rc::from);
            decl.fixed_value = node.attribute("fixed").map(Rc::from);
            decl.meta = meta;
            return Ok(decl);
        }

        let name = node.attribute("name").ok_or_else(|| {
            Error::SchemaStructure("attribute missing name attribute".to_string())
        })?;
        let namespace = if global {
            self.schema.logical_target_namespace().to_string()
        } else {
            self.local_namespace(node, self.schema.attribute_form_default())?
        };
        let qname = Rc::new(QName::new(&namespace, name));

        let mut decl = AttributeDecl::named(qname);
        decl.meta = meta;
        decl.use_ = use_;
        decl.default_value = node.attribute("default").map(Rc::from);
        decl.fixed_value = node.attribute("fixed").map(Rc::from);
        decl.form = parse_form(node)?;

        if let Some(type_str) = node.attribute("type") {
            let type_name = self.resolve_ref_qname(type_str, node)?;
            self.collection.request_type(&type_name, &decl.schema_type);
            decl.type_name = Some(type_name);
        }

        for child in xs_children(*node) {
            if child.tag_name().name() == "simpleType" {
                let ty = Rc::new(self.read_simple_type(&child, None)?);
                decl.schema_type.assign(ty.clone());
                decl.inline_type = Some(ty);
            }
        }

        Ok(decl)
    }

    fn read_attribute_group_ref(&mut self, node: &Node) -> Result<AttributeEntry> {
        let ref_str = node.attribute("ref").ok_or_else(|| {
            Error::SchemaStructure("attributeGroup reference missing ref attribute".to_string())
        })?;
        Ok(AttributeEntry::GroupRef(AttributeGroupRef {
            ref_name: self.resolve_ref_qname(ref_str, node)?,
            resolved: RefCell::new(None),
        }))
    }

    fn read_global_attribute_group(
        &mut self,
        node: &Node,
        replace: bool,
    ) -> Result<Rc<AttributeGroupDecl>> {
        let qname = self.global_qname(node, "attributeGroup")?;
        let meta = self.read_meta(node)?;

        let mut attributes = Vec::new();
        let mut any_attribute = None;
        for child in xs_children(*node) {
            match child.tag_name().name() {
                "attribute" => {
                    let attr = Rc::new(self.read_attribute(&child, false)?);
                    attributes.push(AttributeEntry::Attribute(attr));
                }
                "attributeGroup" => attributes.push(self.read_attribute_group_ref(&child)?),
                "anyAttribute" => any_attribute = Some(self.read_wildcard(&child)?),
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in attributeGroup"
                    )));
                }
            }
        }

        if !replace && self.schema.attribute_groups.contains_key(&qname) {
            return Err(Error::SchemaStructure(format!(
                "duplicate global attributeGroup '{qname}'"
            )));
        }
        let decl = Rc::new(AttributeGroupDecl {
            name: Some(qname.clone()),
            attributes,
            any_attribute,
            meta,
        });
        self.schema.attribute_groups.insert(qname, decl.clone());
        Ok(decl)
    }

    // ========================================================================
    // Wildcards und Notations
    // ========================================================================

    fn read_wildcard(&self, node: &Node) -> Result<Wildcard> {
        let process_contents = match node.attribute("processContents") {
            None | Some("strict") => ProcessContents::Strict,
            Some("lax") => ProcessContents::Lax,
            Some("skip") => ProcessContents::Skip,
            Some(other) => {
                return Err(Error::SchemaStructure(format!(
                    "invalid processContents value '{other}'"
                )));
            }
        };

        let namespace_constraint = match node.attribute("namespace") {
            None | Some("##any") => NamespaceConstraint::Any,
            Some("##other") => NamespaceConstraint::Other,
            Some(list) => NamespaceConstraint::List(
                list.split_whitespace()
                    .map(|token| match token {
                        "##targetNamespace" => {
                            Rc::from(self.schema.logical_target_namespace())
                        }
                        "##local" => Rc::from(""),
                        uri => Rc::from(uri),
                    })
                    .collect(),
            ),
        };

        Ok(Wildcard {
            namespace_constraint,
            process_contents,
        })
    }

    fn read_notation(&mut self, node: &Node) -> Result<Rc<Notation>> {
        let qname = self.global_qname(node, "notation")?;
        let meta = self.read_meta(node)?;
        if self.schema.notations.contains_key(&qname) {
            return Err(Error::SchemaStructure(format!(
                "duplicate notation '{qname}'"
            )));
        }
        let notation = Rc::new(Notation {
            name: qname.clone(),
            public_id: node.attribute("public").map(Rc::from),
            system_id: node.attribute("system").map(Rc::from),
            meta,
        });
        self.schema.notations.insert(qname, notation.clone());
        Ok(notation)
    }

    // ========================================================================
    // Externe Referenzen
    // ========================================================================

    fn resolve_nested(
        &mut self,
        target_namespace: Option<&str>,
        schema_location: &str,
        inherited_namespace: Option<&str>,
        expect: ExpectedNamespace,
    ) -> Result<Option<Rc<XmlSchema>>> {
        let base_uri = self.schema.system_id.clone();
        let validator = NestedValidator {
            user: self.validator,
            expect,
        };
        self.collection.resolve_xml_schema(
            target_namespace,
            schema_location,
            base_uri.as_deref(),
            inherited_namespace,
            &validator,
        )
    }

    fn read_import(&mut self, node: &Node) -> Result<()> {
        let meta = self.read_meta(node)?;
        let namespace = node.attribute("namespace");
        let location = node.attribute("schemaLocation");

        let resolved = match location {
            Some(location) => {
                let expect = ExpectedNamespace {
                    construct: "import",
                    expected: namespace.map(str::to_string),
                    allow_inherit: false,
                };
                self.resolve_nested(namespace, location, None, expect)?
            }
            // Ohne schemaLocation bleibt nur die Known-Schema-Tabelle.
            None => namespace.and_then(|ns| self.collection.known_schema(ns)),
        };

        let import = Rc::new(SchemaImport {
            namespace: namespace.map(Rc::from),
            schema_location: location.map(Rc::from),
            schema: RefCell::new(resolved),
            meta,
        });
        self.schema.items.push(SchemaItem::Import(import));
        Ok(())
    }

    fn read_include(&mut self, node: &Node) -> Result<()> {
        let meta = self.read_meta(node)?;
        let location = node.attribute("schemaLocation").ok_or_else(|| {
            Error::SchemaStructure("xs:include missing schemaLocation attribute".to_string())
        })?;

        let logical = self.schema.logical_target_namespace.clone();
        let expect = ExpectedNamespace {
            construct: "include",
            expected: Some(logical.to_string()),
            allow_inherit: true,
        };
        let resolved = self.resolve_nested(Some(&logical), location, Some(&logical), expect)?;

        let include = Rc::new(SchemaInclude {
            schema_location: Rc::from(location),
            schema: RefCell::new(resolved),
            meta,
        });
        self.schema.items.push(SchemaItem::Include(include));
        Ok(())
    }

    fn read_redefine(&mut self, node: &Node) -> Result<()> {
        let meta = self.read_meta(node)?;
        let location = node.attribute("schemaLocation").ok_or_else(|| {
            Error::SchemaStructure("xs:redefine missing schemaLocation attribute".to_string())
        })?;

        let logical = self.schema.logical_target_namespace.clone();
        let expect = ExpectedNamespace {
            construct: "redefine",
            expected: Some(logical.to_string()),
            allow_inherit: true,
        };
        let resolved = self.resolve_nested(Some(&logical), location, Some(&logical), expect)?;

        // Die überschreibenden Definitionen ersetzen die eingebundenen in den
        // Registries; `base`-Referenzen gleichen Namens treffen noch die
        // eingebundene Definition, da sie vor dem Überschreiben aufgelöst
        // werden (XSD 1.0 Part 1 §4.2.2).
        let mut items = Vec::new();
        for child in xs_children(*node) {
            match child.tag_name().name() {
                "simpleType" => {
                    items.push(SchemaItem::Type(self.read_global_simple_type(&child, true)?));
                }
                "complexType" => {
                    items.push(SchemaItem::Type(
                        self.read_global_complex_type(&child, true)?,
                    ));
                }
                "group" => {
                    items.push(SchemaItem::Group(self.read_global_group(&child, true)?));
                }
                "attributeGroup" => {
                    items.push(SchemaItem::AttributeGroup(
                        self.read_global_attribute_group(&child, true)?,
                    ));
                }
                "annotation" => {}
                other => {
                    return Err(Error::SchemaStructure(format!(
                        "unexpected xs:{other} in redefine"
                    )));
                }
            }
        }

        let redefine = Rc::new(SchemaRedefine {
            schema_location: Rc::from(location),
            schema: RefCell::new(resolved),
            items,
            meta,
        });
        self.schema.items.push(SchemaItem::Redefine(redefine));
        Ok(())
    }

    // ========================================================================
    // Lokale Referenz-Auflösung
    // ========================================================================

    /// Löst Group- und Attribute-Group-Referenzen nach dem Dokumentdurchlauf
    /// auf: erst gegen die eigenen Registries (deckt Vorwärtsreferenzen im
    /// selben Dokument ab), dann gegen die bereits registrierten Dokumente
    /// der Collection. Unaufgelöste Referenzen bleiben offen.
    fn resolve_local_refs(&self) {
        for ty in self.schema.types.values() {
            self.resolve_refs_in_type(ty);
        }
        for elem in self.schema.elements.values() {
            if let Some(ty) = &elem.inline_type {
                self.resolve_refs_in_type(ty);
            }
        }
        for group in self.schema.groups.values() {
            self.resolve_refs_in_particle(&group.particle);
        }
        for attribute_group in self.schema.attribute_groups.values() {
            self.resolve_attribute_entries(&attribute_group.attributes);
        }
    }

    fn resolve_refs_in_type(&self, ty: &SchemaType) {
        match &ty.kind {
            TypeKind::Complex(ct) => {
                if let Some(particle) = &ct.particle {
                    self.resolve_refs_in_particle(particle);
                }
                self.resolve_attribute_entries(&ct.attributes);
                if let Some(model) = &ct.content_model {
                    match &model.content {
                        ContentDerivation::Extension(extension) => {
                            if let Some(particle) = &extension.particle {
                                self.resolve_refs_in_particle(particle);
                            }
                            self.resolve_attribute_entries(&extension.attributes);
                        }
                        ContentDerivation::Restriction(restriction) => {
                            if let Some(particle) = &restriction.particle {
                                self.resolve_refs_in_particle(particle);
                            }
                            self.resolve_attribute_entries(&restriction.attributes);
                        }
                    }
                }
            }
            TypeKind::Simple(st) => match &st.content {
                Some(SimpleTypeContent::Restriction { inline_base, .. }) => {
                    if let Some(inner) = inline_base {
                        self.resolve_refs_in_type(inner);
                    }
                }
                Some(SimpleTypeContent::List { inline_item, .. }) => {
                    if let Some(inner) = inline_item {
                        self.resolve_refs_in_type(inner);
                    }
                }
                Some(SimpleTypeContent::Union { inline_members, .. }) => {
                    for inner in inline_members {
                        self.resolve_refs_in_type(inner);
                    }
                }
                None => {}
            },
        }
    }

    fn resolve_refs_in_particle(&self, particle: &Particle) {
        match &particle.term {
            ParticleTerm::Element(elem) => {
                if let Some(ty) = &elem.inline_type {
                    self.resolve_refs_in_type(ty);
                }
            }
            ParticleTerm::Group(group) => {
                for child in &group.particles {
                    self.resolve_refs_in_particle(child);
                }
            }
            ParticleTerm::GroupRef(group_ref) => {
                if group_ref.resolved.borrow().is_none() {
                    let found = self
                        .schema
                        .groups
                        .get(&*group_ref.ref_name)
                        .cloned()
                        .or_else(|| self.collection.get_group_by_qname(&group_ref.ref_name));
                    if let Some(decl) = found {
                        *group_ref.resolved.borrow_mut() = Some(decl);
                    }
                }
            }
            ParticleTerm::Any(_) => {}
        }
    }

    fn resolve_attribute_entries(&self, entries: &[AttributeEntry]) {
        for entry in entries {
            match entry {
                AttributeEntry::Attribute(attr) => {
                    if let Some(ty) = &attr.inline_type {
                        self.resolve_refs_in_type(ty);
                    }
                }
                AttributeEntry::GroupRef(group_ref) => {
                    if group_ref.resolved.borrow().is_none() {
                        let found = self
                            .schema
                            .attribute_groups
                            .get(&*group_ref.ref_name)
                            .cloned()
                            .or_else(|| {
                                self.collection
                                    .get_attribute_group_by_qname(&group_ref.ref_name)
                            });
                        if let Some(decl) = found {
                            *group_ref.resolved.borrow_mut() = Some(decl);
                        }
                    }
                }
            }
        }
    }
}

/// Liest ein Facet-Element: `value` ist Pflicht, `fixed` optional.
fn read_facet(node: &Node, kind: FacetKind) -> Result<Facet> {
    let value = node.attribute("value").ok_or_else(|| {
        Error::SchemaStructure(format!(
            "facet xs:{} missing value attribute",
            kind.local_name()
        ))
    })?;
    let fixed = node.attribute("fixed") == Some("true");
    let mut facet = Facet::new(kind, value, fixed);
    facet.meta = base_meta(node);
    Ok(facet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::SchemaCollection;

    const TNS: &str = "http://example.org";

    fn read(xsd: &str) -> Rc<XmlSchema> {
        SchemaCollection::new().read(xsd).unwrap()
    }

    fn read_err(xsd: &str) -> Error {
        SchemaCollection::new().read(xsd).unwrap_err()
    }

    // ========================================================================
    // Grundstruktur
    // ========================================================================

    /// Leeres Schema parsen.
    #[test]
    fn parse_empty_schema() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            </xs:schema>
        "#,
        );
        assert_eq!(schema.elements().len(), 0);
        assert!(schema.items().is_empty());
    }

    /// Syntaktischer und logischer Target Namespace.
    #[test]
    fn parse_target_namespace() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       targetNamespace="http://example.org"
                       version="1.1">
                <xs:element name="root" type="xs:string"/>
            </xs:schema>
        "#,
        );
        assert_eq!(schema.target_namespace(), Some(TNS));
        assert_eq!(schema.logical_target_namespace(), TNS);
        assert_eq!(schema.version(), Some("1.1"));
        assert!(schema.get_element(&QName::new(TNS, "root")).is_some());
    }

    /// Ungültiges XML gibt einen Parse-Fehler.
    #[test]
    fn invalid_xml_is_rejected() {
        let err = read_err("<xs:schema><not-closed>");
        assert!(matches!(err, Error::XmlParse(_)));
    }

    /// Root muss xs:schema sein.
    #[test]
    fn non_schema_root_is_rejected() {
        let err = read_err(r#"<element xmlns="http://www.w3.org/2001/XMLSchema"/>"#);
        assert!(matches!(err, Error::SchemaStructure(_)));
    }

    /// Doppelte globale Namen verletzen die Registry-Eindeutigkeit.
    #[test]
    fn duplicate_global_type_is_rejected() {
        let err = read_err(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:simpleType name="T"><xs:restriction base="xs:string"/></xs:simpleType>
                <xs:simpleType name="T"><xs:restriction base="xs:string"/></xs:simpleType>
            </xs:schema>
        "#,
        );
        assert!(matches!(err, Error::SchemaStructure(_)));
    }

    // ========================================================================
    // Occurs
    // ========================================================================

    /// Fehlende minOccurs/maxOccurs defaulten beide zu 1.
    #[test]
    fn occurs_default_to_one() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="T">
                    <xs:sequence>
                        <xs:element name="child" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new("", "T")).unwrap();
        let particle = ty.particle().unwrap();
        assert_eq!(particle.min_occurs, 1);
        assert_eq!(particle.max_occurs, MaxOccurs::Bounded(1));

        let ParticleTerm::Group(group) = &particle.term else {
            panic!("sequence expected");
        };
        assert_eq!(group.compositor, Compositor::Sequence);
        assert_eq!(group.particles[0].min_occurs, 1);
        assert_eq!(group.particles[0].max_occurs, MaxOccurs::Bounded(1));
    }

    /// maxOccurs="unbounded" wird zum Sentinel.
    #[test]
    fn occurs_unbounded_sentinel() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="T">
                    <xs:sequence>
                        <xs:element name="item" type="xs:string"
                                    minOccurs="0" maxOccurs="unbounded"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new("", "T")).unwrap();
        let ParticleTerm::Group(group) = &ty.particle().unwrap().term else {
            panic!("sequence expected");
        };
        assert_eq!(group.particles[0].min_occurs, 0);
        assert!(group.particles[0].max_occurs.is_unbounded());
    }

    /// minOccurs > maxOccurs ist ein Strukturfehler.
    #[test]
    fn occurs_min_greater_max_rejected() {
        let err = read_err(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="T">
                    <xs:sequence>
                        <xs:element name="x" type="xs:string"
                                    minOccurs="3" maxOccurs="2"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        assert!(matches!(err, Error::SchemaStructure(_)));
    }

    // ========================================================================
    // Referenz-Auflösung
    // ========================================================================

    /// Ungebundener Prefix in type="..." ist ein harter Fehler.
    #[test]
    fn unbound_prefix_is_rejected() {
        let err = read_err(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="e" type="missing:Type"/>
            </xs:schema>
        "#,
        );
        assert!(matches!(err, Error::UnknownPrefix { .. }));
    }

    /// Der xml-Prefix ist implizit gebunden.
    #[test]
    fn xml_prefix_is_implicit() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="e" type="xml:lang"/>
            </xs:schema>
        "#,
        );
        let element = schema.get_element(&QName::new("", "e")).unwrap();
        assert_eq!(
            element.type_name.as_ref().map(|q| &*q.uri),
            Some("http://www.w3.org/XML/1998/namespace")
        );
    }

    /// Ungepräfixte Referenz löst zum Default-Namespace auf.
    #[test]
    fn unprefixed_reference_uses_default_namespace() {
        let schema = read(
            r#"
            <schema xmlns="http://www.w3.org/2001/XMLSchema">
                <element name="e" type="string"/>
            </schema>
        "#,
        );
        let element = schema.get_element(&QName::new("", "e")).unwrap();
        let ty = element.resolved_type().unwrap();
        assert_eq!(ty.name.as_ref().map(|q| &*q.local_name), Some("string"));
    }

    // ========================================================================
    // Elemente und Formen
    // ========================================================================

    /// elementFormDefault="qualified" hebt lokale Elemente in den
    /// Target Namespace.
    #[test]
    fn element_form_default_qualified() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       targetNamespace="http://example.org"
                       elementFormDefault="qualified">
                <xs:complexType name="T">
                    <xs:sequence>
                        <xs:element name="child" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new(TNS, "T")).unwrap();
        let ParticleTerm::Group(group) = &ty.particle().unwrap().term else {
            panic!("sequence expected");
        };
        let ParticleTerm::Element(child) = &group.particles[0].term else {
            panic!("element expected");
        };
        assert_eq!(child.name.as_ref().map(|q| &*q.uri), Some(TNS));
    }

    /// Default: lokale Elemente sind unqualifiziert.
    #[test]
    fn element_form_default_unqualified() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       targetNamespace="http://example.org">
                <xs:complexType name="T">
                    <xs:sequence>
                        <xs:element name="child" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new(TNS, "T")).unwrap();
        let ParticleTerm::Group(group) = &ty.particle().unwrap().term else {
            panic!("sequence expected");
        };
        let ParticleTerm::Element(child) = &group.particles[0].term else {
            panic!("element expected");
        };
        assert_eq!(child.name.as_ref().map(|q| &*q.uri), Some(""));
    }

    /// nillable, default, fixed und substitutionGroup werden übernommen.
    #[test]
    fn element_attributes() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="http://example.org"
                       targetNamespace="http://example.org">
                <xs:element name="head" type="xs:string"/>
                <xs:element name="member" type="xs:string"
                            substitutionGroup="tns:head"
                            nillable="true" default="n/a"/>
            </xs:schema>
        "#,
        );
        let member = schema.get_element(&QName::new(TNS, "member")).unwrap();
        assert!(member.nillable);
        assert_eq!(member.default_value.as_deref(), Some("n/a"));
        assert_eq!(
            member.substitution_group.as_ref().map(|q| &*q.local_name),
            Some("head")
        );
    }

    /// substitutionGroup auf lokalen Elementen ist verboten.
    #[test]
    fn local_substitution_group_rejected() {
        let err = read_err(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="http://example.org"
                       targetNamespace="http://example.org">
                <xs:element name="head" type="xs:string"/>
                <xs:complexType name="T">
                    <xs:sequence>
                        <xs:element name="bad" type="xs:string"
                                    substitutionGroup="tns:head"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        assert!(matches!(err, Error::SchemaStructure(_)));
    }

    /// Element-Refs tragen nur den Zielnamen.
    #[test]
    fn element_ref_particle() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="http://example.org"
                       targetNamespace="http://example.org">
                <xs:element name="item" type="xs:string"/>
                <xs:complexType name="T">
                    <xs:sequence>
                        <xs:element ref="tns:item" maxOccurs="unbounded"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new(TNS, "T")).unwrap();
        let ParticleTerm::Group(group) = &ty.particle().unwrap().term else {
            panic!("sequence expected");
        };
        let ParticleTerm::Element(child) = &group.particles[0].term else {
            panic!("element expected");
        };
        assert!(child.name.is_none());
        assert_eq!(
            child.ref_name.as_ref().map(|q| &*q.local_name),
            Some("item")
        );
        assert!(group.particles[0].max_occurs.is_unbounded());
    }

    // ========================================================================
    // Simple Types und Facets
    // ========================================================================

    /// Restriction mit Facets inklusive fixed-Flag.
    #[test]
    fn simple_type_restriction_facets() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:simpleType name="ZipCode">
                    <xs:restriction base="xs:string">
                        <xs:length value="5" fixed="true"/>
                        <xs:pattern value="[0-9]{5}"/>
                        <xs:enumeration value="01067"/>
                        <xs:enumeration value="04109"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new("", "ZipCode")).unwrap();
        let facets = ty.facets();
        assert_eq!(facets.len(), 4);
        assert_eq!(facets[0].kind, FacetKind::Length);
        assert!(facets[0].fixed);
        assert_eq!(facets[1].kind, FacetKind::Pattern);
        assert!(!facets[1].fixed);
        let enums: Vec<_> = facets
            .iter()
            .filter(|f| f.kind == FacetKind::Enumeration)
            .map(|f| &*f.value)
            .collect();
        assert_eq!(enums, ["01067", "04109"]);

        // Base-Slot ist gegen den Built-in aufgelöst.
        assert_eq!(
            ty.base_type().unwrap().name.as_ref().map(|q| &*q.local_name),
            Some("string")
        );
    }

    /// Unbekannter Facet-Name unter restriction ist ein harter Fehler.
    #[test]
    fn unknown_facet_rejected() {
        let err = read_err(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:simpleType name="T">
                    <xs:restriction base="xs:string">
                        <xs:assertion test="true()"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:schema>
        "#,
        );
        assert!(matches!(err, Error::UnknownFacet(name) if name == "assertion"));
    }

    /// list mit itemType und union mit memberTypes.
    #[test]
    fn simple_type_list_and_union() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:simpleType name="Sizes">
                    <xs:list itemType="xs:int"/>
                </xs:simpleType>
                <xs:simpleType name="IntOrString">
                    <xs:union memberTypes="xs:int xs:string"/>
                </xs:simpleType>
            </xs:schema>
        "#,
        );
        let sizes = schema.get_type(&QName::new("", "Sizes")).unwrap();
        let TypeKind::Simple(simple) = &sizes.kind else {
            panic!("simple expected");
        };
        let Some(SimpleTypeContent::List { item_type, .. }) = &simple.content else {
            panic!("list expected");
        };
        assert_eq!(item_type.as_ref().map(|q| &*q.local_name), Some("int"));

        let union = schema.get_type(&QName::new("", "IntOrString")).unwrap();
        let TypeKind::Simple(simple) = &union.kind else {
            panic!("simple expected");
        };
        let Some(SimpleTypeContent::Union { member_types, .. }) = &simple.content else {
            panic!("union expected");
        };
        let locals: Vec<_> = member_types.iter().map(|q| &*q.local_name).collect();
        assert_eq!(locals, ["int", "string"]);
    }

    // ========================================================================
    // Complex Types
    // ========================================================================

    /// complexContent-Extension: Base plus hinzugefügtes Particle.
    #[test]
    fn complex_content_extension() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="http://example.org"
                       targetNamespace="http://example.org">
                <xs:complexType name="Base">
                    <xs:sequence>
                        <xs:element name="id" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
                <xs:complexType name="Derived">
                    <xs:complexContent>
                        <xs:extension base="tns:Base">
                            <xs:sequence>
                                <xs:element name="extra" type="xs:string"/>
                            </xs:sequence>
                            <xs:attribute name="version" type="xs:string"/>
                        </xs:extension>
                    </xs:complexContent>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let derived = schema.get_type(&QName::new(TNS, "Derived")).unwrap();
        let model = derived.content_model().unwrap();
        assert_eq!(model.kind, ContentModelKind::Complex { mixed: false });
        let ContentDerivation::Extension(extension) = &model.content else {
            panic!("extension expected");
        };
        assert_eq!(&*extension.base.local_name, "Base");
        assert!(extension.particle.is_some());
        assert_eq!(extension.attributes.len(), 1);
        // Base-Slot aufgelöst gegen tns:Base.
        assert!(extension.base_type.is_resolved());
    }

    /// simpleContent-Restriction trägt Facets.
    #[test]
    fn simple_content_restriction_facets() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="Price">
                    <xs:simpleContent>
                        <xs:restriction base="xs:decimal">
                            <xs:totalDigits value="8"/>
                            <xs:fractionDigits value="2"/>
                        </xs:restriction>
                    </xs:simpleContent>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new("", "Price")).unwrap();
        let model = ty.content_model().unwrap();
        assert_eq!(model.kind, ContentModelKind::Simple);
        let ContentDerivation::Restriction(restriction) = &model.content else {
            panic!("restriction expected");
        };
        assert_eq!(restriction.facets.len(), 2);
        assert_eq!(restriction.facets[0].kind, FacetKind::TotalDigits);
    }

    /// mixed und abstract am complexType.
    #[test]
    fn complex_type_flags() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="Doc" mixed="true" abstract="true">
                    <xs:sequence>
                        <xs:element name="b" type="xs:string"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new("", "Doc")).unwrap();
        let TypeKind::Complex(ct) = &ty.kind else {
            panic!("complex expected");
        };
        assert!(ct.is_mixed);
        assert!(ct.is_abstract);
    }

    /// xs:any mit Namespace-Liste und processContents.
    #[test]
    fn wildcard_parsing() {
        let schema = read(
            r###"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       targetNamespace="http://example.org">
                <xs:complexType name="Open">
                    <xs:sequence>
                        <xs:any namespace="##targetNamespace ##local http://other.org"
                                processContents="lax" minOccurs="0"/>
                    </xs:sequence>
                    <xs:anyAttribute namespace="##other" processContents="skip"/>
                </xs:complexType>
            </xs:schema>
        "###,
        );
        let ty = schema.get_type(&QName::new(TNS, "Open")).unwrap();
        let ParticleTerm::Group(group) = &ty.particle().unwrap().term else {
            panic!("sequence expected");
        };
        let ParticleTerm::Any(wildcard) = &group.particles[0].term else {
            panic!("wildcard expected");
        };
        assert_eq!(wildcard.process_contents, ProcessContents::Lax);
        let NamespaceConstraint::List(namespaces) = &wildcard.namespace_constraint else {
            panic!("namespace list expected");
        };
        let entries: Vec<_> = namespaces.iter().map(|ns| &**ns).collect();
        assert_eq!(entries, [TNS, "", "http://other.org"]);

        let TypeKind::Complex(ct) = &ty.kind else {
            panic!("complex expected");
        };
        let any_attribute = ct.any_attribute.as_ref().unwrap();
        assert_eq!(any_attribute.namespace_constraint, NamespaceConstraint::Other);
        assert_eq!(any_attribute.process_contents, ProcessContents::Skip);
    }

    // ========================================================================
    // Attribute und Attribute Groups
    // ========================================================================

    /// use, fixed und Typ-Auflösung an Attributen.
    #[test]
    fn attribute_use_and_fixed() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:complexType name="T">
                    <xs:attribute name="id" type="xs:string" use="required" fixed="2"/>
                    <xs:attribute name="note" type="xs:string" use="prohibited"/>
                </xs:complexType>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new("", "T")).unwrap();
        let attrs = ty.attributes();
        assert_eq!(attrs.len(), 2);
        let AttributeEntry::Attribute(id) = &attrs[0] else {
            panic!("attribute expected");
        };
        assert_eq!(id.use_, AttributeUse::Required);
        assert_eq!(id.fixed_value.as_deref(), Some("2"));
        assert!(id.resolved_type().is_some());
        let AttributeEntry::Attribute(note) = &attrs[1] else {
            panic!("attribute expected");
        };
        assert_eq!(note.use_, AttributeUse::Prohibited);
    }

    /// attributeGroup-Referenzen werden dokumentlokal aufgelöst, auch
    /// vorwärts.
    #[test]
    fn attribute_group_forward_reference() {
        let schema = read(
            r###"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="http://example.org"
                       targetNamespace="http://example.org">
                <xs:complexType name="T">
                    <xs:attributeGroup ref="tns:common"/>
                </xs:complexType>
                <xs:attributeGroup name="common">
                    <xs:attribute name="id" type="xs:ID"/>
                    <xs:anyAttribute namespace="##any"/>
                </xs:attributeGroup>
            </xs:schema>
        "###,
        );
        let ty = schema.get_type(&QName::new(TNS, "T")).unwrap();
        let AttributeEntry::GroupRef(group_ref) = &ty.attributes()[0] else {
            panic!("group ref expected");
        };
        let resolved = group_ref.resolved.borrow();
        let group = resolved.as_ref().unwrap();
        assert_eq!(group.attributes.len(), 1);
        assert!(group.any_attribute.is_some());
    }

    /// Benannte Groups: Vorwärtsreferenz im selben Dokument.
    #[test]
    fn group_forward_reference() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="http://example.org"
                       targetNamespace="http://example.org">
                <xs:complexType name="T">
                    <xs:group ref="tns:body" maxOccurs="unbounded"/>
                </xs:complexType>
                <xs:group name="body">
                    <xs:choice>
                        <xs:element name="a" type="xs:string"/>
                        <xs:element name="b" type="xs:string"/>
                    </xs:choice>
                </xs:group>
            </xs:schema>
        "#,
        );
        let ty = schema.get_type(&QName::new(TNS, "T")).unwrap();
        let particle = ty.particle().unwrap();
        assert!(particle.max_occurs.is_unbounded());
        let ParticleTerm::GroupRef(group_ref) = &particle.term else {
            panic!("group ref expected");
        };
        let target = group_ref.particle().unwrap();
        let ParticleTerm::Group(choice) = &target.term else {
            panic!("choice expected");
        };
        assert_eq!(choice.compositor, Compositor::Choice);
        assert_eq!(choice.particles.len(), 2);
    }

    // ========================================================================
    // Identity Constraints
    // ========================================================================

    /// key/keyref/unique mit Selector und Feldern.
    #[test]
    fn identity_constraints() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:tns="http://example.org"
                       targetNamespace="http://example.org">
                <xs:element name="orders">
                    <xs:complexType>
                        <xs:sequence>
                            <xs:element name="order" type="xs:string"
                                        maxOccurs="unbounded"/>
                        </xs:sequence>
                    </xs:complexType>
                    <xs:key name="orderKey">
                        <xs:selector xpath="tns:order"/>
                        <xs:field xpath="@id"/>
                    </xs:key>
                    <xs:keyref name="orderRef" refer="tns:orderKey">
                        <xs:selector xpath="tns:order"/>
                        <xs:field xpath="@parent"/>
                    </xs:keyref>
                </xs:element>
            </xs:schema>
        "#,
        );
        let orders = schema.get_element(&QName::new(TNS, "orders")).unwrap();
        assert_eq!(orders.identity_constraints.len(), 2);

        let key = &orders.identity_constraints[0];
        assert_eq!(key.kind, IdentityConstraintKind::Key);
        assert_eq!(&*key.selector, "tns:order");
        assert_eq!(key.fields.iter().map(|f| &**f).collect::<Vec<_>>(), ["@id"]);

        let keyref = &orders.identity_constraints[1];
        let IdentityConstraintKind::KeyRef { refer } = &keyref.kind else {
            panic!("keyref expected");
        };
        assert_eq!(&*refer.local_name, "orderKey");
    }

    /// keyref ohne refer ist ein Strukturfehler.
    #[test]
    fn keyref_without_refer_rejected() {
        let err = read_err(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="e" type="xs:string">
                    <xs:keyref name="broken">
                        <xs:selector xpath="x"/>
                        <xs:field xpath="@y"/>
                    </xs:keyref>
                </xs:element>
            </xs:schema>
        "#,
        );
        assert!(matches!(err, Error::SchemaStructure(_)));
    }

    // ========================================================================
    // Annotation und Extensions
    // ========================================================================

    /// Dokumentation landet im Payload des Besitzers.
    #[test]
    fn annotation_capture() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:annotation>
                    <xs:documentation>Bestellschema</xs:documentation>
                </xs:annotation>
                <xs:element name="order" type="xs:string">
                    <xs:annotation>
                        <xs:documentation>Eine Bestellung</xs:documentation>
                        <xs:appinfo>ui:hidden</xs:appinfo>
                    </xs:annotation>
                </xs:element>
            </xs:schema>
        "#,
        );
        assert_eq!(schema.meta().documentation, ["Bestellschema"]);
        let order = schema.get_element(&QName::new("", "order")).unwrap();
        assert_eq!(order.meta.documentation, ["Eine Bestellung"]);
        assert_eq!(order.meta.app_info, ["ui:hidden"]);
    }

    /// Fremde Attribute und Elemente überleben in den Metadaten-Buckets.
    #[test]
    fn foreign_content_round_trips_via_buckets() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                       xmlns:ui="http://example.org/ui">
                <xs:element name="order" type="xs:string" ui:widget="dropdown"/>
                <ui:layout columns="2"/>
            </xs:schema>
        "#,
        );
        let order = schema.get_element(&QName::new("", "order")).unwrap();
        let widget = QName::new("http://example.org/ui", "widget");
        assert_eq!(
            order.meta.external_attributes.get(&widget).map(String::as_str),
            Some("dropdown")
        );

        let layout = QName::new("http://example.org/ui", "layout");
        let raw = schema.meta().external_elements.get(&layout).unwrap();
        assert!(raw.contains("columns=\"2\""));
    }

    /// Anonyme Inline-Typen hängen direkt am Element.
    #[test]
    fn inline_anonymous_types() {
        let schema = read(
            r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <xs:element name="point">
                    <xs:complexType>
                        <xs:sequence>
                            <xs:element name="x" type="xs:double"/>
                            <xs:element name="y" type="xs:double"/>
                        </xs:sequence>
                    </xs:complexType>
                </xs:element>
            </xs:schema>
        "#,
        );
        let point = schema.get_element(&QName::new("", "point")).unwrap();
        let ty = point.resolved_type().unwrap();
        assert!(ty.name.is_none());
        assert!(ty.is_complex());
        let ParticleTerm::Group(group) = &ty.particle().unwrap().term else {
            panic!("sequence expected");
        };
        assert_eq!(group.particles.len(), 2);
    }
}
