//! Bootstrap der XSD-Built-in-Datentyp-Hierarchie (XSD 1.0 Part 2 §3).
//!
//! Beim Aufbau einer Collection wird ein synthetisches Dokument für den
//! XSD-Namespace registriert, das die 19 primitiven Typen und sämtliche
//! abgeleiteten Typen samt ihrer Ableitungsbeziehungen enthält: die
//! String-Familie per restriction, die Integer-Familie per restriction mit
//! expliziten Bereichs-Facets, `NMTOKENS`/`IDREFS`/`ENTITIES` per list von
//! ihren Singular-Typen. Die Hierarchie steht vollständig, bevor das erste
//! Nutzerdokument geparst wird — Nutzerschemas dürfen jeden dieser Typen
//! sofort referenzieren und weiter einschränken.

use std::rc::Rc;

use crate::collection::SchemaCollection;
use crate::qname::QName;
use crate::schema::{
    ComplexType, Facet, FacetKind, MaxOccurs, ObjectMeta, Particle, ParticleTerm, SchemaItem,
    SchemaType, SimpleType, SimpleTypeContent, TypeKind, TypeSlot, Wildcard, XmlSchema, XS_NS,
};

/// Die 19 primitiven Typen (XSD 1.0 Part 2 §3.2).
const PRIMITIVES: &[&str] = &[
    "string",
    "boolean",
    "decimal",
    "float",
    "double",
    "duration",
    "dateTime",
    "time",
    "date",
    "gYearMonth",
    "gYear",
    "gMonthDay",
    "gDay",
    "gMonth",
    "hexBinary",
    "base64Binary",
    "anyURI",
    "QName",
    "NOTATION",
];

/// Baut das Built-in-Dokument und registriert alle Typen in der Collection.
pub(crate) fn register_builtin_schema(collection: &mut SchemaCollection) {
    let mut schema = XmlSchema::new(Some(XS_NS), None, None);

    register_any_type(collection, &mut schema);
    register_simple(collection, &mut schema, "anySimpleType", "anyType", &[]);

    // Primitive: string behält Whitespace, alle anderen kollabieren fix
    // (XSD 1.0 Part 2 §3.2, jeweils "whiteSpace").
    for primitive in PRIMITIVES {
        let facets: &[(FacetKind, &str, bool)] = if *primitive == "string" {
            &[(FacetKind::WhiteSpace, "preserve", false)]
        } else {
            &[(FacetKind::WhiteSpace, "collapse", true)]
        };
        register_simple(collection, &mut schema, primitive, "anySimpleType", facets);
    }

    // String-Familie (XSD 1.0 Part 2 §3.3.1 ff.).
    register_simple(
        collection,
        &mut schema,
        "normalizedString",
        "string",
        &[(FacetKind::WhiteSpace, "replace", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "token",
        "normalizedString",
        &[(FacetKind::WhiteSpace, "collapse", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "language",
        "token",
        &[(
            FacetKind::Pattern,
            "[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*",
            false,
        )],
    );
    register_simple(
        collection,
        &mut schema,
        "NMTOKEN",
        "token",
        &[(FacetKind::Pattern, r"\c+", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "Name",
        "token",
        &[(FacetKind::Pattern, r"\i\c*", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "NCName",
        "Name",
        &[(FacetKind::Pattern, r"[\i-[:]][\c-[:]]*", false)],
    );
    register_simple(collection, &mut schema, "ID", "NCName", &[]);
    register_simple(collection, &mut schema, "IDREF", "NCName", &[]);
    register_simple(collection, &mut schema, "ENTITY", "NCName", &[]);

    // Die Plural-Typen leiten per list von ihren Singular-Typen ab
    // (XSD 1.0 Part 2 §3.3.4/§3.3.10/§3.3.12).
    register_list(collection, &mut schema, "NMTOKENS", "NMTOKEN");
    register_list(collection, &mut schema, "IDREFS", "IDREF");
    register_list(collection, &mut schema, "ENTITIES", "ENTITY");

    // Integer-Familie (XSD 1.0 Part 2 §3.3.13 ff.) mit expliziten
    // Bereichs-Facets.
    register_simple(
        collection,
        &mut schema,
        "integer",
        "decimal",
        &[
            (FacetKind::FractionDigits, "0", true),
            (FacetKind::Pattern, r"[\-+]?[0-9]+", false),
        ],
    );
    register_simple(
        collection,
        &mut schema,
        "nonPositiveInteger",
        "integer",
        &[(FacetKind::MaxInclusive, "0", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "negativeInteger",
        "nonPositiveInteger",
        &[(FacetKind::MaxInclusive, "-1", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "long",
        "integer",
        &[
            (FacetKind::MinInclusive, "-9223372036854775808", false),
            (FacetKind::MaxInclusive, "9223372036854775807", false),
        ],
    );
    register_simple(
        collection,
        &mut schema,
        "int",
        "long",
        &[
            (FacetKind::MinInclusive, "-2147483648", false),
            (FacetKind::MaxInclusive, "2147483647", false),
        ],
    );
    register_simple(
        collection,
        &mut schema,
        "short",
        "int",
        &[
            (FacetKind::MinInclusive, "-32768", false),
            (FacetKind::MaxInclusive, "32767", false),
        ],
    );
    register_simple(
        collection,
        &mut schema,
        "byte",
        "short",
        &[
            (FacetKind::MinInclusive, "-128", false),
            (FacetKind::MaxInclusive, "127", false),
        ],
    );
    register_simple(
        collection,
        &mut schema,
        "nonNegativeInteger",
        "integer",
        &[(FacetKind::MinInclusive, "0", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "unsignedLong",
        "nonNegativeInteger",
        &[(FacetKind::MaxInclusive, "18446744073709551615", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "unsignedInt",
        "unsignedLong",
        &[(FacetKind::MaxInclusive, "4294967295", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "unsignedShort",
        "unsignedInt",
        &[(FacetKind::MaxInclusive, "65535", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "unsignedByte",
        "unsignedShort",
        &[(FacetKind::MaxInclusive, "255", false)],
    );
    register_simple(
        collection,
        &mut schema,
        "positiveInteger",
        "nonNegativeInteger",
        &[(FacetKind::MinInclusive, "1", false)],
    );

    collection.insert_schema(schema);
}

/// `xs:anyType`: der Ur-Typ — mixed Content mit Element- und
/// Attribut-Wildcard (XSD 1.0 Part 1 §3.4.7).
fn register_any_type(collection: &mut SchemaCollection, schema: &mut XmlSchema) {
    let name = Rc::new(QName::new(XS_NS, "anyType"));
    let ty = Rc::new(SchemaType {
        name: Some(name.clone()),
        kind: TypeKind::Complex(ComplexType {
            particle: Some(Rc::new(Particle {
                min_occurs: 0,
                max_occurs: MaxOccurs::Unbounded,
                term: ParticleTerm::Any(Wildcard::lax_any()),
                meta: ObjectMeta::default(),
            })),
            any_attribute: Some(Wildcard::lax_any()),
            is_mixed: true,
            ..ComplexType::default()
        }),
        meta: ObjectMeta::default(),
    });
    schema.types.insert(name.clone(), ty.clone());
    schema.items.push(SchemaItem::Type(ty.clone()));
    collection.register_type(name, ty);
}

/// Registriert einen per restriction abgeleiteten Simple Type.
///
/// Die Typen werden in Ableitungsreihenfolge registriert, der Base-Slot
/// löst daher sofort auf.
fn register_simple(
    collection: &mut SchemaCollection,
    schema: &mut XmlSchema,
    name: &str,
    base: &str,
    facets: &[(FacetKind, &str, bool)],
) {
    let qname = Rc::new(QName::new(XS_NS, name));
    let base_qname = Rc::new(QName::new(XS_NS, base));
    let base_type = TypeSlot::new();
    collection.request_type(&base_qname, &base_type);

    let ty = Rc::new(SchemaType {
        name: Some(qname.clone()),
        kind: TypeKind::Simple(SimpleType {
            content: Some(SimpleTypeContent::Restriction {
                base: Some(base_qname),
                base_type,
                inline_base: None,
                facets: facets
                    .iter()
                    .map(|(kind, value, fixed)| Facet::new(*kind, value, *fixed))
                    .collect(),
            }),
        }),
        meta: ObjectMeta::default(),
    });
    schema.types.insert(qname.clone(), ty.clone());
    schema.items.push(SchemaItem::Type(ty.clone()));
    collection.register_type(qname, ty);
}

/// Registriert einen per list abgeleiteten Simple Type.
fn register_list(
    collection: &mut SchemaCollection,
    schema: &mut XmlSchema,
    name: &str,
    item: &str,
) {
    let qname = Rc::new(QName::new(XS_NS, name));
    let ty = Rc::new(SchemaType {
        name: Some(qname.clone()),
        kind: TypeKind::Simple(SimpleType {
            content: Some(SimpleTypeContent::List {
                item_type: Some(Rc::new(QName::new(XS_NS, item))),
                inline_item: None,
            }),
        }),
        meta: ObjectMeta::default(),
    });
    schema.types.insert(qname.clone(), ty.clone());
    schema.items.push(SchemaItem::Type(ty.clone()));
    collection.register_type(qname, ty);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Alle 19 Primitiven plus Ur-Typen sind nach dem Bootstrap auffindbar.
    #[test]
    fn all_primitives_registered() {
        let collection = SchemaCollection::new();
        for name in PRIMITIVES.iter().chain(&["anyType", "anySimpleType"]) {
            assert!(
                collection
                    .get_type_by_qname(&QName::new(XS_NS, name))
                    .is_some(),
                "missing built-in type {name}"
            );
        }
    }

    /// anyType ist complex und mixed, alles andere simple.
    #[test]
    fn any_type_is_the_only_complex_builtin() {
        let collection = SchemaCollection::new();
        let any_type = collection
            .get_type_by_qname(&QName::new(XS_NS, "anyType"))
            .unwrap();
        assert!(any_type.is_complex());

        let string = collection
            .get_type_by_qname(&QName::new(XS_NS, "string"))
            .unwrap();
        assert!(string.is_simple());
    }

    /// Die String-Familie hängt per restriction zusammen.
    #[test]
    fn string_family_chain() {
        let collection = SchemaCollection::new();
        let token = collection
            .get_type_by_qname(&QName::new(XS_NS, "token"))
            .unwrap();
        assert_eq!(
            token.base_type_name().map(|q| &*q.local_name),
            Some("normalizedString")
        );
        assert_eq!(
            token
                .base_type()
                .unwrap()
                .base_type_name()
                .map(|q| &*q.local_name),
            Some("string")
        );
    }
}
