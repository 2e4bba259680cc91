//! Dokumentübergreifende Szenarien: include, import, redefine, Chameleon,
//! Zyklen und Memoisierung.

use std::rc::Rc;

use xsom::{
    AcceptAnyNamespace, Error, MapResolver, QName, SchemaCollection, SchemaItem,
};

const TNS: &str = "http://example.org/main";

fn collection_with(entries: &[(&str, &str)]) -> SchemaCollection {
    let mut resolver = MapResolver::new();
    for (location, content) in entries {
        resolver.insert(location, content);
    }
    SchemaCollection::with_resolver(Box::new(resolver))
}

/// include zieht die Definitionen des Ziels in die Collection; Referenzen
/// aus dem einbindenden Dokument lösen dagegen auf.
#[test]
fn include_resolves_definitions() {
    let common = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:simpleType name="Code">
                <xs:restriction base="xs:string">
                    <xs:length value="3"/>
                </xs:restriction>
            </xs:simpleType>
        </xs:schema>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:tns="http://example.org/main"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="common.xsd"/>
            <xs:element name="code" type="tns:Code"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[("common.xsd", common)]);
    let schema = collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap();

    let element = schema.get_element(&QName::new(TNS, "code")).unwrap();
    let via_element = element.resolved_type().unwrap();
    let via_lookup = collection
        .get_type_by_qname(&QName::new(TNS, "Code"))
        .unwrap();
    assert!(Rc::ptr_eq(&via_element, &via_lookup));

    // Der Include-Eintrag trägt das aufgelöste Dokument.
    let include = schema
        .items()
        .iter()
        .find_map(|item| match item {
            SchemaItem::Include(include) => Some(include.clone()),
            _ => None,
        })
        .unwrap();
    assert!(include.schema.borrow().is_some());
}

/// Chameleon: ein Dokument ohne targetNamespace erbt beim include den
/// logischen Namespace des Parents; unqualifizierte Referenzen im
/// eingebundenen Dokument lösen gegen diesen Namespace auf.
#[test]
fn chameleon_include_namespace_fallback() {
    let chameleon = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:simpleType name="Inner">
                <xs:restriction base="xs:string"/>
            </xs:simpleType>
            <xs:element name="inner" type="Inner"/>
        </xs:schema>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="chameleon.xsd"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[("chameleon.xsd", chameleon)]);
    collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap();

    // Typ und Element liegen im geerbten Namespace.
    let inner_type = collection
        .get_type_by_qname(&QName::new(TNS, "Inner"))
        .unwrap();
    let inner_element = collection
        .get_element_by_qname(&QName::new(TNS, "inner"))
        .unwrap();

    // Die unqualifizierte type-Referenz hat über den logischen Namespace
    // aufgelöst: dieselbe Instanz wie der Lookup.
    let resolved = inner_element.resolved_type().unwrap();
    assert!(Rc::ptr_eq(&resolved, &inner_type));
}

/// Namespace-Konsistenz: ein include auf ein Dokument mit fremdem
/// targetNamespace ist ein harter Fehler.
#[test]
fn include_namespace_mismatch_rejected() {
    let other = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/other"/>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="other.xsd"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[("other.xsd", other)]);
    let err = collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::NamespaceMismatch {
            construct: "include",
            ..
        }
    ));
}

/// import: das deklarierte namespace-Attribut muss zum Ziel passen.
#[test]
fn import_namespace_mismatch_rejected() {
    let other = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/other"/>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:import namespace="http://example.org/expected"
                       schemaLocation="other.xsd"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[("other.xsd", other)]);
    let err = collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::NamespaceMismatch {
            construct: "import",
            ..
        }
    ));
}

/// Cross-Namespace-Referenzen über import.
#[test]
fn import_cross_namespace_reference() {
    let types = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/types">
            <xs:simpleType name="Money">
                <xs:restriction base="xs:decimal">
                    <xs:fractionDigits value="2"/>
                </xs:restriction>
            </xs:simpleType>
        </xs:schema>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:t="http://example.org/types"
                   targetNamespace="http://example.org/main">
            <xs:import namespace="http://example.org/types"
                       schemaLocation="types.xsd"/>
            <xs:element name="price" type="t:Money"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[("types.xsd", types)]);
    let schema = collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap();

    let price = schema.get_element(&QName::new(TNS, "price")).unwrap();
    let money = collection
        .get_type_by_qname(&QName::new("http://example.org/types", "Money"))
        .unwrap();
    assert!(Rc::ptr_eq(&price.resolved_type().unwrap(), &money));
}

/// Zyklus: A include B include A terminiert und registriert jedes Dokument
/// genau einmal.
#[test]
fn include_cycle_terminates() {
    let a = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="b.xsd"/>
            <xs:simpleType name="FromA">
                <xs:restriction base="xs:string"/>
            </xs:simpleType>
        </xs:schema>
    "#;
    let b = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="a.xsd"/>
            <xs:simpleType name="FromB">
                <xs:restriction base="xs:string"/>
            </xs:simpleType>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[("a.xsd", a), ("b.xsd", b)]);
    collection
        .read_with_system_id(a, "a.xsd", &AcceptAnyNamespace)
        .unwrap();

    // Built-ins + a.xsd + b.xsd, nichts doppelt.
    assert_eq!(collection.schemas().len(), 3);
    assert!(
        collection
            .get_type_by_qname(&QName::new(TNS, "FromA"))
            .is_some()
    );
    assert!(
        collection
            .get_type_by_qname(&QName::new(TNS, "FromB"))
            .is_some()
    );
}

/// Diamant: zwei Pfade zum selben Dokument ergeben eine Instanz.
#[test]
fn diamond_include_registers_once() {
    let common = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:simpleType name="Shared">
                <xs:restriction base="xs:string"/>
            </xs:simpleType>
        </xs:schema>
    "#;
    let left = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="common.xsd"/>
        </xs:schema>
    "#;
    let right = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="common.xsd"/>
        </xs:schema>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="left.xsd"/>
            <xs:include schemaLocation="right.xsd"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[
        ("common.xsd", common),
        ("left.xsd", left),
        ("right.xsd", right),
    ]);
    collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap();

    // Built-ins + main + left + right + common.
    assert_eq!(collection.schemas().len(), 5);
}

/// redefine: die überschreibende Definition gewinnt für neue Referenzen,
/// ihre eigene base-Referenz trifft noch die eingebundene Definition.
#[test]
fn redefine_overrides_included_definition() {
    let base = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:simpleType name="Size">
                <xs:restriction base="xs:string"/>
            </xs:simpleType>
        </xs:schema>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:tns="http://example.org/main"
                   targetNamespace="http://example.org/main">
            <xs:redefine schemaLocation="base.xsd">
                <xs:simpleType name="Size">
                    <xs:restriction base="tns:Size">
                        <xs:maxLength value="10"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:redefine>
            <xs:element name="size" type="tns:Size"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[("base.xsd", base)]);
    let schema = collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap();

    // Das redefinierende Dokument sieht die Override-Version.
    let size = schema.get_type(&QName::new(TNS, "Size")).unwrap();
    assert_eq!(size.facets().len(), 1);

    // Die Override-Version schränkt die eingebundene Version ein, nicht
    // sich selbst.
    let included_base = size.base_type().unwrap();
    assert!(included_base.facets().is_empty());
    assert!(!Rc::ptr_eq(&included_base, size));

    // Neue Referenzen treffen die Override-Version.
    let element = schema.get_element(&QName::new(TNS, "size")).unwrap();
    assert!(Rc::ptr_eq(&element.resolved_type().unwrap(), size));
}

/// Nicht auflösbare imports sind kein Fehler: der Eintrag bleibt offen.
#[test]
fn unresolvable_import_is_not_fatal() {
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:import namespace="http://example.org/missing"
                       schemaLocation="missing.xsd"/>
        </xs:schema>
    "#;

    let mut collection = collection_with(&[]);
    let schema = collection
        .read_with_system_id(main, "main.xsd", &AcceptAnyNamespace)
        .unwrap();

    let import = schema
        .items()
        .iter()
        .find_map(|item| match item {
            SchemaItem::Import(import) => Some(import.clone()),
            _ => None,
        })
        .unwrap();
    assert!(import.schema.borrow().is_none());
}

/// Relative schemaLocations lösen vom Verzeichnis des einbindenden
/// Dokuments auf.
#[test]
fn relative_locations_resolve_against_parent() {
    let nested = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:simpleType name="Deep">
                <xs:restriction base="xs:string"/>
            </xs:simpleType>
        </xs:schema>
    "#;
    let main = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.org/main">
            <xs:include schemaLocation="nested.xsd"/>
        </xs:schema>
    "#;

    // Der Resolver sieht die bereits kombinierte Basis des Parents.
    let mut collection = collection_with(&[("schemas/nested.xsd", nested)]);
    collection
        .read_with_system_id(main, "schemas/main.xsd", &AcceptAnyNamespace)
        .unwrap();
    assert!(
        collection
            .get_type_by_qname(&QName::new(TNS, "Deep"))
            .is_some()
    );
}
