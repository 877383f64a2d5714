// End-to-end tests: source text in, compiled schema and exports out.

use schemata_core::error::SchemataError;
use schemata_core::model::{ContentModel, Structure, StructureListKind};
use schemata_core::{compile_str, export_schema_as_xsd};

const PAGE_FORMAT: &str = r#"
    /* Format Name: Page Format */

    dataType status {
        /* Description: the workflow status of a page
           Example Value: draft
        */
        baseType: string;
        allowedValues: 'draft', 'published';
    }

    dataType title_text {
        baseType: string;
        allowedPattern: '[A-Za-z0-9 ]+';
    }

    attribute status_attr {
        tagName: 'status';
        valueType: status;
    }

    element title {
        allowedContent: title_text;
    }

    element paragraph {
        allowedContent: *any text*;
    }

    root element page {
        attributes: [status_attr];
        allowedContent: [title, paragraph (n >= 0)];
    }
"#;

#[test]
fn test_compiles_the_page_format() {
    let schema = compile_str(PAGE_FORMAT, "page.schema").unwrap();

    assert_eq!(schema.format_name.as_deref(), Some("Page Format"));
    assert_eq!(schema.structures.len(), 6);
    assert_eq!(schema.root_element_structures().count(), 1);
}

#[test]
fn test_content_disambiguation_rewrites_data_references() {
    let schema = compile_str(PAGE_FORMAT, "page.schema").unwrap();

    let Some(Structure::Element(title)) = schema.structure_by_reference("title") else {
        panic!("title is not an element structure");
    };

    // 'title_text' names a data structure, so the content becomes a value.
    assert!(matches!(
        title.allowed_content,
        Some(ContentModel::Data(_))
    ));
    assert_eq!(title.value_type_reference.as_deref(), Some("title_text"));
    assert!(title.content_is_single_value());
}

#[test]
fn test_subelement_list_keeps_order_and_bounds() {
    let schema = compile_str(PAGE_FORMAT, "page.schema").unwrap();

    let Some(Structure::Element(page)) = schema.structure_by_reference("page") else {
        panic!("page is not an element structure");
    };

    let Some(ContentModel::List(list)) = &page.allowed_content else {
        panic!("page content is not a list");
    };

    assert_eq!(list.kind, StructureListKind::Ordered);
    assert_eq!(list.structures.len(), 2);

    let ContentModel::Element(paragraph) = &list.structures[1] else {
        panic!("second item is not an element usage");
    };

    assert_eq!(paragraph.minimum_number_of_occurrences, 0);
    assert_eq!(paragraph.maximum_number_of_occurrences, -1);
}

#[test]
fn test_all_structures_are_reachable_from_the_root() {
    let schema = compile_str(PAGE_FORMAT, "page.schema").unwrap();

    for structure in &schema.structures {
        assert!(structure.is_used(), "{} is unused", structure.reference());
    }
}

#[test]
fn test_unreferenced_structures_are_not_marked_used() {
    let source = r#"
        dataType orphan {
            baseType: string;
        }

        root element page {
            allowedContent: *any text*;
        }
    "#;

    let schema = compile_str(source, "page.schema").unwrap();

    let orphan = schema.structure_by_reference("orphan").unwrap();
    assert!(!orphan.is_used());

    let page = schema.structure_by_reference("page").unwrap();
    assert!(page.is_used());
}

#[test]
fn test_xsd_export_of_the_page_format() {
    let schema = compile_str(PAGE_FORMAT, "page.schema").unwrap();
    let xsd = export_schema_as_xsd(&schema, "1.0").unwrap();

    assert!(xsd.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    assert!(xsd.contains("Page Format (1.0)"));

    // One simple type per used data structure.
    assert_eq!(xsd.matches(r#"<xs:simpleType name="__type__d__status">"#).count(), 1);
    assert!(xsd.contains(r#"<xs:enumeration value="draft"/>"#));
    assert!(xsd.contains(r#"<xs:pattern value="[A-Za-z0-9 ]+"/>"#));

    // The root element is declared once, by type reference.
    assert_eq!(
        xsd.matches(r#"<xs:element name="page" type="__type__e__page"/>"#).count(),
        1
    );

    // Unbounded usages appear as maxOccurs="unbounded" inside a sequence.
    assert!(xsd.contains(r#"maxOccurs="unbounded""#));
    assert!(xsd.contains(r#"<xs:attribute name="status" type="__type__d__status" use="required"/>"#));
}

#[test]
fn test_list_function_synthesizes_a_pattern_data_structure() {
    let source = r#"
        dataType status {
            baseType: string;
            allowedValues: 'draft', 'published';
        }

        attribute tags {
            valueType: list(status, ',');
        }

        root element page {
            attributes: tags;
            allowedContent: *any text*;
        }
    "#;

    let schema = compile_str(source, "page.schema").unwrap();

    let Some(Structure::Data(synthesized)) = schema.structure_by_reference("list_of__status")
    else {
        panic!("no synthesized data structure");
    };

    let pattern = regex::Regex::new(&format!(
        "^{}$",
        synthesized.pattern.as_deref().unwrap()
    ))
    .unwrap();

    assert!(pattern.is_match("draft"));
    assert!(pattern.is_match("draft , published"));
    assert!(!pattern.is_match("draft;published"));
}

#[test]
fn test_duplicate_reference_is_a_parse_error() {
    let source = r#"
        dataType status { baseType: string; }
        dataType status { baseType: string; }
    "#;

    let error = compile_str(source, "dup.schema").unwrap_err();

    match error {
        SchemataError::Parser(parser_error) => {
            assert!(parser_error.to_string().contains("status"));
        }
        other => panic!("expected a parser error, got {other}"),
    }
}

#[test]
fn test_trailing_garbage_is_a_parse_error() {
    let source = r#"
        dataType status { baseType: string; }
        garbage
    "#;

    let result = compile_str(source, "garbage.schema");
    assert!(matches!(result, Err(SchemataError::Parser(_))));
}
