//! Post-processing passes over a freshly parsed [`Schema`].
//!
//! Three passes run in order once all structures of a file are parsed:
//! element-vs-data disambiguation, list-function expansion, and
//! used-reachability marking. Each pass looks structures up through the
//! schema so that references into direct imports resolve, but only local
//! structures are rewritten.

use std::collections::HashSet;

use crate::model::{
    AttributeUsage, AttributeValueType, ContentModel, DataStructure, DataUsageReference,
    PropertyUsage, Scalar, Schema, Structure,
};

pub fn run(schema: &mut Schema) {
    resolve_data_usages(schema);
    expand_list_functions(schema);
    mark_used(schema);
}

/// Rewrites bare content references that turn out to name a data structure.
///
/// In content position the grammar cannot tell "one child element X" from
/// "a text value of data type X", so the parser records every bare
/// reference as an element usage. Here the referenced structure is known:
/// when it is a data structure, the content becomes a data usage and the
/// element remembers its value type.
fn resolve_data_usages(schema: &mut Schema) {
    let mut rewrites: Vec<(usize, String)> = Vec::new();

    for (index, structure) in schema.structures.iter().enumerate() {
        let Structure::Element(element) = structure else {
            continue;
        };

        let Some(ContentModel::Element(usage)) = &element.allowed_content else {
            continue;
        };

        if let Some(Structure::Data(data)) =
            schema.structure_by_reference(&usage.element_structure_reference)
        {
            rewrites.push((index, data.reference.clone()));
        }
    }

    for (index, reference) in rewrites {
        if let Structure::Element(element) = &mut schema.structures[index] {
            log::debug!(
                "Content of element '{}' resolves to data structure '{reference}'.",
                element.reference
            );

            element.value_type_reference = Some(reference.clone());
            element.allowed_content = Some(ContentModel::Data(DataUsageReference {
                data_structure_reference: reference,
            }));
        }
    }
}

/// Expands `list(ref, "sep")` value types into synthesized data structures.
///
/// For each attribute whose declared value type is a list function, a new
/// data structure named `list_of__<ref>` is appended to the schema. Its
/// pattern repeats the referenced structure's enumeration (or pattern)
/// with the separator, and the attribute is repointed at it. The source
/// structure is marked used here, since the synthesized pattern embeds its
/// value space.
fn expand_list_functions(schema: &mut Schema) {
    struct Expansion {
        index: usize,
        synthesized: DataStructure,
        marked: Vec<String>,
    }

    let mut expansions: Vec<Expansion> = Vec::new();

    for (index, structure) in schema.structures.iter().enumerate() {
        let Structure::Attribute(attribute) = structure else {
            continue;
        };

        let Some(AttributeValueType::List(function)) = &attribute.value_type else {
            continue;
        };

        let source = match schema.structure_by_reference(&function.data_structure_reference) {
            Some(Structure::Data(data)) => data,
            _ => {
                log::warn!(
                    "The list function on attribute '{}' references '{}', which does not resolve to a data structure.",
                    attribute.reference,
                    function.data_structure_reference
                );
                continue;
            }
        };

        let pattern = if !source.allowed_values.is_empty() {
            source
                .allowed_values
                .iter()
                .map(scalar_to_pattern)
                .collect::<Vec<_>>()
                .join("|")
        } else {
            source.pattern.clone().unwrap_or_default()
        };

        let mut synthesized = DataStructure::new(format!("list_of__{}", source.reference));
        synthesized.base_structure_reference = Some("string".to_string());
        synthesized.pattern = Some(format!(
            r"({pattern})(\s*{separator}\s*({pattern}))*",
            separator = function.separator
        ));

        log::debug!("Creating list data structure '{}'.", synthesized.reference);

        expansions.push(Expansion {
            index,
            synthesized,
            marked: base_chain(schema, &source.reference),
        });
    }

    for expansion in expansions {
        let reachable: HashSet<String> = expansion.marked.into_iter().collect();
        apply_used_flags(schema, &reachable);

        if let Structure::Attribute(attribute) = &mut schema.structures[expansion.index] {
            attribute.value_type = Some(AttributeValueType::Reference(
                expansion.synthesized.reference.clone(),
            ));
        }

        schema.structures.push(Structure::Data(expansion.synthesized));
    }
}

/// Marks every structure reachable from a root element or root object as
/// used. Unreached structures keep `is_used = false` and exporters omit
/// them. A reference that resolves to nothing is logged and skipped; a
/// cyclic reference chain terminates because each reference is visited at
/// most once.
fn mark_used(schema: &mut Schema) {
    let mut pending: Vec<String> = schema
        .root_element_structures()
        .map(|e| e.reference.clone())
        .chain(schema.root_object_structures().map(|o| o.reference.clone()))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();

    while let Some(reference) = pending.pop() {
        if !seen.insert(reference.clone()) {
            continue;
        }

        let Some(structure) = schema.structure_by_reference(&reference) else {
            log::warn!("The reference '{reference}' does not resolve to any structure.");
            continue;
        };

        if let Some(base) = structure.base_structure_reference() {
            pending.push(base.to_string());
        }

        match structure {
            Structure::Element(element) => {
                for usage in &element.attributes {
                    if let AttributeUsage::Reference(usage) = usage {
                        pending.push(usage.attribute_structure_reference.clone());
                    }
                }

                if let Some(content) = &element.allowed_content {
                    collect_content_references(content, &mut pending);
                }

                if let Some(value_type) = &element.value_type_reference {
                    pending.push(value_type.clone());
                }
            }
            Structure::Attribute(attribute) => match &attribute.value_type {
                Some(AttributeValueType::Reference(r)) => pending.push(r.clone()),
                Some(AttributeValueType::List(function)) => {
                    pending.push(function.data_structure_reference.clone())
                }
                None => {}
            },
            Structure::Property(property) => {
                if let Some(value_type) = &property.value_type_reference {
                    pending.push(value_type.clone());
                }
            }
            Structure::Array(array) => {
                if let Some(item_type) = &array.item_type_reference {
                    pending.push(item_type.clone());
                }
            }
            Structure::Object(object) => {
                for usage in &object.properties {
                    if let PropertyUsage::Reference(usage) = usage {
                        pending.push(usage.property_structure_reference.clone());
                    }
                }
            }
            Structure::Data(_) => {}
        }
    }

    apply_used_flags(schema, &seen);
}

fn collect_content_references(content: &ContentModel, pending: &mut Vec<String>) {
    match content {
        ContentModel::Element(usage) => {
            pending.push(usage.element_structure_reference.clone());
        }
        ContentModel::Data(usage) => {
            pending.push(usage.data_structure_reference.clone());
        }
        ContentModel::List(list) => {
            for item in &list.structures {
                collect_content_references(item, pending);
            }
        }
        ContentModel::AnyElements | ContentModel::AnyText => {}
    }
}

/// The reference and its transitive base chain, guarded against cycles.
fn base_chain(schema: &Schema, start: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current = Some(start.to_string());

    while let Some(reference) = current {
        if !seen.insert(reference.clone()) {
            break;
        }

        current = schema
            .structure_by_reference(&reference)
            .and_then(|s| s.base_structure_reference())
            .map(str::to_string);

        chain.push(reference);
    }

    chain
}

/// Sets `is_used` on every named structure, in the local list and in
/// direct imports. Flags are only ever raised.
fn apply_used_flags(schema: &mut Schema, reachable: &HashSet<String>) {
    for structure in &mut schema.structures {
        if reachable.contains(structure.reference()) {
            structure.set_used();
        }
    }

    for dependency in &mut schema.dependencies {
        for structure in &mut dependency.structures {
            if reachable.contains(structure.reference()) {
                structure.set_used();
            }
        }
    }
}

fn scalar_to_pattern(scalar: &Scalar) -> String {
    match scalar {
        Scalar::String(s) => s.clone(),
        Scalar::Integer(i) => i.to_string(),
        Scalar::Boolean(b) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AttributeStructure, AttributeUsageReference, ElementStructure, ElementUsageReference,
        ListFunction, ObjectStructure,
    };

    fn data(reference: &str) -> Structure {
        Structure::Data(DataStructure::new(reference))
    }

    #[test]
    fn bare_content_reference_to_a_data_structure_is_reclassified() {
        let mut schema = Schema::new(None);
        schema.structures.push(data("text_of_title"));

        let mut element = ElementStructure::new("title");
        element.allowed_content = Some(ContentModel::Element(ElementUsageReference::new(
            "text_of_title",
        )));
        schema.structures.push(Structure::Element(element));

        resolve_data_usages(&mut schema);

        match &schema.structures[1] {
            Structure::Element(element) => {
                assert_eq!(element.value_type_reference.as_deref(), Some("text_of_title"));
                match &element.allowed_content {
                    Some(ContentModel::Data(usage)) => {
                        assert_eq!(usage.data_structure_reference, "text_of_title")
                    }
                    other => panic!("unexpected content: {other:?}"),
                }
            }
            other => panic!("unexpected structure: {other:?}"),
        }
    }

    #[test]
    fn bare_content_reference_to_an_element_structure_is_kept() {
        let mut schema = Schema::new(None);
        schema
            .structures
            .push(Structure::Element(ElementStructure::new("chapter")));

        let mut element = ElementStructure::new("book");
        element.allowed_content =
            Some(ContentModel::Element(ElementUsageReference::new("chapter")));
        schema.structures.push(Structure::Element(element));

        resolve_data_usages(&mut schema);

        match &schema.structures[1] {
            Structure::Element(element) => {
                assert!(element.value_type_reference.is_none());
                assert!(matches!(
                    element.allowed_content,
                    Some(ContentModel::Element(_))
                ));
            }
            other => panic!("unexpected structure: {other:?}"),
        }
    }

    #[test]
    fn list_function_synthesizes_a_pattern_data_structure() {
        let mut schema = Schema::new(None);

        let mut status = DataStructure::new("status");
        status.allowed_values = vec![
            Scalar::String("draft".to_string()),
            Scalar::String("published".to_string()),
        ];
        schema.structures.push(Structure::Data(status));

        let mut attribute = AttributeStructure::new("tags");
        attribute.value_type = Some(AttributeValueType::List(ListFunction {
            data_structure_reference: "status".to_string(),
            separator: ",".to_string(),
        }));
        schema.structures.push(Structure::Attribute(attribute));

        expand_list_functions(&mut schema);

        assert_eq!(schema.structures.len(), 3);

        let synthesized = match &schema.structures[2] {
            Structure::Data(d) => d,
            other => panic!("unexpected structure: {other:?}"),
        };

        assert_eq!(synthesized.reference, "list_of__status");
        assert_eq!(synthesized.base_structure_reference.as_deref(), Some("string"));

        let pattern = format!("^{}$", synthesized.pattern.as_deref().unwrap());
        let re = regex::Regex::new(&pattern).unwrap();
        assert!(re.is_match("draft"));
        assert!(re.is_match("draft , published"));
        assert!(!re.is_match("draft;published"));

        match &schema.structures[1] {
            Structure::Attribute(attribute) => match &attribute.value_type {
                Some(AttributeValueType::Reference(r)) => assert_eq!(r, "list_of__status"),
                other => panic!("unexpected value type: {other:?}"),
            },
            other => panic!("unexpected structure: {other:?}"),
        }

        // The source enumeration is marked used even before reachability runs.
        assert!(schema.structures[0].is_used());
    }

    #[test]
    fn reachability_marks_only_structures_reachable_from_roots() {
        let mut schema = Schema::new(None);

        let mut status = DataStructure::new("status");
        status.base_structure_reference = Some("string".to_string());
        schema.structures.push(Structure::Data(status));
        schema.structures.push(data("string"));
        schema.structures.push(data("orphan"));

        let mut attribute = AttributeStructure::new("status_attr");
        attribute.value_type = Some(AttributeValueType::Reference("status".to_string()));
        schema.structures.push(Structure::Attribute(attribute));

        let mut page = ElementStructure::new("page");
        page.can_be_root_element = true;
        page.attributes = vec![AttributeUsage::Reference(AttributeUsageReference {
            attribute_structure_reference: "status_attr".to_string(),
            is_optional: false,
        })];
        page.allowed_content = Some(ContentModel::AnyText);
        schema.structures.push(Structure::Element(page));

        mark_used(&mut schema);

        let used: Vec<&str> = schema
            .structures
            .iter()
            .filter(|s| s.is_used())
            .map(|s| s.reference())
            .collect();

        assert_eq!(used, vec!["status", "string", "status_attr", "page"]);
    }

    #[test]
    fn root_objects_seed_reachability() {
        let mut schema = Schema::new(None);

        let mut document = ObjectStructure::new("document");
        document.can_be_root_object = true;
        schema.structures.push(Structure::Object(document));

        mark_used(&mut schema);

        assert!(schema.structures[0].is_used());
    }

    #[test]
    fn dangling_references_are_skipped_without_panicking() {
        let mut schema = Schema::new(None);

        let mut page = ElementStructure::new("page");
        page.can_be_root_element = true;
        page.allowed_content = Some(ContentModel::Element(ElementUsageReference::new("ghost")));
        schema.structures.push(Structure::Element(page));

        mark_used(&mut schema);

        assert!(schema.structures[0].is_used());
    }

    #[test]
    fn cyclic_content_references_terminate() {
        let mut schema = Schema::new(None);

        let mut a = ElementStructure::new("a");
        a.can_be_root_element = true;
        a.allowed_content = Some(ContentModel::Element(ElementUsageReference::new("b")));
        schema.structures.push(Structure::Element(a));

        let mut b = ElementStructure::new("b");
        b.allowed_content = Some(ContentModel::Element(ElementUsageReference::new("a")));
        schema.structures.push(Structure::Element(b));

        mark_used(&mut schema);

        assert!(schema.structures[0].is_used());
        assert!(schema.structures[1].is_used());
    }

    #[test]
    fn imported_structures_are_marked_through_local_usages() {
        let mut imported = Schema::new(None);
        imported.structures.push(data("shared_type"));

        let mut schema = Schema::new(None);
        schema.dependencies.push(imported);

        let mut attribute = AttributeStructure::new("kind");
        attribute.value_type = Some(AttributeValueType::Reference("shared_type".to_string()));
        schema.structures.push(Structure::Attribute(attribute));

        let mut page = ElementStructure::new("page");
        page.can_be_root_element = true;
        page.attributes = vec![AttributeUsage::Reference(AttributeUsageReference {
            attribute_structure_reference: "kind".to_string(),
            is_optional: false,
        })];
        schema.structures.push(Structure::Element(page));

        mark_used(&mut schema);

        assert!(schema.dependencies[0].structures[0].is_used());
    }
}
