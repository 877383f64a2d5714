use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schemata_core::parser::Parser;
use schemata_core::scan::Marker;
use schemata_core::{compile_str, export_schema_as_xsd};

// ============================================================================
// Test Data: Varying Complexity and Size
// ============================================================================

const TINY_SCHEMA: &str = r#"
    root element page {
        allowedContent: *any text*;
    }
"#;

const SMALL_SCHEMA: &str = r#"
    /* Format Name: Small Format */

    dataType status {
        baseType: string;
        allowedValues: 'draft', 'published';
    }

    attribute status_attr {
        tagName: 'status';
        valueType: status;
    }

    root element page {
        attributes: status_attr;
        allowedContent: *any text*;
    }
"#;

const MEDIUM_SCHEMA: &str = r#"
    /* Format Name: Medium Format */

    dataType identifier {
        baseType: string;
        allowedPattern: '[a-z][a-z0-9_]*';
    }

    dataType count {
        baseType: integer;
        minimumValue: 0;
        maximumValue: 1000;
    }

    attribute id_attr {
        tagName: 'id';
        valueType: identifier;
    }

    attribute count_attr {
        tagName: 'count';
        valueType: count;
    }

    element title {
        allowedContent: *any text*;
    }

    element paragraph {
        attributes: id_attr (optional);
        allowedContent: *any text*;
    }

    element section {
        attributes: id_attr, count_attr (optional);
        allowedContent: [title, paragraph (n >= 0)];
    }

    root element document {
        allowedContent: [title, section (n >= 1)];
    }
"#;

// Generates a flat schema with many element structures for stress testing.
fn generate_large_schema(structure_count: usize) -> String {
    let mut source = String::from("/* Format Name: Generated Format */\n");

    for i in 0..structure_count {
        source.push_str(&format!(
            "element item_{i} {{\n    allowedContent: *any text*;\n}}\n"
        ));
    }

    source.push_str("root element list {\n    allowedContent: [");
    for i in 0..structure_count {
        if i > 0 {
            source.push_str(", ");
        }
        source.push_str(&format!("item_{i} (n >= 0)"));
    }
    source.push_str("];\n}\n");

    source
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_parser_tiny(c: &mut Criterion) {
    c.bench_function("parser_tiny", |b| {
        b.iter(|| {
            let parser = Parser::new(black_box(TINY_SCHEMA));
            let mut marker = Marker::new();
            parser.parse_structures(&mut marker)
        })
    });
}

fn bench_parser_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_by_size");

    for (name, source) in [
        ("tiny", TINY_SCHEMA),
        ("small", SMALL_SCHEMA),
        ("medium", MEDIUM_SCHEMA),
    ] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| {
                let parser = Parser::new(black_box(src));
                let mut marker = Marker::new();
                parser.parse_format_name(&mut marker).unwrap();
                parser.parse_structures(&mut marker)
            })
        });
    }

    group.finish();
}

fn bench_parser_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_structure_scaling");

    for size in [10, 50, 100, 500] {
        let source = generate_large_schema(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, src| {
            b.iter(|| {
                let parser = Parser::new(black_box(src));
                let mut marker = Marker::new();
                parser.parse_format_name(&mut marker).unwrap();
                parser.parse_structures(&mut marker)
            })
        });
    }

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_compile_medium(c: &mut Criterion) {
    c.bench_function("compile_medium", |b| {
        b.iter(|| compile_str(black_box(MEDIUM_SCHEMA), "medium.schema"))
    });
}

fn bench_compile_and_export_xsd(c: &mut Criterion) {
    let schema = compile_str(MEDIUM_SCHEMA, "medium.schema").unwrap();

    c.bench_function("export_xsd_medium", |b| {
        b.iter(|| export_schema_as_xsd(black_box(&schema), "1.0"))
    });
}

fn bench_compile_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_structure_scaling");

    for size in [10, 50, 100, 500] {
        let source = generate_large_schema(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, src| {
            b.iter(|| compile_str(black_box(src), "generated.schema"))
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    parser_benches,
    bench_parser_tiny,
    bench_parser_sizes,
    bench_parser_scaling
);

criterion_group!(
    e2e_benches,
    bench_compile_medium,
    bench_compile_and_export_xsd,
    bench_compile_scaling
);

criterion_main!(parser_benches, e2e_benches);
