// Benchmark tests for the pagination and signature-parsing hot paths

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ipdraft::domain::layout::LayoutBlock;
use ipdraft::domain::{FormattingRules, PageGeometry};
use ipdraft::services::layout::LayoutEngine;
use ipdraft::services::markdown;
use ipdraft::services::signature_parser::SignatureParser;

fn generate_agreement(sections: usize) -> String {
    let mut text = String::from("# Patent License Agreement\n\n");
    for i in 1..=sections {
        text.push_str(&format!("## Section {}\n\n", i));
        text.push_str(
            "The Licensor grants to the Licensee a non-exclusive license under \
             the **Licensed Patents** to make, use, and sell Licensed Products \
             in the Territory during the Term.\n\n",
        );
        text.push_str("- Royalty reports due quarterly\n- Payments net thirty days\n\n");
    }
    text.push_str(
        "[SIGNATURE_BLOCK:license-parties]\n\
         LICENSOR:\tLICENSEE:\n\
         _______________________\t_______________________\n\
         Name: Alice Smith\tName: Bob Jones\n\
         Title: President\tTitle: Director\n",
    );
    text
}

fn bench_signature_parsing(c: &mut Criterion) {
    let parser = SignatureParser::new();
    let mut group = c.benchmark_group("signature_parsing");
    for sections in [10usize, 50, 200] {
        let text = generate_agreement(sections);
        group.bench_with_input(BenchmarkId::from_parameter(sections), &text, |b, text| {
            b.iter(|| parser.parse(black_box(text)));
        });
    }
    group.finish();
}

fn bench_inline_formatting(c: &mut Criterion) {
    let line = "This clause grants a **worldwide**, *royalty-bearing*, ***non-transferable*** license.";
    c.bench_function("inline_formatting", |b| {
        b.iter(|| markdown::parse_inline_formatting(black_box(line)));
    });
}

fn bench_pagination(c: &mut Criterion) {
    let engine = LayoutEngine::new();
    let rules = FormattingRules::default();
    let geometry = PageGeometry::letter();

    let mut group = c.benchmark_group("pagination");
    for count in [100usize, 1_000] {
        let blocks: Vec<LayoutBlock> = (0..count)
            .map(|i| {
                let mut block = LayoutBlock::text("body", 20.0 + (i % 7) as f32 * 15.0);
                block.keep_with_next = i % 11 == 0;
                block
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &blocks, |b, blocks| {
            b.iter(|| engine.paginate(black_box(blocks), &rules, geometry));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_signature_parsing,
    bench_inline_formatting,
    bench_pagination
);
criterion_main!(benches);
