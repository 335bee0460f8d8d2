use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use protogloss_rs::{Dictionary, Gloss, RawEntries, SearchSession, TokenTable, render_gloss, resolve};

const STEMS: &[&str] = &["ag", "bog", "dam", "or", "yük", "kāp", "ıs", "ça", "İn", "*bä"];

fn synthetic_dictionary(size: usize) -> Dictionary {
    let raw: RawEntries = (0..size)
        .map(|idx| {
            let stem = STEMS[idx % STEMS.len()];
            let headword = format!("{stem}{idx:05}");
            let gloss = Gloss::new(format!("ptr {headword} tur word ota usage\nsee also kmz x"));
            (headword, gloss)
        })
        .collect();
    Dictionary::from_entries(raw).expect("synthetic dictionary indexes")
}

fn bench_load(c: &mut Criterion) {
    c.bench_function("load::index_20k", |b| {
        b.iter(|| black_box(synthetic_dictionary(20_000).len()));
    });
}

fn bench_keystrokes(c: &mut Criterion) {
    let dictionary = synthetic_dictionary(20_000);
    const QUERIES: &[&str] = &["a", "ag0", "kā", "ı", "zz"];
    for &query in QUERIES {
        c.bench_with_input(BenchmarkId::new("resolve", query), &query, |b, &query| {
            let normalized = protogloss_rs::normalize(query);
            b.iter(|| black_box(resolve(&dictionary, query, &normalized)));
        });
    }
    c.bench_function("session::typing_ag00123", |b| {
        b.iter(|| {
            let mut session = SearchSession::new();
            let word = "ag00123";
            for end in 1..=word.len() {
                black_box(session.search(&dictionary, &word[..end]));
            }
        });
    });
}

fn bench_render(c: &mut Criterion) {
    let tokens = TokenTable::default();
    let description = "<span class='yellow'>noun</span> *agïŕ <span class='gray'>“mouth”</span>\n\
                       ptr *agïŕ, otk agız, tur ağız, crh ağız, sah ayax";
    c.bench_function("render::gloss", |b| {
        b.iter(|| black_box(render_gloss(description, &tokens)));
    });
}

criterion_group!(benches, bench_load, bench_keystrokes, bench_render);
criterion_main!(benches);
