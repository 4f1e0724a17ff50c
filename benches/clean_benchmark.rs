use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ocr_md::clean::clean_grounding;

fn grounded_page() -> String {
    let mut page = String::new();
    for i in 0..200 {
        page.push_str(&format!(
            "<|ref|>text<|/ref|><|det|>[[{}, 10, 400, 30]]<|/det|>\nLine {} of the scanned page   \n",
            i, i
        ));
    }
    page.push_str("<|ref|>truncated");
    page
}

fn benchmark_clean(c: &mut Criterion) {
    let page = grounded_page();

    c.bench_function("clean_grounding_page", |b| {
        b.iter(|| clean_grounding(black_box(&page)))
    });
}

criterion_group!(benches, benchmark_clean);
criterion_main!(benches);
