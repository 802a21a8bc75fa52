use divan::{Bencher, black_box};
use docsplice::{Dialect, path};

fn main() {
    divan::main();
}

const F1: &str = include_str!("../../docsplice-server/sample_files/F1.html");

fn large_list() -> String {
    let mut html = String::from("<html><body><ul>");
    for i in 0..2000 {
        html.push_str(&format!("<li id=\"{i}\" class=\"item\">Item {i}</li>"));
    }
    html.push_str("</ul></body></html>");
    html
}

#[divan::bench]
fn parse_arena(bencher: Bencher) {
    bencher.bench_local(|| {
        let doc = docsplice::arena_dom::parse(black_box(F1));
        black_box(doc);
    });
}

#[divan::bench]
fn parse_tree(bencher: Bencher) {
    bencher.bench_local(|| {
        let doc = docsplice::parse_document(black_box(F1));
        black_box(doc);
    });
}

#[divan::bench]
fn compile_full(bencher: Bencher) {
    bencher.bench_local(|| {
        let expr = path::compile(
            black_box("//ul/li[normalize-space(text())='Item 1999' and @class='item']"),
            Dialect::Full,
        );
        black_box(expr)
    });
}

#[divan::bench]
fn select_attr_arena(bencher: Bencher) {
    let html = large_list();
    let doc = docsplice::arena_dom::parse(&html);
    let expr = path::compile("//ul/li[@id='1999']", Dialect::Full).unwrap();
    bencher.bench_local(|| black_box(expr.select(&doc).unwrap()));
}

#[divan::bench]
fn select_attr_tree(bencher: Bencher) {
    let html = large_list();
    let doc = docsplice::parse_document(&html);
    let expr = path::compile("//ul/li[@id='1999']", Dialect::Basic).unwrap();
    bencher.bench_local(|| black_box(expr.select(&doc).unwrap()));
}

#[divan::bench]
fn select_positional_arena(bencher: Bencher) {
    let html = large_list();
    let doc = docsplice::arena_dom::parse(&html);
    let expr = path::compile("(//li)[last()]", Dialect::Full).unwrap();
    bencher.bench_local(|| black_box(expr.select(&doc).unwrap()));
}
