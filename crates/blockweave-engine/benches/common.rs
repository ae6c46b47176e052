// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
use blockweave_engine::model::{DocumentBuilder, DocumentTree, FormatFlags};

#[allow(dead_code)]
pub fn generate_document(blocks: usize) -> DocumentTree {
    let mut builder = DocumentBuilder::new("doc");
    for i in 0..blocks {
        let (plain, styled) = (format!("s{i}a"), format!("s{i}b"));
        builder = builder.block(
            format!("b{i}"),
            [
                (plain.as_str(), "Paragraph with some content, ", FormatFlags::empty()),
                (styled.as_str(), "and a bold tail.", FormatFlags::BOLD),
            ],
        );
    }
    builder.build().unwrap()
}

#[allow(dead_code)]
pub fn generate_text(size: usize) -> String {
    "The quick brown fox jumps over the lazy dog. ".repeat(size)
}
