//! Conversion of real PDF bytes built with lopdf.

use std::fs;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use pdf2md::{bytes_to_markdown, to_markdown, ConversionOptions, Converter, Error, Pdf2Md};

/// One line of text: font size, x, y (PDF user space, origin bottom-left), text.
type TextLine = (i64, i64, i64, &'static str);

/// Build a PDF whose pages show the given lines in Helvetica.
fn build_pdf(pages: &[&[TextLine]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for &(size, x, y, text) in lines.iter() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn report_pdf() -> Vec<u8> {
    build_pdf(&[&[
        (24, 72, 720, "Quarterly Report"),
        (12, 72, 680, "Revenue grew steadily"),
        (12, 72, 666, "across every region."),
    ]])
}

#[test]
fn test_heading_and_paragraph_from_pdf() {
    let markdown = bytes_to_markdown(&report_pdf()).unwrap();
    assert_eq!(
        markdown,
        "# Quarterly Report\n\nRevenue grew steadily across every region."
    );
}

#[test]
fn test_paragraph_merged_across_pdf_pages() {
    let pdf = build_pdf(&[
        &[(12, 72, 100, "This sentence starts on one page")],
        &[(12, 72, 720, "and ends on the next.")],
    ]);
    let conversion = Pdf2Md::new().convert_bytes(&pdf).unwrap();
    assert_eq!(
        conversion.markdown,
        "This sentence starts on one page and ends on the next."
    );
    assert_eq!(conversion.stats.page_count, 2);
    assert_eq!(conversion.stats.merge_count, 1);
}

#[test]
fn test_page_separator_between_finished_pages() {
    let pdf = build_pdf(&[
        &[(12, 72, 700, "Page one is complete.")],
        &[(12, 72, 700, "Page two is complete.")],
    ]);
    let markdown = Pdf2Md::new()
        .with_page_separator("\n\n***\n\n")
        .convert_bytes(&pdf)
        .unwrap()
        .markdown;
    assert_eq!(markdown, "Page one is complete.\n\n***\n\nPage two is complete.");
}

#[test]
fn test_file_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    fs::write(&path, report_pdf()).unwrap();

    let markdown = to_markdown(&path).unwrap();
    assert!(markdown.starts_with("# Quarterly Report"));
}

#[test]
fn test_batch_keeps_order_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.pdf");
    let bad = dir.path().join("bad.pdf");
    fs::write(&good, report_pdf()).unwrap();
    fs::write(&bad, b"this is not a pdf").unwrap();

    let converter = Converter::new(ConversionOptions::default()).unwrap();
    let results = converter.convert_files(&[good.clone(), bad.clone()]);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, good);
    assert!(results[0].1.is_ok());
    assert_eq!(results[1].0, bad);
    assert!(matches!(results[1].1, Err(Error::UnknownFormat)));
}

#[test]
fn test_non_pdf_bytes_rejected() {
    assert!(matches!(
        bytes_to_markdown(b"PK\x03\x04 zip archive"),
        Err(Error::UnknownFormat)
    ));
}
