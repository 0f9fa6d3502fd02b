// Synthetic PDFs for tests
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One page per entry; each string becomes its own BT/ET text block.
pub fn text_pdf(pages: &[Vec<&str>]) -> lopdf::Result<Vec<u8>> {
    let mut doc = text_document(pages)?;
    save(&mut doc)
}

/// Same layout as [`text_pdf`], with a standard security handler entry in the trailer.
pub fn encrypted_pdf(pages: &[Vec<&str>]) -> lopdf::Result<Vec<u8>> {
    let mut doc = text_document(pages)?;
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    save(&mut doc)
}

fn text_document(pages: &[Vec<&str>]) -> lopdf::Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for fragments in pages {
        let mut operations = Vec::new();
        for (i, fragment) in fragments.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), (720 - 16 * i as i64).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*fragment)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
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
    Ok(doc)
}

fn save(doc: &mut Document) -> lopdf::Result<Vec<u8>> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}
