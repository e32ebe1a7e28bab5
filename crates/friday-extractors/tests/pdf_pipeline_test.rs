//! End-to-end tests for the PDF pipeline against generated documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tempfile::TempDir;

use friday_core::{
    MemoryProgress, ProgressStage, Resource, ResourceType, SidecarConfig, SidecarContext,
    SidecarError,
};
use friday_extractors::{Ingestor, PdfIngestor};

const FAKE_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9,
];

/// Image attached to a generated page.
enum TestImage {
    Jpeg,
    RawRgb,
}

struct Fixture {
    dir: TempDir,
    progress: Arc<MemoryProgress>,
    ingestor: PdfIngestor,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = SidecarConfig::builder()
            .library_path(dir.path().join("library"))
            .build();
        let progress = Arc::new(MemoryProgress::new());
        let ctx = SidecarContext::new(config)
            .unwrap()
            .with_progress(progress.clone());

        Self {
            dir,
            progress,
            ingestor: PdfIngestor::new(ctx),
        }
    }

    fn library(&self) -> PathBuf {
        self.dir.path().join("library")
    }

    fn write_pdf(&self, name: &str, pages: &[(&str, Vec<TestImage>)]) -> PathBuf {
        let mut builder = PdfBuilder::new();
        for (text, images) in pages {
            let xobjects: Vec<ObjectId> = images
                .iter()
                .map(|image| builder.add(image_stream(image)))
                .collect();
            builder.page(text, &xobjects);
        }
        self.save(name, builder)
    }

    fn save(&self, name: &str, builder: PdfBuilder) -> PathBuf {
        let path = self.dir.path().join(name);
        builder.finish().save(&path).unwrap();
        path
    }

    async fn ingest(&self, path: &Path) -> Resource {
        self.ingestor.ingest(path.to_str().unwrap()).await.unwrap()
    }
}

/// Generated document with one text line per page.
///
/// Pages either carry their own `/Resources` or inherit the one set on the
/// `/Pages` node with [`PdfBuilder::shared_xobjects`].
struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
    shared: Option<Dictionary>,
}

impl PdfBuilder {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
            shared: None,
        }
    }

    fn add(&mut self, stream: Stream) -> ObjectId {
        self.doc.add_object(stream)
    }

    fn resources(&self, xobjects: &[ObjectId]) -> Dictionary {
        dictionary! {
            "Font" => dictionary! { "F1" => self.font_id },
            "XObject" => xobject_dict(xobjects),
        }
    }

    /// Page with its own resources naming `xobjects` as `Im1`, `Im2`, ...
    fn page(&mut self, text: &str, xobjects: &[ObjectId]) -> &mut Self {
        let resources = self.resources(xobjects);
        let resources_id = self.doc.add_object(resources);
        self.push_page(text, Some(resources_id))
    }

    /// Page without `/Resources`; it uses the ones on `/Pages`.
    fn inheriting_page(&mut self, text: &str) -> &mut Self {
        self.push_page(text, None)
    }

    fn shared_xobjects(&mut self, xobjects: &[ObjectId]) -> &mut Self {
        self.shared = Some(self.resources(xobjects));
        self
    }

    fn push_page(&mut self, text: &str, resources: Option<ObjectId>) -> &mut Self {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        };
        if let Some(resources_id) = resources {
            page.set("Resources", resources_id);
        }
        let page_id = self.doc.add_object(page);
        self.kids.push(page_id.into());
        self
    }

    fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        if let Some(shared) = self.shared {
            pages.set("Resources", shared);
        }
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc
    }
}

fn xobject_dict(ids: &[ObjectId]) -> Dictionary {
    let mut xobjects = Dictionary::new();
    for (i, id) in ids.iter().enumerate() {
        xobjects.set(format!("Im{}", i + 1), *id);
    }
    xobjects
}

fn image_dict(width: i64, height: i64, color_space: Object) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn image_stream(image: &TestImage) -> Stream {
    match image {
        TestImage::Jpeg => {
            let mut dict = image_dict(1, 1, "DeviceRGB".into());
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, FAKE_JPEG.to_vec())
        }
        TestImage::RawRgb => Stream::new(
            image_dict(2, 2, "DeviceRGB".into()),
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        ),
    }
}

/// Flate-compress a stream, failing the test if lopdf keeps it raw.
fn flate(mut stream: Stream) -> Stream {
    stream.compress().unwrap();
    assert_eq!(
        stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
        b"FlateDecode"
    );
    stream
}

/// LZW encoding made of literal codes only: clear, one 9-bit code per byte, EOD.
fn lzw_literals(data: &[u8]) -> Vec<u8> {
    let codes = std::iter::once(256u32)
        .chain(data.iter().map(|b| u32::from(*b)))
        .chain(std::iter::once(257));

    let mut out = Vec::new();
    let mut acc = 0u32;
    let mut bits = 0;
    for code in codes {
        acc = (acc << 9) | code;
        bits += 9;
        while bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
        acc &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push((acc << (8 - bits)) as u8);
    }
    out
}

fn decode_png(path: &str) -> image::RgbImage {
    assert!(path.ends_with(".png"), "{}", path);
    image::load_from_memory(&std::fs::read(path).unwrap())
        .unwrap()
        .to_rgb8()
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_text_only_document() {
    let fx = Fixture::new();
    let pdf = fx.write_pdf(
        "notes.pdf",
        &[
            ("First page", vec![]),
            ("Second page", vec![]),
            ("Third page", vec![]),
        ],
    );

    let resource = fx.ingestor.ingest(pdf.to_str().unwrap()).await.unwrap();

    assert_eq!(resource.resource_type, ResourceType::Pdf);
    assert_eq!(resource.title, "notes");
    assert_eq!(resource.source, pdf.to_str().unwrap());
    assert!(resource.assets.is_empty());
    assert!(resource.vector_index.is_none());

    let md_path = PathBuf::from(resource.md_path.as_deref().unwrap());
    assert!(md_path.is_absolute());
    assert_eq!(md_path, fx.library().join(&resource.id).join("notes.md"));

    let markdown = std::fs::read_to_string(&md_path).unwrap();
    assert!(markdown.starts_with("# notes\n"));
    assert_eq!(markdown.matches("## Page ").count(), 3);
    let p1 = markdown.find("## Page 1").unwrap();
    let p2 = markdown.find("## Page 2").unwrap();
    let p3 = markdown.find("## Page 3").unwrap();
    assert!(p1 < p2 && p2 < p3);
    assert!(markdown.contains("Second page"));
    assert!(!markdown.contains("## Extracted Images"));

    assert!(fx.library().join(&resource.id).join("assets").is_dir());
}

#[tokio::test]
async fn test_images_written_with_page_numbering() {
    let fx = Fixture::new();
    let pdf = fx.write_pdf(
        "figures.pdf",
        &[
            ("No figures here", vec![]),
            ("Two figures", vec![TestImage::Jpeg, TestImage::RawRgb]),
        ],
    );

    let resource = fx.ingestor.ingest(pdf.to_str().unwrap()).await.unwrap();

    let names: Vec<String> = resource.assets.iter().map(|a| file_name(a)).collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|n| n.starts_with("page_2_img_")));

    let jpg = resource
        .assets
        .iter()
        .find(|a| a.ends_with(".jpg"))
        .expect("jpeg asset");
    assert_eq!(std::fs::read(jpg).unwrap(), FAKE_JPEG);

    let png = resource
        .assets
        .iter()
        .find(|a| a.ends_with(".png"))
        .expect("png asset");
    let bytes = std::fs::read(png).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

    for asset in &resource.assets {
        let asset = Path::new(asset);
        assert!(asset.is_absolute());
        assert_eq!(
            asset.parent().unwrap(),
            fx.library().join(&resource.id).join("assets")
        );
    }

    let markdown = std::fs::read_to_string(resource.md_path.unwrap()).unwrap();
    assert!(markdown.contains("## Extracted Images"));
    for name in &names {
        assert!(markdown.contains(&format!("(assets/{})", name)));
    }
}

#[tokio::test]
async fn test_progress_is_monotonic_and_complete() {
    let fx = Fixture::new();
    let pdf = fx.write_pdf(
        "progress.pdf",
        &[("a", vec![]), ("b", vec![TestImage::Jpeg]), ("c", vec![])],
    );

    fx.ingestor.ingest(pdf.to_str().unwrap()).await.unwrap();

    let percentages = fx.progress.percentages();
    assert!(percentages.windows(2).all(|w| w[0] <= w[1]), "{:?}", percentages);
    for checkpoint in [0u8, 40, 70, 100] {
        assert!(percentages.contains(&checkpoint), "missing {}", checkpoint);
    }
    assert_eq!(percentages.last(), Some(&100));

    let events = fx.progress.events();
    assert_eq!(events.first().map(|e| e.stage), Some(ProgressStage::Text));
    assert!(events.iter().any(|e| e.stage == ProgressStage::Images));
    assert!(events.iter().any(|e| e.stage == ProgressStage::Markdown));
    assert_eq!(events.last().map(|e| e.stage), Some(ProgressStage::Complete));
}

#[tokio::test]
async fn test_each_run_gets_a_fresh_id() {
    let fx = Fixture::new();
    let pdf = fx.write_pdf("twice.pdf", &[("same input", vec![])]);

    let first = fx.ingestor.ingest(pdf.to_str().unwrap()).await.unwrap();
    let second = fx.ingestor.ingest(pdf.to_str().unwrap()).await.unwrap();

    assert_ne!(first.id, second.id);
    assert!(fx.library().join(&first.id).is_dir());
    assert!(fx.library().join(&second.id).is_dir());
}

#[tokio::test]
async fn test_missing_file_creates_nothing() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("absent.pdf");

    let err = fx
        .ingestor
        .ingest(missing.to_str().unwrap())
        .await
        .unwrap_err();

    match err {
        SidecarError::FileNotFound { parent_exists, .. } => assert!(parent_exists),
        other => panic!("expected FileNotFound, got {:?}", other),
    }
    assert!(!fx.library().exists());
    assert!(fx.progress.events().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_an_extraction_error() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("broken.pdf");
    std::fs::write(&path, b"this is not a pdf").unwrap();

    let err = fx.ingestor.ingest(path.to_str().unwrap()).await.unwrap_err();
    assert!(matches!(err, SidecarError::Extraction(_)));
}

#[tokio::test]
async fn test_flate_samples_become_png() {
    let fx = Fixture::new();
    let mut builder = PdfBuilder::new();
    let samples: Vec<u8> = [10u8, 20, 30].repeat(16 * 16);
    let image = builder.add(flate(Stream::new(
        image_dict(16, 16, "DeviceRGB".into()),
        samples,
    )));
    builder.page("flate", &[image]);
    let pdf = fx.save("flate.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    assert_eq!(resource.assets.len(), 1);
    assert_eq!(file_name(&resource.assets[0]), "page_1_img_1.png");
    let png = decode_png(&resource.assets[0]);
    assert_eq!(png.dimensions(), (16, 16));
    assert!(png.pixels().all(|p| p.0 == [10, 20, 30]));
}

#[tokio::test]
async fn test_flate_predictor_rows_are_undone() {
    let fx = Fixture::new();
    let (width, height) = (32usize, 8usize);
    let row: Vec<u8> = (0..width)
        .flat_map(|x| if x < width / 2 { [255, 0, 0] } else { [0, 0, 255] })
        .collect();
    // First row stored as-is (tag 0), every later row as "Up" (tag 2) with no change.
    let mut encoded = vec![0u8];
    encoded.extend(&row);
    for _ in 1..height {
        encoded.push(2);
        encoded.extend(std::iter::repeat(0).take(row.len()));
    }

    let mut dict = image_dict(width as i64, height as i64, "DeviceRGB".into());
    dict.set(
        "DecodeParms",
        dictionary! {
            "Predictor" => 15,
            "Colors" => 3,
            "BitsPerComponent" => 8,
            "Columns" => width as i64,
        },
    );
    let mut builder = PdfBuilder::new();
    let image = builder.add(flate(Stream::new(dict, encoded)));
    builder.page("predictor", &[image]);
    let pdf = fx.save("predictor.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    let png = decode_png(&resource.assets[0]);
    assert_eq!(png.dimensions(), (width as u32, height as u32));
    assert_eq!(png.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(png.get_pixel(0, 7).0, [255, 0, 0]);
    assert_eq!(png.get_pixel(31, 7).0, [0, 0, 255]);
}

#[tokio::test]
async fn test_lzw_samples_become_png() {
    let fx = Fixture::new();
    let samples = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
    let mut dict = image_dict(2, 2, "DeviceRGB".into());
    dict.set("Filter", "LZWDecode");
    let mut builder = PdfBuilder::new();
    let image = builder.add(Stream::new(dict, lzw_literals(&samples)));
    builder.page("lzw", &[image]);
    let pdf = fx.save("lzw.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    let png = decode_png(&resource.assets[0]);
    assert_eq!(png.into_raw(), samples.to_vec());
}

#[tokio::test]
async fn test_cmyk_samples_become_rgb() {
    let fx = Fixture::new();
    // White, black, cyan, then 50% gray through K.
    let samples = vec![0, 0, 0, 0, 0, 0, 0, 255, 255, 0, 0, 0, 0, 0, 0, 128];
    let mut builder = PdfBuilder::new();
    let image = builder.add(Stream::new(
        image_dict(2, 2, "DeviceCMYK".into()),
        samples,
    ));
    builder.page("cmyk", &[image]);
    let pdf = fx.save("cmyk.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    let png = decode_png(&resource.assets[0]);
    assert_eq!(png.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(png.get_pixel(1, 0).0, [0, 0, 0]);
    assert_eq!(png.get_pixel(0, 1).0, [0, 255, 255]);
    assert_eq!(png.get_pixel(1, 1).0, [127, 127, 127]);
}

#[tokio::test]
async fn test_images_inside_form_xobjects() {
    let fx = Fixture::new();
    let mut builder = PdfBuilder::new();
    let jpeg = builder.add(image_stream(&TestImage::Jpeg));
    let form = builder.add(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "Resources" => dictionary! { "XObject" => xobject_dict(&[jpeg]) },
        },
        b"q /Im1 Do Q".to_vec(),
    ));
    builder.page("form", &[form]);
    let pdf = fx.save("form.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    assert_eq!(resource.assets.len(), 1);
    assert_eq!(file_name(&resource.assets[0]), "page_1_img_1.jpg");
    assert_eq!(std::fs::read(&resource.assets[0]).unwrap(), FAKE_JPEG);
}

#[tokio::test]
async fn test_resources_inherited_from_pages_node() {
    let fx = Fixture::new();
    let mut builder = PdfBuilder::new();
    let jpeg = builder.add(image_stream(&TestImage::Jpeg));
    builder
        .shared_xobjects(&[jpeg])
        .inheriting_page("one")
        .inheriting_page("two");
    let pdf = fx.save("inherited.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    let names: Vec<String> = resource.assets.iter().map(|a| file_name(a)).collect();
    assert_eq!(names, vec!["page_1_img_1.jpg", "page_2_img_1.jpg"]);
    let markdown = std::fs::read_to_string(resource.md_path.unwrap()).unwrap();
    assert_eq!(markdown.matches("## Page ").count(), 2);
}

#[tokio::test]
async fn test_image_named_twice_is_written_once_per_page() {
    let fx = Fixture::new();
    let mut builder = PdfBuilder::new();
    let jpeg = builder.add(image_stream(&TestImage::Jpeg));
    builder.page("twice", &[jpeg, jpeg]).page("again", &[jpeg]);
    let pdf = fx.save("twice.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    let names: Vec<String> = resource.assets.iter().map(|a| file_name(a)).collect();
    assert_eq!(names, vec!["page_1_img_1.jpg", "page_2_img_1.jpg"]);
}

#[tokio::test]
async fn test_indexed_image_is_kept_raw() {
    let fx = Fixture::new();
    let palette = Object::String(vec![255, 0, 0, 0, 0, 255], lopdf::StringFormat::Hexadecimal);
    let color_space = Object::Array(vec!["Indexed".into(), "DeviceRGB".into(), 1.into(), palette]);
    let mut builder = PdfBuilder::new();
    let image = builder.add(Stream::new(image_dict(2, 1, color_space), vec![0, 1]));
    builder.page("indexed", &[image]);
    let pdf = fx.save("indexed.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    assert_eq!(file_name(&resource.assets[0]), "page_1_img_1.bin");
    assert_eq!(std::fs::read(&resource.assets[0]).unwrap(), vec![0, 1]);
}

#[tokio::test]
async fn test_filter_chain_is_kept_raw() {
    let fx = Fixture::new();
    let stored = b"not decoded by the pipeline".to_vec();
    let mut dict = image_dict(1, 1, "DeviceRGB".into());
    dict.set(
        "Filter",
        vec![Object::from("FlateDecode"), Object::from("DCTDecode")],
    );
    let mut builder = PdfBuilder::new();
    let image = builder.add(Stream::new(dict, stored.clone()));
    builder.page("chain", &[image]);
    let pdf = fx.save("chain.pdf", builder);

    let resource = fx.ingest(&pdf).await;

    assert_eq!(file_name(&resource.assets[0]), "page_1_img_1.bin");
    assert_eq!(std::fs::read(&resource.assets[0]).unwrap(), stored);
}

#[tokio::test]
async fn test_zero_page_document() {
    let fx = Fixture::new();
    let pdf = fx.save("empty.pdf", PdfBuilder::new());

    let resource = fx.ingest(&pdf).await;

    assert!(resource.assets.is_empty());
    let markdown = std::fs::read_to_string(resource.md_path.unwrap()).unwrap();
    assert!(markdown.starts_with("# empty\n"));
    assert!(!markdown.contains("## Page"));
    assert_eq!(fx.progress.percentages(), vec![0, 40, 70, 70, 100]);
}
