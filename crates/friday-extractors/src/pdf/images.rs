//! Embedded raster image extraction.
//!
//! Images are found through the page's `/Resources/XObject` dictionary,
//! inherited from ancestor `/Pages` nodes when the page has none of its own.
//! Form XObjects are descended into. Inline images (`BI ... EI`) are not
//! extracted.
//!
//! Streams whose single filter is an image codec are written as-is. Raw or
//! Flate/LZW-compressed samples in a gray, RGB or CMYK colour space at 8 bits
//! per component are re-encoded as PNG. Anything else is written undecoded
//! with a `bin` extension.

use std::collections::HashSet;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use friday_core::{SidecarError, SidecarResult};

/// Progress band covered by image extraction.
pub const IMAGES_BAND: (u32, u32) = (40, 30);

/// Guards against `/Parent` and form XObject cycles.
const MAX_DEPTH: usize = 32;

/// One image ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Collect every image XObject reachable from a page, in resource order.
///
/// Each XObject is returned once per page even if several names point at it.
pub fn page_images(doc: &Document, page_id: ObjectId) -> SidecarResult<Vec<PageImage>> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    if let Some(resources) = page_resources(doc, page_id)? {
        collect_from_resources(doc, resources, &mut seen, &mut images, 0)?;
    }
    Ok(images)
}

fn decode_err(context: &str, err: lopdf::Error) -> SidecarError {
    SidecarError::extraction(format!("{}: {}", context, err))
}

/// Follow references until a direct object is reached.
fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> SidecarResult<&'a Object> {
    for _ in 0..MAX_DEPTH {
        match obj {
            Object::Reference(id) => {
                obj = doc
                    .get_object(*id)
                    .map_err(|e| decode_err(&format!("object {} {}", id.0, id.1), e))?;
            }
            direct => return Ok(direct),
        }
    }
    Err(SidecarError::extraction("reference chain too deep"))
}

/// Resources dictionary in effect for a page.
fn page_resources(doc: &Document, page_id: ObjectId) -> SidecarResult<Option<&Dictionary>> {
    let mut node = doc
        .get_dictionary(page_id)
        .map_err(|e| decode_err("page dictionary", e))?;

    for _ in 0..MAX_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            let resources = resolve(doc, resources)?
                .as_dict()
                .map_err(|e| decode_err("page resources", e))?;
            return Ok(Some(resources));
        }
        match node.get(b"Parent") {
            Ok(parent) => {
                node = resolve(doc, parent)?
                    .as_dict()
                    .map_err(|e| decode_err("page parent", e))?;
            }
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

fn collect_from_resources(
    doc: &Document,
    resources: &Dictionary,
    seen: &mut HashSet<ObjectId>,
    images: &mut Vec<PageImage>,
    depth: usize,
) -> SidecarResult<()> {
    if depth >= MAX_DEPTH {
        return Ok(());
    }
    let xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolve(doc, obj)?
            .as_dict()
            .map_err(|e| decode_err("XObject dictionary", e))?,
        Err(_) => return Ok(()),
    };

    for (name, entry) in xobjects.iter() {
        if let Object::Reference(id) = entry {
            if !seen.insert(*id) {
                continue;
            }
        }
        let stream = match resolve(doc, entry)?.as_stream() {
            Ok(stream) => stream,
            Err(_) => {
                warn!(name = %String::from_utf8_lossy(name), "XObject is not a stream, skipping");
                continue;
            }
        };

        match name_of(doc, &stream.dict, b"Subtype")?.as_deref() {
            Some(b"Image") => {
                let image = encode_image(doc, stream)?;
                debug!(
                    name = %String::from_utf8_lossy(name),
                    ext = image.extension,
                    bytes = image.bytes.len(),
                    "Found image"
                );
                images.push(image);
            }
            Some(b"Form") => {
                if let Ok(form_resources) = stream.dict.get(b"Resources") {
                    let form_resources = resolve(doc, form_resources)?
                        .as_dict()
                        .map_err(|e| decode_err("form resources", e))?;
                    collect_from_resources(doc, form_resources, seen, images, depth + 1)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn name_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> SidecarResult<Option<Vec<u8>>> {
    match dict.get(key) {
        Ok(obj) => Ok(resolve(doc, obj)?.as_name().ok().map(<[u8]>::to_vec)),
        Err(_) => Ok(None),
    }
}

/// Filter chain of a stream, normalized to full filter names.
fn filters(doc: &Document, dict: &Dictionary) -> SidecarResult<Vec<Vec<u8>>> {
    let raw = match dict.get(b"Filter") {
        Ok(obj) => resolve(doc, obj)?,
        Err(_) => return Ok(Vec::new()),
    };
    let names: Vec<&[u8]> = match raw {
        Object::Name(name) => vec![name.as_slice()],
        Object::Array(items) => items.iter().filter_map(|o| o.as_name().ok()).collect(),
        _ => Vec::new(),
    };

    Ok(names
        .into_iter()
        .map(|name| match name {
            b"DCT" => b"DCTDecode".to_vec(),
            b"Fl" => b"FlateDecode".to_vec(),
            b"CCF" => b"CCITTFaxDecode".to_vec(),
            other => other.to_vec(),
        })
        .collect())
}

/// Extension for streams written without decoding.
fn passthrough_extension(filter: &[u8]) -> Option<&'static str> {
    match filter {
        b"DCTDecode" => Some("jpg"),
        b"JPXDecode" => Some("jp2"),
        b"JBIG2Decode" => Some("jb2"),
        b"CCITTFaxDecode" => Some("tiff"),
        _ => None,
    }
}

fn encode_image(doc: &Document, stream: &Stream) -> SidecarResult<PageImage> {
    let filters = filters(doc, &stream.dict)?;

    if let [only] = filters.as_slice() {
        if let Some(extension) = passthrough_extension(only) {
            return Ok(PageImage {
                bytes: stream.content.clone(),
                extension,
            });
        }
    }

    let decodable = match filters.as_slice() {
        [] => true,
        [only] => only.as_slice() == b"FlateDecode" || only.as_slice() == b"LZWDecode",
        _ => false,
    };

    if decodable {
        if let Some(spec) = SampleSpec::from_dict(doc, &stream.dict)? {
            match decode_samples(stream, filters.first()) {
                Ok(samples) if samples.len() >= spec.byte_len().unwrap_or(usize::MAX) => {
                    return Ok(PageImage {
                        bytes: spec.to_png(&samples)?,
                        extension: "png",
                    });
                }
                Ok(samples) => warn!(
                    bytes = samples.len(),
                    width = spec.width,
                    height = spec.height,
                    "Image data too short, keeping raw stream"
                ),
                Err(e) => warn!(error = %e, "Cannot decode image stream, keeping raw stream"),
            }
        }
    }

    Ok(PageImage {
        bytes: stream.content.clone(),
        extension: "bin",
    })
}

/// Undo the stream filter, keeping any `/DecodeParms` predictor.
fn decode_samples(stream: &Stream, filter: Option<&Vec<u8>>) -> Result<Vec<u8>, lopdf::Error> {
    let filter = match filter {
        Some(filter) => filter,
        None => return Ok(stream.content.clone()),
    };

    // lopdf refuses to decompress streams whose subtype is Image.
    let mut dict = stream.dict.clone();
    dict.remove(b"Subtype");
    dict.set("Filter", Object::Name(filter.clone()));
    Stream::new(dict, stream.content.clone()).decompressed_content()
}

/// Layout of raw image samples we know how to re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SampleSpec {
    width: u32,
    height: u32,
    components: u8,
}

impl SampleSpec {
    fn from_dict(doc: &Document, dict: &Dictionary) -> SidecarResult<Option<Self>> {
        let is_mask = dict
            .get(b"ImageMask")
            .ok()
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false);
        if is_mask || int_of(doc, dict, b"BitsPerComponent")? != Some(8) {
            return Ok(None);
        }

        let dimension = |key: &[u8]| -> SidecarResult<Option<u32>> {
            Ok(int_of(doc, dict, key)?
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0))
        };
        let (width, height) = match (dimension(b"Width")?, dimension(b"Height")?) {
            (Some(w), Some(h)) => (w, h),
            _ => return Ok(None),
        };

        let components = match dict.get(b"ColorSpace") {
            Ok(cs) => color_components(doc, resolve(doc, cs)?)?,
            Err(_) => None,
        };

        Ok(components
            .map(|components| Self {
                width,
                height,
                components,
            })
            .filter(|spec| spec.byte_len().is_some()))
    }

    /// Size of the sample data, `None` if it does not fit in memory.
    fn byte_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.components as usize)
            .filter(|len| *len <= isize::MAX as usize)
    }

    fn to_png(&self, samples: &[u8]) -> SidecarResult<Vec<u8>> {
        let expected = self
            .byte_len()
            .ok_or_else(|| SidecarError::extraction("image dimensions overflow"))?;
        if samples.len() < expected {
            return Err(SidecarError::extraction(format!(
                "image data too short: {} bytes for {}x{}x{}",
                samples.len(),
                self.width,
                self.height,
                self.components
            )));
        }
        let samples = &samples[..expected];

        let image = match self.components {
            1 => GrayImage::from_raw(self.width, self.height, samples.to_vec())
                .map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, samples.to_vec())
                .map(DynamicImage::ImageRgb8),
            4 => RgbImage::from_raw(self.width, self.height, cmyk_to_rgb(samples))
                .map(DynamicImage::ImageRgb8),
            n => {
                return Err(SidecarError::extraction(format!(
                    "unsupported component count {}",
                    n
                )))
            }
        }
        .ok_or_else(|| SidecarError::extraction("image buffer size mismatch"))?;

        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| SidecarError::extraction(format!("PNG encoding: {}", e)))?;
        Ok(out.into_inner())
    }
}

fn int_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> SidecarResult<Option<i64>> {
    match dict.get(key) {
        Ok(obj) => Ok(resolve(doc, obj)?.as_i64().ok()),
        Err(_) => Ok(None),
    }
}

/// Components per pixel for supported colour spaces.
fn color_components(doc: &Document, cs: &Object) -> SidecarResult<Option<u8>> {
    match cs {
        Object::Name(name) => Ok(device_components(name)),
        Object::Array(items) => {
            let family = match items.first().and_then(|o| o.as_name().ok()) {
                Some(family) => family,
                None => return Ok(None),
            };
            match family {
                b"ICCBased" => {
                    let profile = match items.get(1) {
                        Some(obj) => resolve(doc, obj)?,
                        None => return Ok(None),
                    };
                    let n = profile
                        .as_stream()
                        .ok()
                        .and_then(|s| s.dict.get(b"N").ok())
                        .and_then(|n| n.as_i64().ok());
                    Ok(match n {
                        Some(1) => Some(1),
                        Some(3) => Some(3),
                        Some(4) => Some(4),
                        _ => None,
                    })
                }
                b"CalGray" => Ok(Some(1)),
                b"CalRGB" => Ok(Some(3)),
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

fn device_components(name: &[u8]) -> Option<u8> {
    match name {
        b"DeviceGray" | b"G" => Some(1),
        b"DeviceRGB" | b"RGB" => Some(3),
        b"DeviceCMYK" | b"CMYK" => Some(4),
        _ => None,
    }
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u16;
            [
                ((255 - px[0] as u16) * k / 255) as u8,
                ((255 - px[1] as u16) * k / 255) as u8,
                ((255 - px[2] as u16) * k / 255) as u8,
            ]
        })
        .collect()
}
