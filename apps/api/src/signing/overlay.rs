//! Signature compositing onto rendered contract PDFs.
//!
//! The signature block lives on the last two pages of the contract; a page
//! qualifies only if its extracted text contains both party markers.
//! Raster assets are embedded as RGB image XObjects with an alpha
//! SMask; SVG assets are rasterized to fit first. Coordinates are in A4
//! point space with the origin at the bottom-left, matching PDF user space.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

pub const FIRST_PARTY_MARKER: &str = "PIHAK PERTAMA";
pub const SECOND_PARTY_MARKER: &str = "PIHAK KEDUA";

/// Signature regions, page-relative (A4 = 595 x 842 points).
const RECT_SECOND_TO_LAST: SignatureRect = SignatureRect {
    x: 380.0,
    y: 250.0,
    width: 170.0,
    height: 100.0,
};
const RECT_LAST: SignatureRect = SignatureRect {
    x: 380.0,
    y: 150.0,
    width: 170.0,
    height: 100.0,
};

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Could not find signature location in PDF")]
    MarkersNotFound,
    #[error("unsupported signature asset: {0}")]
    Asset(String),
    #[error("pdf error: {0}")]
    Pdf(String),
}

#[derive(Debug, Clone, Copy)]
pub struct SignatureRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Decoded signature pixels, rows already flipped bottom-up for PDF space.
struct SignatureArt {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Vec<u8>,
}

/// Stamps the signature onto every qualifying page among the last two and
/// returns the rewritten PDF. The input is untouched when no page matches.
pub fn overlay_signature(pdf: &[u8], asset: &[u8], is_svg: bool) -> Result<Vec<u8>, OverlayError> {
    let page_texts =
        pdf_extract::extract_text_from_mem_by_pages(pdf).map_err(|e| OverlayError::Pdf(e.to_string()))?;
    let total_pages = page_texts.len();

    let signature_pages = marker_pages(&page_texts);
    if signature_pages.is_empty() {
        return Err(OverlayError::MarkersNotFound);
    }

    let art = if is_svg {
        rasterize_svg(asset, RECT_LAST.width, RECT_LAST.height)?
    } else {
        decode_raster(asset)?
    };

    let mut doc = Document::load_mem(pdf).map_err(|e| OverlayError::Pdf(e.to_string()))?;
    let pages = doc.get_pages();

    for page_index in signature_pages {
        let rect = rect_for_page(page_index, total_pages);
        // lopdf page numbers are 1-based.
        let page_number = (page_index + 1) as u32;
        let page_id = *pages
            .get(&page_number)
            .ok_or_else(|| OverlayError::Pdf(format!("page {page_number} missing")))?;
        let xobject_name = format!("Sig{page_number}");
        stamp_image(&mut doc, page_id, &art, &rect, &xobject_name)?;
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| OverlayError::Pdf(e.to_string()))?;
    Ok(out)
}

/// Zero-based indices of pages carrying the signature block, restricted to
/// the last two pages of the document.
pub fn marker_pages(page_texts: &[String]) -> Vec<usize> {
    let total = page_texts.len();
    (total.saturating_sub(2)..total)
        .filter(|&idx| {
            let text = &page_texts[idx];
            text.contains(FIRST_PARTY_MARKER) && text.contains(SECOND_PARTY_MARKER)
        })
        .collect()
}

fn rect_for_page(page_index: usize, total_pages: usize) -> SignatureRect {
    if page_index + 1 == total_pages {
        RECT_LAST
    } else {
        RECT_SECOND_TO_LAST
    }
}

/// Uniform scale that fits `(width, height)` inside the target box without
/// distorting the aspect ratio.
pub fn fit_scale(width: f64, height: f64, max_width: f64, max_height: f64) -> f64 {
    (max_width / width).min(max_height / height)
}

fn decode_raster(asset: &[u8]) -> Result<SignatureArt, OverlayError> {
    let mut img = image::load_from_memory(asset)
        .map_err(|e| OverlayError::Asset(e.to_string()))?
        .to_rgba8();
    // PDF image space has y growing upward.
    image::imageops::flip_vertical_in_place(&mut img);
    let (width, height) = img.dimensions();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in img.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Ok(SignatureArt {
        width,
        height,
        rgb,
        alpha,
    })
}

fn rasterize_svg(asset: &[u8], max_width: f64, max_height: f64) -> Result<SignatureArt, OverlayError> {
    let options = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(asset, &options)
        .map_err(|e| OverlayError::Asset(e.to_string()))?;

    let size = tree.size();
    let scale = fit_scale(size.width() as f64, size.height() as f64, max_width, max_height);
    let width = ((size.width() as f64 * scale).ceil() as u32).max(1);
    let height = ((size.height() as f64 * scale).ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| OverlayError::Asset("empty SVG raster target".to_string()))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale as f32, scale as f32),
        &mut pixmap.as_mut(),
    );

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    // Bottom-up row order for PDF image space.
    for row in (0..height).rev() {
        for col in 0..width {
            let pixel = pixmap.pixels()[(row * width + col) as usize].demultiply();
            rgb.extend_from_slice(&[pixel.red(), pixel.green(), pixel.blue()]);
            alpha.push(pixel.alpha());
        }
    }

    Ok(SignatureArt {
        width,
        height,
        rgb,
        alpha,
    })
}

/// Embeds the signature as an image XObject with alpha SMask and appends a
/// draw operation to the page's content streams.
fn stamp_image(
    doc: &mut Document,
    page_id: lopdf::ObjectId,
    art: &SignatureArt,
    rect: &SignatureRect,
    xobject_name: &str,
) -> Result<(), OverlayError> {
    let scale = fit_scale(art.width as f64, art.height as f64, rect.width, rect.height);
    let draw_width = art.width as f64 * scale;
    let draw_height = art.height as f64 * scale;

    let compressed_rgb = zlib_compress(&art.rgb)?;
    let compressed_alpha = zlib_compress(&art.alpha)?;

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => art.width as i64,
            "Height" => art.height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        compressed_alpha,
    ));

    let xobject_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => art.width as i64,
            "Height" => art.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => Object::Reference(smask_id),
        },
        compressed_rgb,
    ));

    {
        let page = doc.get_object_mut(page_id).map_err(pdf_err)?;
        let dict = page.as_dict_mut().map_err(pdf_err)?;

        if !dict.has(b"Resources") {
            dict.set("Resources", Object::Dictionary(dictionary! {}));
        }
        let resources = dict
            .get_mut(b"Resources")
            .map_err(pdf_err)?
            .as_dict_mut()
            .map_err(pdf_err)?;
        if !resources.has(b"XObject") {
            resources.set("XObject", Object::Dictionary(dictionary! {}));
        }
        let xobjects = resources
            .get_mut(b"XObject")
            .map_err(pdf_err)?
            .as_dict_mut()
            .map_err(pdf_err)?;
        xobjects.set(
            xobject_name.as_bytes().to_vec(),
            Object::Reference(xobject_id),
        );
    }

    let draw_ops = format!(
        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
        draw_width, draw_height, rect.x, rect.y, xobject_name
    );
    let stream_id = doc.add_object(Stream::new(dictionary! {}, draw_ops.into_bytes()));

    {
        let page = doc.get_object_mut(page_id).map_err(pdf_err)?;
        let dict = page.as_dict_mut().map_err(pdf_err)?;

        let new_contents = match dict.remove(b"Contents") {
            Some(Object::Reference(existing)) => Object::Array(vec![
                Object::Reference(existing),
                Object::Reference(stream_id),
            ]),
            Some(Object::Array(mut array)) => {
                array.push(Object::Reference(stream_id));
                Object::Array(array)
            }
            _ => Object::Reference(stream_id),
        };
        dict.set("Contents", new_contents);
    }

    Ok(())
}

fn zlib_compress(data: &[u8]) -> Result<Vec<u8>, OverlayError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(pdf_err)?;
    encoder.finish().map_err(pdf_err)
}

fn pdf_err(e: impl std::fmt::Display) -> OverlayError {
    OverlayError::Pdf(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> String {
        text.to_string()
    }

    #[test]
    fn test_no_markers_on_last_two_pages_yields_empty() {
        let texts = vec![
            page("PIHAK PERTAMA dan PIHAK KEDUA"),
            page("pasal 2"),
            page("pasal 3"),
        ];
        assert!(marker_pages(&texts).is_empty());
    }

    #[test]
    fn test_both_last_pages_match() {
        let texts = vec![
            page("pasal 1"),
            page("ttd PIHAK PERTAMA ... PIHAK KEDUA"),
            page("PIHAK PERTAMA / PIHAK KEDUA"),
        ];
        assert_eq!(marker_pages(&texts), vec![1, 2]);
    }

    #[test]
    fn test_single_marker_is_not_enough() {
        let texts = vec![page("PIHAK PERTAMA saja"), page("PIHAK KEDUA saja")];
        assert!(marker_pages(&texts).is_empty());
    }

    #[test]
    fn test_single_page_document() {
        let texts = vec![page("PIHAK PERTAMA dan PIHAK KEDUA")];
        assert_eq!(marker_pages(&texts), vec![0]);
    }

    #[test]
    fn test_fit_scale_preserves_aspect_ratio() {
        // Wide asset limited by width.
        let s = fit_scale(340.0, 100.0, 170.0, 100.0);
        assert!((s - 0.5).abs() < f64::EPSILON);
        // Tall asset limited by height.
        let s = fit_scale(100.0, 400.0, 170.0, 100.0);
        assert!((s - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rect_for_last_page_sits_lower() {
        let last = rect_for_page(4, 5);
        let second_to_last = rect_for_page(3, 5);
        assert_eq!(last.y, 150.0);
        assert_eq!(second_to_last.y, 250.0);
    }
}
