//! Per-format image compression.

use std::io::Cursor;
use std::path::Path;

use assetline_config::ImagesConfig;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat, RgbaImage};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Error raised by an image codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("invalid GIF: {0}")]
    GifDecode(#[from] gif::DecodingError),
    #[error("cannot encode GIF: {0}")]
    GifEncode(#[from] gif::EncodingError),
    #[error("invalid SVG: {0}")]
    Svg(String),
}

/// Compression strategy, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Format {
    Png,
    Jpeg,
    Gif,
    Svg,
    Other,
}

impl Format {
    pub(crate) fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "svg" => Self::Svg,
            _ => Self::Other,
        }
    }
}

/// Compress `bytes` according to `format`.
///
/// The result may be larger than the input; callers keep the smaller one.
pub(crate) fn compress(
    format: Format,
    bytes: &[u8],
    settings: &ImagesConfig,
) -> Result<Vec<u8>, CodecError> {
    match format {
        Format::Png => png(bytes, settings.png_quality),
        Format::Jpeg => jpeg(bytes, settings.jpeg_quality),
        Format::Gif => gif(bytes, settings.gif_optimization),
        Format::Svg => svg(bytes),
        Format::Other => Ok(bytes.to_vec()),
    }
}

/// Quantize to a per-channel precision derived from `quality`, then
/// re-encode with the strongest deflate and adaptive filtering.
///
/// Quantization is dropped when it would fall below the minimum quality.
fn png(bytes: &[u8], quality: [f32; 2]) -> Result<Vec<u8>, CodecError> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let has_alpha = decoded.color().has_alpha();
    let original = decoded.to_rgba8();

    let mut quantized = original.clone();
    posterize(&mut quantized, channel_bits(quality[1]));
    let pixels = if similarity(&original, &quantized) >= quality[0] {
        quantized
    } else {
        original
    };

    let (width, height) = pixels.dimensions();
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    if has_alpha {
        encoder.write_image(pixels.as_raw(), width, height, ColorType::Rgba8)?;
    } else {
        let rgb = DynamicImage::ImageRgba8(pixels).to_rgb8();
        encoder.write_image(rgb.as_raw(), width, height, ColorType::Rgb8)?;
    }
    Ok(out)
}

/// Bits kept per color channel for a quality in `0.0..=1.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_bits(quality: f32) -> u8 {
    (2.0 + 6.0 * quality).round().clamp(1.0, 8.0) as u8
}

/// Round color channels to `bits` of precision. Alpha is left intact.
fn posterize(pixels: &mut RgbaImage, bits: u8) {
    if bits >= 8 {
        return;
    }
    let step = 1u16 << (8 - bits);
    for pixel in pixels.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            let rounded = (u16::from(*channel) + step / 2) / step * step;
            *channel = u8::try_from(rounded.min(255)).unwrap_or(u8::MAX);
        }
    }
}

/// `1 - rms / 255` over every channel of two equally sized images.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn similarity(a: &RgbaImage, b: &RgbaImage) -> f32 {
    let samples = a.as_raw().len();
    if samples == 0 {
        return 1.0;
    }
    let sum: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum();
    let rms = (sum / samples as f64).sqrt();
    (1.0 - rms / 255.0) as f32
}

fn jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, CodecError> {
    let rgb = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode(
        rgb.as_raw(),
        width,
        height,
        ColorType::Rgb8,
    )?;
    Ok(out)
}

/// Losslessly re-encode every frame from its palette indices.
///
/// Frame timing, disposal, transparency, palettes and the loop count are
/// carried over. From level 2 on, a local palette identical to the global
/// one is dropped.
fn gif(bytes: &[u8], level: u8) -> Result<Vec<u8>, CodecError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(Cursor::new(bytes))?;
    let global_palette = decoder.global_palette().map(<[u8]>::to_vec);

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame()? {
        let mut frame = frame.clone();
        if level >= 2 && frame.palette.is_some() && frame.palette == global_palette {
            frame.palette = None;
        }
        frames.push(frame);
    }

    let mut out = Vec::with_capacity(bytes.len());
    {
        let mut encoder = gif::Encoder::new(
            &mut out,
            decoder.width(),
            decoder.height(),
            global_palette.as_deref().unwrap_or_default(),
        )?;
        // A stream without a loop extension plays once; writing a count of
        // zero would make it loop forever.
        let repeat = decoder.repeat();
        if repeat != gif::Repeat::Finite(0) {
            encoder.set_repeat(repeat)?;
        }
        for frame in &frames {
            encoder.write_frame(frame)?;
        }
    }
    Ok(out)
}

/// Elements removed together with their content.
fn is_editor_element(name: &str) -> bool {
    name == "metadata" || name.starts_with("sodipodi:") || name.starts_with("inkscape:")
}

/// Attributes removed from every element.
fn is_editor_attribute(key: &str) -> bool {
    const PREFIXES: &[&str] = &[
        "sodipodi:",
        "inkscape:",
        "xmlns:sodipodi",
        "xmlns:inkscape",
        "xmlns:rdf",
        "xmlns:cc",
        "xmlns:dc",
    ];
    PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Drop comments, processing instructions, the doctype, editor metadata
/// and whitespace-only text.
fn svg(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|e| CodecError::Svg(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(bytes.len()));
    let mut skip_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CodecError::Svg(e.to_string()))?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => return Err(CodecError::Svg("unexpected end of document".to_owned())),
                _ => {}
            }
            continue;
        }

        let kept = match event {
            Event::Eof => break,
            Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => None,
            Event::Text(ref t) if t.iter().all(u8::is_ascii_whitespace) => None,
            Event::Start(ref e) if is_editor_element(&element_name(e)) => {
                skip_depth = 1;
                None
            }
            Event::Empty(ref e) if is_editor_element(&element_name(e)) => None,
            Event::Start(ref e) => match strip_attributes(e) {
                Ok(stripped) => Some(Event::Start(stripped)),
                Err(err) => return Ok(unchanged(bytes, &err)),
            },
            Event::Empty(ref e) => match strip_attributes(e) {
                Ok(stripped) => Some(Event::Empty(stripped)),
                Err(err) => return Ok(unchanged(bytes, &err)),
            },
            other => Some(other),
        };
        if let Some(event) = kept {
            writer
                .write_event(event)
                .map_err(|e| CodecError::Svg(e.to_string()))?;
        }
    }

    Ok(writer.into_inner())
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn strip_attributes<'a>(e: &'a BytesStart<'a>) -> Result<BytesStart<'a>, AttrError> {
    let mut stripped = BytesStart::new(element_name(e));
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if !is_editor_attribute(&key) {
            stripped.push_attribute(attr);
        }
    }
    Ok(stripped)
}

/// Source bytes of an SVG whose attributes cannot be parsed.
fn unchanged(bytes: &[u8], err: &AttrError) -> Vec<u8> {
    tracing::warn!(error = %err, "Malformed SVG attribute, keeping original");
    bytes.to_vec()
}
