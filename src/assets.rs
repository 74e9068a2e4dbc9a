use crate::error::BookPressError;
use base64::Engine;
use image::GenericImageView;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

// Image payload ready to become a PDF image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageData {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) color_space: &'static str,
    pub(crate) filter: &'static str,
    pub(crate) data: Vec<u8>,
    // Flate-compressed 8-bit alpha channel, only when some pixel is translucent.
    pub(crate) alpha: Option<Vec<u8>>,
}

// Images referenced by one render, keyed by their source string (a path or a
// data URI). BTreeMap keeps XObject numbering stable between runs.
#[derive(Debug, Default, Clone)]
pub(crate) struct ImageStore {
    images: BTreeMap<String, Arc<ImageData>>,
}

impl ImageStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn load(&mut self, source: &str) -> Result<Arc<ImageData>, BookPressError> {
        if let Some(image) = self.images.get(source) {
            return Ok(Arc::clone(image));
        }
        let image = Arc::new(load_image(source)?);
        self.images.insert(source.to_string(), Arc::clone(&image));
        Ok(image)
    }

    pub(crate) fn load_path(&mut self, path: &Path) -> Result<Arc<ImageData>, BookPressError> {
        self.load(&source_key(path))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ImageData>)> {
        self.images.iter().map(|(key, image)| (key.as_str(), image))
    }

    pub(crate) fn len(&self) -> usize {
        self.images.len()
    }
}

pub(crate) fn source_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// Checks that an image can be read and decoded without keeping it.
pub(crate) fn probe_image(path: &Path) -> Result<(u32, u32), BookPressError> {
    let image = load_image(&source_key(path))?;
    Ok((image.width, image.height))
}

fn load_image(source: &str) -> Result<ImageData, BookPressError> {
    if let Some((mime, data)) = parse_data_uri(source) {
        return decode_image_bytes(&data, Some(&mime))
            .map_err(|err| BookPressError::Asset(format!("data URI image: {err}")));
    }
    let bytes = std::fs::read(source)
        .map_err(|err| BookPressError::Asset(format!("cannot read image {source}: {err}")))?;
    decode_image_bytes(&bytes, None)
        .map_err(|err| BookPressError::Asset(format!("cannot decode image {source}: {err}")))
}

fn decode_image_bytes(data: &[u8], mime: Option<&str>) -> Result<ImageData, String> {
    let format = match mime {
        Some(mime) if mime.contains("png") => Some(image::ImageFormat::Png),
        Some(mime) if mime.contains("jpeg") || mime.contains("jpg") => {
            Some(image::ImageFormat::Jpeg)
        }
        Some(_) => None,
        None => image::guess_format(data).ok(),
    };

    let decoded = image::load_from_memory(data).map_err(|err| err.to_string())?;
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err("image has no pixels".to_string());
    }

    // JPEG streams pass through untouched.
    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Ok(ImageData {
            width,
            height,
            color_space,
            filter: "/DCTDecode",
            data: data.to_vec(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        has_alpha |= a != 255;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Ok(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        filter: "/FlateDecode",
        data: flate_compress(&rgb),
        alpha: has_alpha.then(|| flate_compress(&alpha)),
    })
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains("base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

pub(crate) fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn write_test_png(path: &Path, width: u32, height: u32, alpha: u8) {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, alpha]));
    img.save_with_format(path, image::ImageFormat::Png)
        .expect("write png");
}
