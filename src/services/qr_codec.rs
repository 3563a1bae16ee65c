// src/services/qr_codec.rs
//! QR wire codec.
//!
//! Encodes signed attestations into the compact wire record, renders that
//! record as a QR image, and parses scanned text back into a record.
//!
//! # Rendering
//! - Error correction level M (about 15% of the symbol may be damaged)
//! - One-module quiet margin
//! - Pure black modules on pure white, PNG encoded

use crate::error::CodecError;
use crate::models::attestation::SignedAttestation;
use crate::models::qr_record::{QrWireRecord, WIRE_VERSION};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use serde::Serialize;
use serde_json::Value;
use std::io::Cursor;

const MODULE_PIXELS: u32 = 8;
const QUIET_ZONE_MODULES: u32 = 1;
const DARK: u8 = 0x00;
const LIGHT: u8 = 0xFF;
const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// A signed attestation in every shape the relying party may need.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EncodedQr {
    /// PNG as a `data:` URL
    pub qr_code: String,
    /// Record embedded in the image
    pub qr_data: QrWireRecord,
    /// Exact text embedded in the image
    #[serde(skip)]
    pub qr_text: String,
}

/// Flattens a signed attestation and renders it.
pub fn encode(signed: &SignedAttestation) -> Result<EncodedQr, CodecError> {
    let qr_data = QrWireRecord::from_signed(signed);
    let qr_text = qr_data.to_text()?;
    let png = render_png(&qr_text)?;

    Ok(EncodedQr {
        qr_code: to_data_url(&png),
        qr_data,
        qr_text,
    })
}

/// Parses scanned QR text into a wire record.
pub fn decode(scanned_text: &str) -> Result<QrWireRecord, CodecError> {
    let value: Value =
        serde_json::from_str(scanned_text.trim()).map_err(|e| CodecError::NotJson(e.to_string()))?;
    decode_value(value)
}

/// Parses an already-deserialized JSON value into a wire record.
///
/// Records without a signature or token id are malformed, never an empty
/// success.
pub fn decode_value(value: Value) -> Result<QrWireRecord, CodecError> {
    let object = value.as_object().ok_or(CodecError::NotAnObject)?;

    match object.get("s") {
        None | Some(Value::Null) => return Err(CodecError::MissingField("s")),
        Some(Value::String(signature)) if !signature.trim().is_empty() => {}
        Some(_) => {
            return Err(CodecError::InvalidField {
                field: "s",
                reason: "expected a non-empty hex string".into(),
            })
        }
    }

    match object.get("t") {
        None | Some(Value::Null) => return Err(CodecError::MissingField("t")),
        Some(token) if token.as_u64().is_none() => {
            return Err(CodecError::InvalidField {
                field: "t",
                reason: format!("expected a non-negative integer, got {}", token),
            })
        }
        Some(_) => {}
    }

    for field in ["v", "ts", "iss", "valid"] {
        if object.get(field).map_or(true, Value::is_null) {
            return Err(CodecError::MissingField(field));
        }
    }

    let record: QrWireRecord = serde_json::from_value(value).map_err(|e| CodecError::InvalidField {
        field: "record",
        reason: e.to_string(),
    })?;

    if record.v != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion(record.v));
    }

    Ok(record)
}

/// Renders `text` into a PNG QR symbol.
pub fn render_png(text: &str) -> Result<Vec<u8>, CodecError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M).map_err(|e| match e {
        QrError::DataTooLong => CodecError::TooLarge(format!("{} bytes of record text", text.len())),
        other => CodecError::Render(other.to_string()),
    })?;

    let width = code.width() as u32;
    let side = (width + 2 * QUIET_ZONE_MODULES) * MODULE_PIXELS;
    let mut canvas = GrayImage::from_pixel(side, side, Luma([LIGHT]));

    for (index, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let column = index as u32 % width + QUIET_ZONE_MODULES;
        let row = index as u32 / width + QUIET_ZONE_MODULES;
        for dy in 0..MODULE_PIXELS {
            for dx in 0..MODULE_PIXELS {
                canvas.put_pixel(column * MODULE_PIXELS + dx, row * MODULE_PIXELS + dy, Luma([DARK]));
            }
        }
    }

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(canvas)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CodecError::Render(e.to_string()))?;
    Ok(png)
}

/// Wraps PNG bytes in a `data:image/png;base64,` URL.
pub fn to_data_url(png: &[u8]) -> String {
    format!("{}{}", DATA_URL_PREFIX, base64::encode(png))
}

/// Reads the text stored in a QR PNG image.
pub fn scan_png(png: &[u8]) -> Result<String, CodecError> {
    let image = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| CodecError::Scan(e.to_string()))?
        .to_luma8();

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| image.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    let grid = grids
        .first()
        .ok_or_else(|| CodecError::Scan("no QR symbol found".into()))?;
    let (_, content) = grid
        .decode()
        .map_err(|e| CodecError::Scan(format!("{:?}", e)))?;
    Ok(content)
}

/// Reads the text stored in a `data:image/png;base64,` URL.
pub fn scan_data_url(data_url: &str) -> Result<String, CodecError> {
    let encoded = data_url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| CodecError::Scan("not a PNG data URL".into()))?;
    let png = base64::decode(encoded).map_err(|e| CodecError::Scan(e.to_string()))?;
    scan_png(&png)
}
