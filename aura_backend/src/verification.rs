//! Public verification links and their QR codes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::render::svg;
use qrcode::QrCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Failed to encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

pub fn verification_url(base_url: &str, batch_id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), batch_id)
}

/// Render `data` as an SVG QR code wrapped in a `data:` URL.
pub fn qr_data_url(data: &str) -> Result<String, QrError> {
    let code = QrCode::new(data.as_bytes())?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}
