use flate2::{Compression as GzLevel, write::GzEncoder};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

/// Stream compression applied to the encoded body before transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Gzip,
}

impl Compression {
    /// Value of the `Content-Encoding` header, if any.
    pub fn content_encoding(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gzip"),
        }
    }

    /// Wraps `payload` in the configured compressor.
    pub fn compress(self, payload: Vec<u8>) -> std::io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(payload),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), GzLevel::fast());
                encoder.write_all(&payload)?;
                encoder.finish()
            }
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            other => Err(format!("unsupported compression '{other}'")),
        }
    }
}
