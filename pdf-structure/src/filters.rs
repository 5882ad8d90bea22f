//! Decoding helpers for the common lossless stream filters. The parser
//! itself never touches `Stream.data`; callers that want decoded bytes
//! opt in here.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use crate::objects::{Dict, PdfObject};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A filter (or filter option) this module does not implement.
    Unsupported(String),
    Decode {
        filter: &'static str,
        detail: String,
    },
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::Unsupported(what) => {
                write!(f, "unsupported stream filter: {}", what)
            }
            FilterError::Decode { filter, detail } => {
                write!(f, "{} failed: {}", filter, detail)
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Decode a stream payload according to its dictionary's `/Filter`
/// entry. A missing `/Filter` returns the bytes unchanged; filter chains
/// apply left to right.
pub fn decode_stream(dict: &Dict, data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None => return Ok(data.to_vec()),
        Some(PdfObject::Name(name)) => vec![name.as_str()],
        Some(PdfObject::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_name()
                    .ok_or_else(|| FilterError::Unsupported("non-name in /Filter array".into()))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(FilterError::Unsupported(
                "/Filter is neither a name nor an array".into(),
            ))
        }
    };

    if has_predictor(dict) {
        return Err(FilterError::Unsupported("/DecodeParms predictor".into()));
    }

    let mut out = data.to_vec();
    for filter in filters {
        out = match filter {
            "FlateDecode" | "Fl" => inflate(&out)?,
            "ASCIIHexDecode" | "AHx" => ascii_hex_decode(&out)?,
            other => return Err(FilterError::Unsupported(other.to_string())),
        };
    }
    Ok(out)
}

fn has_predictor(dict: &Dict) -> bool {
    let parms = dict.get("DecodeParms").or_else(|| dict.get("DP"));
    match parms {
        Some(PdfObject::Dictionary(d)) => predictor_set(d),
        Some(PdfObject::Array(items)) => items
            .iter()
            .any(|item| item.as_dict().is_some_and(predictor_set)),
        _ => false,
    }
}

fn predictor_set(parms: &Dict) -> bool {
    parms
        .get("Predictor")
        .and_then(PdfObject::as_integer)
        .is_some_and(|p| p > 1)
}

/// Most producers wrap deflate data in a zlib envelope, but raw deflate
/// streams exist in the wild; probe zlib first.
fn inflate(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::new();
    if ZlibDecoder::new(data).read_to_end(&mut out).is_ok() {
        return Ok(out);
    }
    out.clear();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| FilterError::Decode {
            filter: "FlateDecode",
            detail: e.to_string(),
        })?;
    Ok(out)
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut digits = Vec::new();
    for &b in data {
        match b {
            b'>' => break,
            0 | 9 | 10 | 12 | 13 | 32 => continue,
            b'0'..=b'9' => digits.push(b - b'0'),
            b'a'..=b'f' => digits.push(b - b'a' + 10),
            b'A'..=b'F' => digits.push(b - b'A' + 10),
            other => {
                return Err(FilterError::Decode {
                    filter: "ASCIIHexDecode",
                    detail: format!("invalid byte 0x{:02x}", other),
                })
            }
        }
    }
    if digits.len() % 2 != 0 {
        digits.push(0);
    }
    Ok(digits.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect())
}
