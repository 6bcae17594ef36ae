use exif::{In, Tag, Value};
use serde_json::json;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::warn;

use super::gps;

/// Everything read from a photo's embedded tag block.
///
/// `tags` is the full tag-name → value mapping as stored in the catalog's
/// `exif_meta` column. Coordinates are committed as a pair: a file whose
/// longitude fails to parse gets no coordinates at all.
#[derive(Debug, Clone, Default)]
pub struct ExifMetadata {
    pub tags: serde_json::Map<String, serde_json::Value>,
    pub date_time_original_text: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

impl ExifMetadata {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Extract EXIF metadata from a photo file.
///
/// Extraction failure is non-fatal: a file with no tag block, or one that
/// cannot be decoded at all, produces an empty mapping.
pub fn extract_metadata(path: &Path) -> ExifMetadata {
    let exif = match read_exif(path) {
        Ok(exif) => exif,
        Err(e) => {
            warn!("could not extract EXIF from {}: {}", path.display(), e);
            return ExifMetadata::default();
        }
    };

    let mut metadata = ExifMetadata::default();

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        metadata
            .tags
            .insert(field.tag.to_string(), value_to_json(&field.value));
    }

    // Capture time: DateTime wins over DateTimeOriginal, no merge
    metadata.date_time_original_text = [Tag::DateTime, Tag::DateTimeOriginal]
        .iter()
        .find_map(|&tag| exif.get_field(tag, In::PRIMARY))
        .map(|field| field.display_value().to_string().trim_matches('"').to_string());

    extract_coordinates(&exif, &mut metadata);

    metadata
}

fn read_exif(path: &Path) -> anyhow::Result<exif::Exif> {
    let file = File::open(path)?;
    let mut bufreader = BufReader::new(file);
    Ok(exif::Reader::new().read_from_container(&mut bufreader)?)
}

fn extract_coordinates(exif: &exif::Exif, metadata: &mut ExifMetadata) {
    let latitude = parse_signed_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
    let longitude = parse_signed_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);

    // A lone coordinate is useless; only the complete pair is kept
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return;
    };

    metadata.latitude = Some(gps::round_dp(latitude, 6));
    metadata.longitude = Some(gps::round_dp(longitude, 6));

    metadata.altitude = exif
        .get_field(Tag::GPSAltitude, In::PRIMARY)
        .and_then(|field| gps::normalize_coordinate(&field.value))
        .map(|altitude| gps::round_dp(altitude, 2));
}

fn parse_signed_coordinate(exif: &exif::Exif, tag: Tag, ref_tag: Tag) -> Option<f64> {
    let value = gps::normalize_coordinate(&exif.get_field(tag, In::PRIMARY)?.value)?;
    // The hemisphere reference, when present, decides the sign; encoders
    // that store signed values without a ref keep their own sign
    match exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|field| gps::hemisphere_sign(&field.value))
    {
        Some(sign) => Some(sign * value.abs()),
        None => Some(value),
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Ascii(v) => {
            let parts: Vec<String> = v.iter().map(|bytes| decode_text(bytes)).collect();
            json!(parts.join(" "))
        }
        Value::Byte(v) => json!(decode_text(v)),
        Value::Undefined(v, _) => json!(decode_text(v)),
        Value::Short(v) => numbers(v.iter().map(|&n| f64::from(n))),
        Value::Long(v) => numbers(v.iter().map(|&n| f64::from(n))),
        Value::SByte(v) => numbers(v.iter().map(|&n| f64::from(n))),
        Value::SShort(v) => numbers(v.iter().map(|&n| f64::from(n))),
        Value::SLong(v) => numbers(v.iter().map(|&n| f64::from(n))),
        Value::Float(v) => numbers(v.iter().map(|&n| f64::from(n))),
        Value::Double(v) => numbers(v.iter().copied()),
        Value::Rational(v) => numbers(v.iter().map(|r| r.to_f64())),
        Value::SRational(v) => numbers(v.iter().map(|r| r.to_f64())),
        _ => json!(value.display_as(Tag::ImageDescription).to_string()),
    }
}

/// Binary payloads are decoded as UTF-8 when possible; otherwise a lossy
/// rendering keeps the information without failing extraction.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn numbers(values: impl Iterator<Item = f64>) -> serde_json::Value {
    let collected: Vec<serde_json::Value> = values
        .map(|n| serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, Into::into))
        .collect();
    match collected.as_slice() {
        [single] => single.clone(),
        _ => serde_json::Value::Array(collected),
    }
}
