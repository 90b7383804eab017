//! License record and signed packet, plus their on-disk JSON representation.
//!
//! A packet file looks like:
//!
//! ```json
//! {
//!     "licenca": {
//!         "cliente": "Acme Corp",
//!         "validade": "2024-01-31"
//!     },
//!     "assinatura": "<base64 signature>"
//! }
//! ```
//!
//! The wire names are fixed; `customer_name`/`expiry_date` map to
//! `cliente`/`validade`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, LicenseResult};

/// Date format used on the wire and in the signed bytes.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const PACKET_INDENT: &[u8] = b"    ";

/// The signed content of a license.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseRecord {
    /// Customer the license was issued to.
    #[serde(rename = "cliente")]
    pub customer_name: String,
    /// Last calendar day on which the license is valid.
    #[serde(rename = "validade", with = "wire_date")]
    pub expiry_date: NaiveDate,
}

impl LicenseRecord {
    #[must_use]
    pub fn new(customer_name: impl Into<String>, expiry_date: NaiveDate) -> Self {
        Self {
            customer_name: customer_name.into(),
            expiry_date,
        }
    }
}

/// A license record together with the signature over its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicensePacket {
    #[serde(rename = "licenca")]
    pub license: LicenseRecord,
    /// Raw RSA-PSS signature; base64 on the wire.
    #[serde(rename = "assinatura", with = "wire_signature")]
    pub signature: Vec<u8>,
}

/// Serializes a packet as pretty-printed JSON with a stable key order.
pub fn serialize_packet(packet: &LicensePacket) -> LicenseResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(PACKET_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    packet
        .serialize(&mut serializer)
        .map_err(|e| LicenseError::PacketFormat(e.to_string()))?;
    Ok(out)
}

/// Parses packet bytes.
///
/// # Errors
///
/// Returns [`LicenseError::PacketFormat`] when a required field is missing,
/// an unknown field is present, the date is not `YYYY-MM-DD`, or the
/// signature is not valid base64.
pub fn deserialize_packet(bytes: &[u8]) -> LicenseResult<LicensePacket> {
    serde_json::from_slice(bytes).map_err(|e| LicenseError::PacketFormat(e.to_string()))
}

mod wire_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let date = NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map_err(|e| D::Error::custom(format!("invalid date {raw:?}: {e}")))?;
        // Lenient widths ("2024-1-5") would re-serialize differently than signed.
        if date.format(DATE_FORMAT).to_string() != raw {
            return Err(D::Error::custom(format!(
                "date {raw:?} is not in YYYY-MM-DD form"
            )));
        }
        Ok(date)
    }
}

mod wire_signature {
    use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BASE64
            .decode(raw.trim())
            .map_err(|e| D::Error::custom(format!("invalid signature base64: {e}")))
    }
}
