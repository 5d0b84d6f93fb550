// Path: crates/types/src/app/serde_util.rs
//! Serde adapters for JSON-facing views of consensus data.

/// Serializes byte vectors as lowercase hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes `bytes` as hex.
    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    /// Deserializes hex into bytes. A `0x` prefix is accepted.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

/// Serializes `u128` amounts as base-10 strings so JSON readers never lose precision.
pub mod decimal_u128 {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes `v` as a decimal string.
    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    /// Parses a decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let s = String::deserialize(d)?;
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct View {
        #[serde(with = "super::hex_bytes")]
        id: Vec<u8>,
        #[serde(with = "super::decimal_u128")]
        amount: u128,
    }

    #[test]
    fn json_view_uses_hex_and_decimal_strings() {
        let v = View {
            id: vec![0xab, 0x01],
            amount: u128::MAX,
        };
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(
            json,
            format!(r#"{{"id":"ab01","amount":"{}"}}"#, u128::MAX)
        );
        assert_eq!(serde_json::from_str::<View>(&json).unwrap(), v);
        let prefixed: View = serde_json::from_str(r#"{"id":"0xab01","amount":"7"}"#).unwrap();
        assert_eq!(prefixed.id, vec![0xab, 0x01]);
    }
}
