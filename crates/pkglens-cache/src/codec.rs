//! Binary encoding of cache entries.
//!
//! Layout: `[format version][resource kind tag][bincode payload]`. The payload
//! is the bincode encoding of `Option<Value>`, where `None` records that the
//! origin reported the resource as nonexistent.

use pkglens_core::{Error, Resource, Result};

/// Bumped whenever the payload layout of any value type changes
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = 2;

/// A decoded cache entry
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    /// The origin returned a value
    Present(T),
    /// The origin reported that the resource does not exist
    NotFound,
}

impl<T> Entry<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Entry::Present(value) => Some(value),
            Entry::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Entry<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Entry::Present(value),
            None => Entry::NotFound,
        }
    }
}

/// Encode a resolved value of resource `R`
pub fn encode<R: Resource>(value: Option<&R::Value>) -> Result<Vec<u8>> {
    let payload = bincode::serialize(&value).map_err(|e| Error::Codec {
        message: format!("failed to encode {} entry: {e}", R::KIND),
    })?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.push(FORMAT_VERSION);
    bytes.push(R::KIND.tag());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode bytes written by [`encode`] for the same resource `R`
pub fn decode<R: Resource>(bytes: &[u8]) -> Result<Entry<R::Value>> {
    let (header, payload) = match bytes {
        [version, tag, payload @ ..] => ((*version, *tag), payload),
        _ => {
            return Err(Error::Codec {
                message: format!("entry of {} bytes has no header", bytes.len()),
            })
        },
    };

    if header.0 != FORMAT_VERSION {
        return Err(Error::Codec {
            message: format!("unsupported format version {}", header.0),
        });
    }
    if header.1 != R::KIND.tag() {
        return Err(Error::Codec {
            message: format!("entry tagged {} is not a {} entry", header.1, R::KIND),
        });
    }

    let value: Option<R::Value> = bincode::deserialize(payload).map_err(|e| Error::Codec {
        message: format!("failed to decode {} entry: {e}", R::KIND),
    })?;
    Ok(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkglens_core::resource::{BundleSize, Downloads, Manifest};
    use pkglens_core::types::{self, PackageManifest};

    fn downloads() -> types::WeeklyDownloads {
        types::WeeklyDownloads {
            package: "react".to_string(),
            downloads: 25_000_000,
            start: "2026-10-08".to_string(),
            end: "2026-10-14".to_string(),
        }
    }

    #[test]
    fn test_present_value() {
        let bytes = encode::<Downloads>(Some(&downloads())).unwrap();
        assert_eq!(bytes[0], FORMAT_VERSION);
        assert_eq!(bytes[1], Downloads::KIND.tag());

        let entry = decode::<Downloads>(&bytes).unwrap();
        assert_eq!(entry, Entry::Present(downloads()));
    }

    #[test]
    fn test_not_found_marker() {
        let bytes = encode::<Manifest>(None).unwrap();
        let entry = decode::<Manifest>(&bytes).unwrap();
        assert_eq!(entry, Entry::NotFound);
        assert_eq!(entry.into_option(), None::<PackageManifest>);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let bytes = encode::<Downloads>(Some(&downloads())).unwrap();
        let result = decode::<BundleSize>(&bytes);
        assert!(matches!(result, Err(Error::Codec { .. })));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode::<Downloads>(&[]).is_err());
        assert!(decode::<Downloads>(&[FORMAT_VERSION]).is_err());
        assert!(decode::<Downloads>(&[99, Downloads::KIND.tag(), 1]).is_err());
        assert!(decode::<Downloads>(&[FORMAT_VERSION, Downloads::KIND.tag(), 1, 2]).is_err());
    }
}
