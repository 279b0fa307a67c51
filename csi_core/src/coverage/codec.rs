//! Self-describing registry blobs.
//!
//! Registries are serialised as a gzip-framed JSON document. All registry
//! state lives in ordered maps and sets keyed by canonical path strings, so
//! semantically identical registries produce byte-identical blobs.

use super::CombinationsRegistry;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors raised while encoding or decoding registry blobs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The underlying reader or writer failed.
    #[error("registry blob i/o failed")]
    Io(#[from] std::io::Error),
    /// The blob contents do not describe a registry.
    #[error("malformed registry blob")]
    Malformed(#[from] serde_json::Error),
}

impl CombinationsRegistry {
    /// Writes the registry as a gzip-framed, self-describing blob.
    pub fn encode<W: Write>(&self, writer: W) -> Result<(), CodecError> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, self)?;
        encoder.finish()?;
        Ok(())
    }

    /// Reads a registry back from a blob written by [`Self::encode`].
    pub fn decode<R: Read>(reader: R) -> Result<Self, CodecError> {
        let decoder = GzDecoder::new(reader);
        Ok(serde_json::from_reader(decoder)?)
    }

    /// Encodes the registry into a fresh byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        self.encode(&mut buffer)?;
        Ok(buffer)
    }

    /// Decodes a registry from an in-memory blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Path;
    use crate::coverage::RegistryBuilder;
    use crate::domain::Domain;
    use crate::trace::Trace;
    use crate::value::Value;

    fn path(name: &str) -> Path {
        name.parse().unwrap()
    }

    fn sample_registry() -> CombinationsRegistry {
        let mut builder = RegistryBuilder::new();
        builder.add_component(path("cobot::velocity"), Domain::range(0.0, 20.0, 5.0).unwrap());
        builder.add_component(
            path("cobot::mode"),
            Domain::values([Value::symbol("idle"), Value::symbol("moving")]),
        );
        builder.set_default(path("cobot::mode"), Value::symbol("idle"));
        let mut registry = builder.build();

        let mut trace = Trace::new();
        trace.set(&path("cobot::velocity"), 0.0, Value::from(2.0));
        trace.set(&path("cobot::velocity"), 1.0, Value::from(12.0));
        trace.set(&path("cobot::mode"), 1.0, Value::symbol("moving"));
        registry.register(&trace);
        registry
    }

    #[test]
    fn round_trip_preserves_equality() {
        let registry = sample_registry();
        let blob = registry.to_bytes().unwrap();
        let decoded = CombinationsRegistry::from_bytes(&blob).unwrap();
        assert_eq!(decoded, registry);
    }

    #[test]
    fn equal_registries_encode_identically() {
        let blob_a = sample_registry().to_bytes().unwrap();
        let blob_b = sample_registry().to_bytes().unwrap();
        assert_eq!(blob_a, blob_b);
    }

    #[test]
    fn garbage_blobs_are_rejected() {
        assert!(CombinationsRegistry::from_bytes(b"not a blob").is_err());
    }
}
