#![deny(missing_docs)]
#![doc = "Core error, RNG, provenance and hashing types shared by the clipcat crates."]

pub mod canonical;
pub mod errors;
pub mod provenance;
pub mod rng;

pub use canonical::{from_json_slice, stable_hash_string, to_canonical_json_bytes};
pub use errors::{ClipcatError, ErrorInfo};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::RngHandle;
