pub mod algorithm;
pub mod commitment;
pub mod encryption;
pub mod ephemeral;
pub mod error;
pub mod hashing;
pub mod kdf;
pub mod keys;

pub use algorithm::{Algorithm, AlgorithmProvider, AlgorithmType, Es256kAlgorithm, NoneAlgorithm};
pub use commitment::{DisclosureParam, HashedAttribute};
pub use encryption::{Jwe, JweHeader};
pub use ephemeral::{CurveType, EphemeralKey, EphemeralPublicKey};
pub use error::CryptoError;
pub use hashing::HashAlgorithm;
pub use keys::{PrivateKey, PublicKey};
