pub mod jwks;
pub mod metadata;
pub mod proxy;
pub mod verifier;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
