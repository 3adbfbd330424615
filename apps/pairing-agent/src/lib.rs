// Library exports for testing
// The binary (main.rs) imports these as well

pub mod agent;
pub mod error;
pub mod logger;
pub mod settings;
pub mod signer;

#[cfg(test)]
mod tests;
