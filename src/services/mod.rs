pub mod aggregate;
pub mod batch;
pub mod device;
pub mod intake;
pub mod normalizer;
pub mod relay;
pub mod stats;
