pub mod bootstrap;
pub mod deploy;
pub mod outputs;
pub mod param;
pub mod plan;
pub mod synth;
pub mod validate;
pub mod zones;
