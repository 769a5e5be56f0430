//! データモデル定義

mod network;
mod params;
mod plan;
mod project;
mod tier;
mod zone;

pub use network::*;
pub use params::*;
pub use plan::*;
pub use project::*;
pub use tier::*;
pub use zone::*;
