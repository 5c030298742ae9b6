pub mod generator_config;
pub mod pipeline_config;

pub use generator_config::GeneratorConfig;
pub use pipeline_config::*;
