pub mod pipeline;
pub mod service;

pub use pipeline::{PipelineSettings, PortfolioPipeline, RunContext};
pub use service::KellyService;
