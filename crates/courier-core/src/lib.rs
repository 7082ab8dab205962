pub mod engine;
pub mod error;
pub mod metrics;
pub mod query;
pub mod quota;
pub mod records;

pub use engine::DispatchEngine;
pub use error::DispatchError;
pub use metrics::MetricsService;
pub use query::MessageQueryService;
pub use quota::QuotaService;
