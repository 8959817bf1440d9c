pub mod builtin;
pub mod context;
pub mod cycle;
pub mod errors;
pub mod exchange;
pub mod executor;
pub mod manager;
pub mod model;
pub mod registry;
pub mod stages;

pub use context::Context;
pub use cycle::detect_cycle;
pub use errors::{GraphError, StageError};
pub use exchange::{export, from_json, import, to_json, GraphRecord};
pub use executor::{ExecutionState, GraphExecutor, StepOutcome};
pub use manager::GraphManager;
pub use model::{Edge, Node, WorkflowGraph};
pub use registry::{ConditionFn, Registry, StageFn};
