use thiserror::Error;

/// Failure surfaced by a stage function. Stages are external collaborators,
/// so their errors arrive as opaque boxed values.
pub type StageError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// The requested mutation or construction would close a cycle. The
    /// graph is left exactly as it was.
    #[error("graph `{graph}` would contain a cycle")]
    CyclicGraph { graph: String },

    #[error("unknown node id `{id}`")]
    UnknownNode { id: String },

    #[error("duplicate node id `{id}`")]
    DuplicateNode { id: String },

    #[error("unknown condition `{name}`")]
    UnknownCondition { name: String },

    #[error("unknown stage `{name}`")]
    UnknownStage { name: String },

    /// A stage function failed. The session Context is unchanged and the
    /// executor did not advance.
    #[error("stage failed at node `{node}`: {source}")]
    StageFailure {
        node: String,
        #[source]
        source: StageError,
    },

    #[error("invalid graph record: {0}")]
    Record(#[from] serde_json::Error),
}
