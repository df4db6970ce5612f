use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrewError {
    #[error("Crew size must be at least 1.")]
    EmptyCrew,
    #[error("Failed to spawn crew worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("Crew queue is full.")]
    QueueFull,
    #[error("Crew is shutting down.")]
    ShutDown,
    #[error("Crew is closed to new work.")]
    Closed,
    #[error("Crew worker {index} panicked.")]
    WorkerPanicked { index: usize },
}
