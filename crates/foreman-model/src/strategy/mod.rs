mod restart;
pub use restart::RestartPolicy;
