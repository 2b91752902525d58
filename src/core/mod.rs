pub mod context;

pub use context::RunContext;
