pub mod record;
pub mod sacct;

pub use record::{JobRecord, Node};
