pub mod job;

pub use job::{Job, SampleClass, UnknownClass};
