pub mod trainer;

pub use trainer::{TrainOutcome, Trainer, TrainerError};
