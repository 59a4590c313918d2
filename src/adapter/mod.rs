pub mod rspamc;

pub use rspamc::{DEFAULT_TRAINER_COMMAND, RspamcTrainer};
