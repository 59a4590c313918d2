use mctsd::error::LearnerError;

#[tokio::main]
async fn main() -> Result<(), LearnerError> {
    mctsd::app::run().await
}
