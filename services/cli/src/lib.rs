mod cli;
mod commands;
mod infra;

use pdufa_engine::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
