mod artifacts;
mod command_line;
mod deploy;
mod ethers_framework;
mod framework;

use std::process::ExitCode;

use clap::Parser;
use command_line::CommandLine;
use dotenv::dotenv;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();
    let cmd = CommandLine::parse();
    ExitCode::from(cmd.execute().await)
}
