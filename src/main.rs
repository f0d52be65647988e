use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    webmcp_harness::infra::logging::init();
    webmcp_harness::cli::run().await
}
