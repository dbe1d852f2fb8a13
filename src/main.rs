use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    image_feed_uploader_lib::run().await
}
