use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = blob_backup::cli::parse();
    app::run(args)
}
