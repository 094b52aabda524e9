use anyhow::Result;

fn main() -> Result<()> {
    jvmscope::cli::run()
}
