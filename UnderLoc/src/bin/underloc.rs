fn main() -> anyhow::Result<()> {
    underloc::cli::run_cli()
}
