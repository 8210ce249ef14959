fn main() -> anyhow::Result<()> {
    jinspect_cli::run()
}
