fn main() -> anyhow::Result<()> {
    hazardlens_lib::run()
}
