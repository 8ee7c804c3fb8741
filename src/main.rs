fn main() -> anyhow::Result<()> {
    workmon_lib::run()
}
