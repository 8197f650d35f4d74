fn main() -> anyhow::Result<()> {
    reminder_triage::cli::run()
}
