use drain_core::HarnessConfig;

pub fn print(config: &HarnessConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
