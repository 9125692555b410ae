//! Config command handler

use storefront_probe::SuiteConfig;

use crate::error::CliResult;

/// Print the resolved configuration as YAML
pub fn execute_config(config: &SuiteConfig) -> CliResult<()> {
    print!("{}", render_config(config)?);
    Ok(())
}

/// YAML rendering of the resolved configuration
pub fn render_config(config: &SuiteConfig) -> CliResult<String> {
    Ok(config.to_yaml()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_round_trips() {
        let config = SuiteConfig::default().with_base_url("https://shop.test");
        let yaml = render_config(&config).unwrap();
        assert!(yaml.contains("base_url: https://shop.test"));
        assert_eq!(SuiteConfig::from_yaml(&yaml).unwrap(), config);
    }
}
