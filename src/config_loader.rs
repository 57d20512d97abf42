use crate::config::Scenario;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs;
use std::path::Path;

/// Serialization format of a scenario file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Pick the format from the file extension; anything but `.json` is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Load, parse and validate a scenario from a YAML or JSON file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    info!("Loading scenario from: {:?}", path);

    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read scenario file '{}'", path.display()))?;

    let scenario: Scenario = match Format::from_path(path) {
        Format::Json => serde_json::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse JSON scenario '{}'", path.display()))?,
        Format::Yaml => serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse YAML scenario '{}'", path.display()))?,
    };

    scenario
        .validate()
        .wrap_err_with(|| format!("Scenario '{}' is invalid", scenario.name))?;

    info!(
        "Loaded scenario '{}': {} nodes, {} links, {} routes",
        scenario.name,
        scenario.topology.nodes.len(),
        scenario.topology.links.len(),
        scenario.routes.len()
    );
    Ok(scenario)
}

/// Render a scenario in the given format
pub fn render_scenario(scenario: &Scenario, format: Format) -> Result<String> {
    let text = match format {
        Format::Json => serde_json::to_string_pretty(scenario)?,
        Format::Yaml => serde_yaml::to_string(scenario)?,
    };
    Ok(text)
}

/// Write a scenario to a file, choosing the format by extension
pub fn write_scenario(scenario: &Scenario, path: &Path) -> Result<()> {
    let text = render_scenario(scenario, Format::from_path(path))?;
    fs::write(path, text)
        .wrap_err_with(|| format!("Failed to write scenario file '{}'", path.display()))?;
    info!("Scenario '{}' written to {:?}", scenario.name, path);
    Ok(())
}
