use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::Path;

use assayer_common::config::{PathsConfig, Settings};
use assayer_common::error::AssayerError;
use assayer_labpath::batch::RackLayout;

/// Everything the runner needs, resolved from the settings table plus
/// command-line overrides.
#[derive(Debug, Clone)]
pub struct Input {
    pub settings: Settings,
    pub paths: PathsConfig,
    pub threads: Option<usize>,
}

impl Input {
    /// Load the settings table named on the command line and validate it.
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let path = matches
            .get_one::<String>("settings")
            .expect("required settings");

        let settings = Settings::load(path)
            .with_context(|| format!("Failed to read settings from `{path}`"))?;

        let mut paths = settings.paths.clone().ok_or_else(|| {
            AssayerError::ConfigMissing("paths (required when running the CLI)".to_string())
        })?;

        if let Some(batch_file) = matches.get_one::<String>("batch") {
            paths.batch_file = batch_file.into();
        }

        let threads = matches.get_one::<u16>("threads").map(|&t| t as usize);

        let input = Input {
            settings,
            paths,
            threads,
        };
        input.validate()?;

        log::info!("Loaded settings from: {}", path);
        log::info!("Batch file: {}", input.paths.batch_file.display());
        log::info!("Raw data dir: {}", input.paths.raw_dir.display());

        Ok(input)
    }

    /// Reject unusable settings before any instrument data is touched.
    fn validate(&self) -> Result<()> {
        for path in [&self.paths.batch_file, &self.paths.expected_results] {
            if !Path::new(path).exists() {
                return Err(AssayerError::InputMissing(path.clone()).into());
            }
        }
        if !self.paths.raw_dir.is_dir() {
            return Err(AssayerError::InputMissing(self.paths.raw_dir.clone()).into());
        }

        // an unknown rack layout should fail here, not after acquisition
        if let Some(layout) = &self.paths.rack_layout {
            layout.parse::<RackLayout>()?;
        }

        let method = &self.settings.workflows.decision.method;
        if !matches!(
            method.as_str(),
            "expected_mass" | "expected_mass_metals" | "expected_lcms"
        ) {
            return Err(AssayerError::ConfigMissing(format!(
                "workflows.decision.method: unknown decision maker `{method}`"
            ))
            .into());
        }

        Ok(())
    }
}
