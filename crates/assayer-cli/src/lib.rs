pub mod input;
pub mod output;

use anyhow::Result;
use log::info;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::time::Instant;

use assayer_common::catalogue::ExpectedResults;
use assayer_common::error::AssayerError;
use assayer_common::logging::Progress;
use assayer_common::spectrum::IonMode;
use assayer_core::decision::{
    expected_lcms, expected_mass, expected_mass_metals, same_as_reference,
};
use assayer_labpath::{
    batch::{RackLayout, Sample, SampleBatch},
    expected::load_catalogues,
    nmr::load_nmr_spectrum,
    queue_csv::{build_queue, write_queue},
    raw_export::JsonRawExport,
    summary::{write_summary, SummaryEntry},
};
use input::Input;

pub struct Runner {
    batch: SampleBatch,
    catalogues: HashMap<String, ExpectedResults>,
    mode: IonMode,
    parameters: Input,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Input) -> Result<Self> {
        let start = Instant::now();

        let start_io = Instant::now();
        let batch = SampleBatch::load(&parameters.paths.batch_file)?;
        let catalogues = load_catalogues(&parameters.paths.expected_results)?;
        let run_time = (Instant::now() - start_io).as_millis();

        info!(
            "Loaded {} samples and {} expected-result catalogues - took {}ms",
            batch.len(),
            catalogues.len(),
            run_time
        );

        let mode: IonMode = parameters.settings.workflows.decision.ion_mode.parse()?;

        Ok(Self {
            batch,
            catalogues,
            mode,
            parameters,
            start,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        log::debug!("{}", self.parameters.settings.workflows.decision);

        self.write_queue_file()?;

        let total_count = self.batch.len();
        let progress = Progress::new(total_count, "[assayer] Deciding experiments");

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.parameters.threads.unwrap_or_default())
            .build()?;

        info!("Starting decisions for {} experiments", total_count);
        let decisions_start = Instant::now();

        let results: Vec<(String, Result<SummaryEntry, AssayerError>)> = pool.install(|| {
            self.batch
                .samples
                .par_iter()
                .map(|sample| {
                    let experiment_id = sample.label();
                    let result = self.process_sample(sample);
                    progress.inc();
                    (experiment_id, result)
                })
                .collect()
        });
        progress.finish();

        let elapsed = decisions_start.elapsed();
        info!(
            "Decided {} experiments in {:?} ({:.2}/sec)",
            total_count,
            elapsed,
            total_count as f64 / elapsed.as_secs_f64()
        );

        let summary = output::collect_summary(results);
        let passed = summary.values().filter(|e| e.ms_pass).count();
        info!(
            "{} of {} evaluated experiments passed; writing summary to {}",
            passed,
            summary.len(),
            self.parameters.paths.summary_file.display()
        );
        write_summary(&self.parameters.paths.summary_file, &summary)?;

        let run_time = (Instant::now() - self.start).as_secs();
        info!("finished in {}s", run_time);
        Ok(())
    }

    /// Serialise the batch into the autosampler queue, when configured.
    fn write_queue_file(&self) -> Result<()> {
        let Some(queue_file) = &self.parameters.paths.queue_file else {
            return Ok(());
        };
        let layout = match &self.parameters.paths.rack_layout {
            Some(name) => name.parse::<RackLayout>()?,
            None => RackLayout::Kuka,
        };
        let records = build_queue(
            &self.batch,
            &self.parameters.settings.defaults.ms,
            layout,
            self.parameters.paths.insert_blanks,
        );
        write_queue(queue_file, &records)?;
        info!(
            "Wrote {} queue records to {}",
            records.len(),
            queue_file.display()
        );
        Ok(())
    }

    /// Run the configured decision maker for one sample.
    pub fn process_sample(&self, sample: &Sample) -> Result<SummaryEntry, AssayerError> {
        let experiment_id = sample.label();

        let raw_path = self
            .parameters
            .paths
            .raw_dir
            .join(format!("{experiment_id}.json"));
        let raw = JsonRawExport::open(&raw_path)?;

        let catalogue = self.catalogues.get(&experiment_id).ok_or_else(|| {
            AssayerError::MalformedCatalogue(format!(
                "no expected results for experiment `{experiment_id}`"
            ))
        })?;

        let ms = &self.parameters.settings.defaults.ms;
        let criteria = &self.parameters.settings.workflows.decision;

        let (ms_pass, mz_peaks) = match criteria.method.as_str() {
            "expected_mass" => expected_mass(&raw, catalogue, self.mode, ms)?,
            "expected_mass_metals" => {
                expected_mass_metals(&raw, catalogue, self.mode, ms, criteria)?
            }
            "expected_lcms" => {
                let outcome = expected_lcms(
                    &raw,
                    catalogue,
                    self.mode,
                    ms.analog_peak_threshold,
                    ms,
                )?;
                let hits = outcome.per_peak_hits.into_iter().flatten().collect();
                (outcome.decision, hits)
            }
            other => {
                return Err(AssayerError::ConfigMissing(format!(
                    "workflows.decision.method: unknown decision maker `{other}`"
                )))
            }
        };

        log::debug!(
            "experiment `{}`: MS decision {} with {} hits",
            experiment_id,
            ms_pass,
            mz_peaks.len()
        );

        self.check_nmr_replication(sample, &experiment_id)?;

        Ok(SummaryEntry { ms_pass, mz_peaks })
    }

    /// Compare the sample's NMR spectrum against its reference when both
    /// exports are present. The verdict is logged and the comparison
    /// archived next to the spectra.
    fn check_nmr_replication(
        &self,
        sample: &Sample,
        experiment_id: &str,
    ) -> Result<(), AssayerError> {
        let Some(nmr_dir) = &self.parameters.paths.nmr_dir else {
            return Ok(());
        };
        if sample.nmr_experiments.is_empty() {
            return Ok(());
        }
        let test_path = nmr_dir.join(format!("{experiment_id}.json"));
        let reference_path = nmr_dir.join(format!("{experiment_id}_reference.json"));
        if !test_path.exists() || !reference_path.exists() {
            log::debug!(
                "experiment `{}`: no NMR pair to compare, skipping",
                experiment_id
            );
            return Ok(());
        }

        let test = load_nmr_spectrum(&test_path)?;
        let reference = load_nmr_spectrum(&reference_path)?;
        let archive = nmr_dir.join(format!("{experiment_id}_comparison.json"));
        let (same, distance) = same_as_reference(
            &test,
            &[reference],
            &self.parameters.settings.workflows.nmr,
            Some(&archive),
        )?;
        info!(
            "experiment `{}`: NMR replication {} (DTW distance {:.4})",
            experiment_id,
            if same { "passed" } else { "failed" },
            distance
        );
        Ok(())
    }
}
