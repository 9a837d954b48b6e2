use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Loss values tracked by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LossMetric {
    /// Total generator loss.
    G,
    /// Total discriminator loss.
    D,
    /// Mean critic score on real samples.
    Real,
    /// Mean critic score on generated samples.
    Fake,
    /// Gradient penalty.
    GP,
    /// Classifier component of the generator loss.
    GC,
}

impl LossMetric {
    pub const ALL: [LossMetric; 6] = [
        LossMetric::G,
        LossMetric::D,
        LossMetric::Real,
        LossMetric::Fake,
        LossMetric::GP,
        LossMetric::GC,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LossMetric::G => "G",
            LossMetric::D => "D",
            LossMetric::Real => "Real",
            LossMetric::Fake => "Fake",
            LossMetric::GP => "GP",
            LossMetric::GC => "GC",
        }
    }
}

/// Scalar losses of one discriminator step.
#[derive(Clone, Copy, Debug)]
pub struct DiscriminatorLosses {
    pub loss: f64,
    pub real: f64,
    pub fake: f64,
    pub gradient_penalty: f64,
}

/// Scalar losses of one generator step.
#[derive(Clone, Copy, Debug)]
pub struct GeneratorLosses {
    pub loss: f64,
    pub classifier_loss: f64,
}

/// Per-epoch, append-only record of step losses.
#[derive(Clone, Debug, Default)]
pub struct LossLedger {
    values: BTreeMap<LossMetric, Vec<f64>>,
}

impl LossLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metric: LossMetric, value: f64) {
        self.values.entry(metric).or_default().push(value);
    }

    pub fn record_discriminator(&mut self, losses: &DiscriminatorLosses) {
        self.record(LossMetric::D, losses.loss);
        self.record(LossMetric::Real, losses.real);
        self.record(LossMetric::Fake, losses.fake);
        self.record(LossMetric::GP, losses.gradient_penalty);
    }

    pub fn record_generator(&mut self, losses: &GeneratorLosses) {
        self.record(LossMetric::G, losses.loss);
        self.record(LossMetric::GC, losses.classifier_loss);
    }

    pub fn values(&self, metric: LossMetric) -> &[f64] {
        self.values.get(&metric).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mean of the recorded values, `None` when nothing was recorded.
    pub fn mean(&self, metric: LossMetric) -> Option<f64> {
        let values = self.values(metric);
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    pub fn summary(&self, epoch: usize) -> EpochSummary {
        EpochSummary {
            epoch,
            discriminator_loss: self.mean(LossMetric::D),
            generator_loss: self.mean(LossMetric::G),
            real: self.mean(LossMetric::Real),
            fake: self.mean(LossMetric::Fake),
            gradient_penalty: self.mean(LossMetric::GP),
            classifier_loss: self.mean(LossMetric::GC),
        }
    }

    /// Drop every recorded value.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }
}

/// Epoch means of all ledger metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub discriminator_loss: Option<f64>,
    pub generator_loss: Option<f64>,
    pub real: Option<f64>,
    pub fake: Option<f64>,
    pub gradient_penalty: Option<f64>,
    pub classifier_loss: Option<f64>,
}

impl EpochSummary {
    /// The `{D, G}` pair written to the metric sink.
    pub fn adversarial_scalars(&self) -> Vec<(&'static str, f64)> {
        let mut scalars = Vec::with_capacity(2);
        if let Some(d) = self.discriminator_loss {
            scalars.push((LossMetric::D.name(), d));
        }
        if let Some(g) = self.generator_loss {
            scalars.push((LossMetric::G.name(), g));
        }
        scalars
    }
}

impl fmt::Display for EpochSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn value(v: Option<f64>) -> String {
            v.map(|v| format!("{v:.5}")).unwrap_or_else(|| "n/a".to_string())
        }
        write!(
            f,
            "[epoch {}] [D loss: {}] [G loss: {}] [R: {}] [F: {}] [GP: {}] [GC: {}]",
            self.epoch,
            value(self.discriminator_loss),
            value(self.generator_loss),
            value(self.real),
            value(self.fake),
            value(self.gradient_penalty),
            value(self.classifier_loss),
        )
    }
}

/// Write-only destination for grouped scalars, one write per epoch.
pub trait MetricSink {
    fn add_scalars(&mut self, group: &str, scalars: &[(&str, f64)], epoch: usize) -> Result<()>;
}

#[derive(Serialize)]
struct ScalarRecord<'a> {
    group: &'a str,
    epoch: usize,
    scalars: BTreeMap<&'a str, f64>,
}

/// Appends one JSON object per write to a file.
pub struct JsonlMetricSink {
    writer: BufWriter<File>,
}

impl JsonlMetricSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl MetricSink for JsonlMetricSink {
    fn add_scalars(&mut self, group: &str, scalars: &[(&str, f64)], epoch: usize) -> Result<()> {
        let record = ScalarRecord {
            group,
            epoch,
            scalars: scalars.iter().copied().collect(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_means_and_reset() {
        let mut ledger = LossLedger::new();
        ledger.record_discriminator(&DiscriminatorLosses {
            loss: 1.0,
            real: 2.0,
            fake: 3.0,
            gradient_penalty: 0.5,
        });
        ledger.record_discriminator(&DiscriminatorLosses {
            loss: 3.0,
            real: 2.0,
            fake: 3.0,
            gradient_penalty: 1.5,
        });

        assert_eq!(ledger.values(LossMetric::D), &[1.0, 3.0]);
        assert_eq!(ledger.mean(LossMetric::D), Some(2.0));
        assert_eq!(ledger.mean(LossMetric::GP), Some(1.0));
        assert_eq!(ledger.mean(LossMetric::G), None);

        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.mean(LossMetric::D), None);
    }

    #[test]
    fn summary_formats_missing_values() {
        let mut ledger = LossLedger::new();
        ledger.record_generator(&GeneratorLosses {
            loss: -0.25,
            classifier_loss: 1.0,
        });
        let summary = ledger.summary(4);

        assert_eq!(summary.adversarial_scalars(), vec![("G", -0.25)]);
        let line = summary.to_string();
        assert!(line.contains("[D loss: n/a]"));
        assert!(line.contains("[G loss: -0.25000]"));
    }

    #[test]
    fn jsonl_sink_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");
        let mut sink = JsonlMetricSink::open(&path).unwrap();
        sink.add_scalars("GAN", &[("D", -1.0), ("G", 0.5)], 0).unwrap();
        sink.add_scalars("GAN", &[("D", -2.0)], 1).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["group"], "GAN");
        assert_eq!(lines[0]["scalars"]["G"], 0.5);
        assert_eq!(lines[1]["epoch"], 1);
    }
}
