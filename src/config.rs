//! Configuration types for the extraction and normalization pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built
//! via its [`PipelineConfigBuilder`]. Every lookup table the components
//! depend on — flavor rules, per-section target labels, the synonym map,
//! date-phrase patterns, the month-name vocabulary — lives here as an
//! immutable, explicitly constructed structure handed to each component at
//! construction time. Nothing reads ambient global state, which is what
//! makes deterministic testing with substituted tables possible.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new table.
//! The builder lets callers override only the tables they care about and
//! rely on well-documented defaults for the rest. The defaults mirror the
//! Indonesian monthly bank-statement corpus the pipeline was built for.

use crate::error::EtlError;
use crate::record::Section;
use std::fmt;
use std::path::PathBuf;

/// Table-detection strategy handed to the table-detection collaborator.
///
/// Which strategy works depends on how the issuing institution typesets its
/// tables: ruled grids parse best with `Lattice`, whitespace-aligned
/// layouts with `Stream`, and mixed documents with `Hybrid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Ruled-grid detection (default).
    #[default]
    Lattice,
    /// Whitespace-alignment detection.
    Stream,
    /// Ruled-grid detection with stream fallback per region.
    Hybrid,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Lattice => f.write_str("lattice"),
            Flavor::Stream => f.write_str("stream"),
            Flavor::Hybrid => f.write_str("hybrid"),
        }
    }
}

/// One institution-token → strategy rule. Rules are checked in order;
/// the first token found in the (lowercased) path wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavorRule {
    pub token: String,
    pub flavor: Flavor,
}

/// One locale-specific date phrase: a regex with exactly three capture
/// groups (day, month name, year), tried against lowercased page text.
#[derive(Debug, Clone)]
pub struct DatePattern {
    pub pattern: String,
}

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use finstar_etl::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .input_dir("data/downloads")
///     .work_dir("data")
///     .build()
///     .unwrap();
/// assert_eq!(config.anchor_segment, "downloads");
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory walked for input documents. Default: `data/downloads`.
    pub input_dir: PathBuf,

    /// Directory receiving the stage artifacts (`extracted.json` and the
    /// five star-schema CSVs). Default: `data`.
    pub work_dir: PathBuf,

    /// Path segment whose successor names the issuing institution.
    /// Default: `downloads`. A path with no such segment yields a record
    /// with a `None` institution (rejected later by the validator).
    pub anchor_segment: String,

    /// Institution-token → detection-strategy rules, in priority order.
    pub flavor_rules: Vec<FlavorRule>,

    /// Target labels per statement section, in configuration order.
    /// Labels are stored lowercased/trimmed; the locator matches them
    /// case-insensitively against grid cells.
    pub target_fields: Vec<(Section, Vec<String>)>,

    /// Alias → canonical column-name pairs applied after structural
    /// normalization. Insertion order is the left-to-right precedence used
    /// when merged columns collide.
    pub synonyms: Vec<(String, String)>,

    /// Date phrases tried in priority order against first-page text.
    pub date_patterns: Vec<DatePattern>,

    /// Month-name vocabulary, lowercased name → month number (1–12).
    pub month_names: Vec<(String, u32)>,

    /// Columns the numeric canonicalizer must never touch (identity and
    /// date columns).
    pub numeric_exclusions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/downloads"),
            work_dir: PathBuf::from("data"),
            anchor_segment: "downloads".to_string(),
            flavor_rules: default_flavor_rules(),
            target_fields: default_target_fields(),
            synonyms: default_synonyms(),
            date_patterns: default_date_patterns(),
            month_names: default_month_names(),
            numeric_exclusions: vec!["report_id".into(), "company".into(), "report_date".into()],
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Target labels configured for one section.
    pub fn section_fields(&self, section: Section) -> &[String] {
        self.target_fields
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, labels)| labels.as_slice())
            .unwrap_or(&[])
    }

    /// Path of the JSON interchange artifact.
    pub fn extracted_path(&self) -> PathBuf {
        self.work_dir.join("extracted.json")
    }

    /// Path of the fact-table CSV artifact.
    pub fn fact_path(&self) -> PathBuf {
        self.work_dir.join("fact_report.csv")
    }

    /// Path of one dimension-table CSV artifact.
    pub fn dim_path(&self, section: Section) -> PathBuf {
        self.work_dir.join(format!("{}.csv", section.dim_table()))
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn anchor_segment(mut self, segment: impl Into<String>) -> Self {
        self.config.anchor_segment = segment.into();
        self
    }

    pub fn flavor_rules(mut self, rules: Vec<FlavorRule>) -> Self {
        self.config.flavor_rules = rules;
        self
    }

    /// Replace the label set of one section. Labels are lowercased and
    /// trimmed on the way in.
    pub fn section_fields(mut self, section: Section, labels: Vec<String>) -> Self {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|l| l.trim().to_lowercase())
            .collect();
        match self
            .config
            .target_fields
            .iter_mut()
            .find(|(s, _)| *s == section)
        {
            Some((_, slot)) => *slot = labels,
            None => self.config.target_fields.push((section, labels)),
        }
        self
    }

    pub fn synonyms(mut self, synonyms: Vec<(String, String)>) -> Self {
        self.config.synonyms = synonyms;
        self
    }

    pub fn date_patterns(mut self, patterns: Vec<DatePattern>) -> Self {
        self.config.date_patterns = patterns;
        self
    }

    pub fn month_names(mut self, names: Vec<(String, u32)>) -> Self {
        self.config.month_names = names;
        self
    }

    pub fn numeric_exclusions(mut self, columns: Vec<String>) -> Self {
        self.config.numeric_exclusions = columns;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, EtlError> {
        let c = &self.config;
        if c.anchor_segment.is_empty() {
            return Err(EtlError::InvalidConfig(
                "Anchor segment must not be empty".into(),
            ));
        }
        for section in Section::ALL {
            if c.section_fields(section).is_empty() {
                return Err(EtlError::InvalidConfig(format!(
                    "Section '{section}' has no target fields configured"
                )));
            }
        }
        for (name, number) in &c.month_names {
            if *number < 1 || *number > 12 {
                return Err(EtlError::InvalidConfig(format!(
                    "Month '{name}' maps to {number}, outside 1–12"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Default tables ───────────────────────────────────────────────────────

fn default_flavor_rules() -> Vec<FlavorRule> {
    // Priority order matters: earlier tokens win when a path contains more
    // than one.
    [
        ("bca", Flavor::Stream),
        ("btn", Flavor::Hybrid),
        ("bni", Flavor::Hybrid),
    ]
    .into_iter()
    .map(|(token, flavor)| FlavorRule {
        token: token.to_string(),
        flavor,
    })
    .collect()
}

fn default_target_fields() -> Vec<(Section, Vec<String>)> {
    let to_vec = |labels: &[&str]| labels.iter().map(|l| l.to_string()).collect();
    vec![
        (
            Section::Assets,
            to_vec(&[
                "kas",
                "penempatan pada bank indonesia",
                "kredit yang diberikan",
                "kredit dan pembiayaan yang diberikan",
                "surat berharga yang dimiliki",
                "total aset",
            ]),
        ),
        (
            Section::Liabilities,
            to_vec(&["giro", "tabungan", "deposito", "total liabilitas"]),
        ),
        (Section::Equity, to_vec(&["total ekuitas"])),
        (
            Section::Income,
            to_vec(&[
                "pendapatan bunga",
                "beban bunga",
                "pendapatan (beban) bunga bersih",
                "laba (rugi) bersih tahun berjalan",
                "laba (rugi) bersih periode berjalan",
            ]),
        ),
    ]
}

fn default_synonyms() -> Vec<(String, String)> {
    // Different institutions word the same line item differently; both the
    // per-period and per-year net-income labels collapse to one canonical
    // column, as do the two loan-portfolio labels.
    [
        ("laba_rugi_bersih_tahun_berjalan", "laba_rugi_bersih"),
        ("laba_rugi_bersih_periode_berjalan", "laba_rugi_bersih"),
        ("kredit_dan_pembiayaan_yang_diberikan", "kredit_yang_diberikan"),
        ("kredit_yang_diberikan", "kredit_yang_diberikan"),
    ]
    .into_iter()
    .map(|(a, c)| (a.to_string(), c.to_string()))
    .collect()
}

fn default_date_patterns() -> Vec<DatePattern> {
    [
        r"pada tanggal (\d{1,2}) (\w+) (\d{4})",
        r"per (\d{1,2}) (\w+) (\d{4})",
        r"tanggal laporan\s*:\s*(\d{1,2}) (\w+) (\d{4})",
    ]
    .into_iter()
    .map(|p| DatePattern {
        pattern: p.to_string(),
    })
    .collect()
}

fn default_month_names() -> Vec<(String, u32)> {
    [
        ("januari", 1),
        ("februari", 2),
        ("maret", 3),
        ("april", 4),
        ("mei", 5),
        ("juni", 6),
        ("juli", 7),
        ("agustus", 8),
        ("september", 9),
        ("oktober", 10),
        ("november", 11),
        ("desember", 12),
    ]
    .into_iter()
    .map(|(n, m)| (n.to_string(), m))
    .collect()
}
