//! Named-array archive persistence for trajectories.
//!
//! Two on-disk layouts are understood:
//!
//! - **Keyed** (written by [`Trajectory::save`]): a JSON object with the
//!   signals under the keys `x, u, t, dx, y, r, J, dJ`. Absent optional
//!   signals are stored as `null`. The `format` and `version` tags are
//!   optional on read; an untagged document is read as version 1.
//! - Non-finite samples (a diverged run) are written as the strings
//!   `"NaN"`, `"inf"` and `"-inf"` and restored on load.
//! - **Legacy positional**: a JSON array holding the signals in the fixed
//!   order `[x, u, t, dx, y, r, J, dJ]`. Trailing optional entries may be
//!   omitted or `null`.
//!
//! Loading tries the keyed layout first. Only a shape mismatch of the
//! document triggers the positional fallback; I/O failures and malformed
//! JSON are returned as they are.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use cl_core::{Matrix, Real};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use serde_json::error::Category;

use crate::trajectory::Trajectory;
use crate::{ResultsError, ResultsResult};

/// Value of the `format` key in keyed archives.
pub const ARCHIVE_FORMAT: &str = "clsim-trajectory";

/// Current keyed archive version.
pub const ARCHIVE_VERSION: u32 = 1;

/// File name used when no explicit path is given.
pub const DEFAULT_ARCHIVE_NAME: &str = "trajectory_solution.json";

/// One stored sample. Finite values are plain JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample(Real);

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("NaN")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

struct SampleVisitor;

impl Visitor<'_> for SampleVisitor {
    type Value = Sample;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Sample, E> {
        Ok(Sample(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Sample, E> {
        Ok(Sample(v as Real))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Sample, E> {
        Ok(Sample(v as Real))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Sample, E> {
        match v {
            "NaN" | "nan" => Ok(Sample(Real::NAN)),
            "inf" | "Infinity" => Ok(Sample(Real::INFINITY)),
            "-inf" | "-Infinity" => Ok(Sample(Real::NEG_INFINITY)),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Sample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SampleVisitor)
    }
}

type Rows = Vec<Vec<Sample>>;

fn default_version() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyedArchive {
    #[serde(default)]
    format: Option<String>,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    saved_at: Option<String>,
    x: Rows,
    u: Rows,
    t: Vec<Sample>,
    dx: Rows,
    y: Rows,
    #[serde(default)]
    r: Option<Rows>,
    #[serde(default, rename = "J")]
    j: Option<Vec<Sample>>,
    #[serde(default, rename = "dJ")]
    dj: Option<Vec<Sample>>,
}

const LEGACY_ORDER: [&str; 8] = ["x", "u", "t", "dx", "y", "r", "J", "dJ"];

impl Trajectory {
    /// Write the keyed archive to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> ResultsResult<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_archive(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize the keyed archive to any writer.
    pub fn write_archive<W: Write>(&self, writer: W) -> ResultsResult<()> {
        let archive = KeyedArchive {
            format: Some(ARCHIVE_FORMAT.to_string()),
            version: ARCHIVE_VERSION,
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
            x: to_rows(self.x()),
            u: to_rows(self.u()),
            t: to_samples(self.t()),
            dx: to_rows(self.dx()),
            y: to_rows(self.y()),
            r: self.r().map(to_rows),
            j: self.j().map(to_samples),
            dj: self.dj().map(to_samples),
        };
        serde_json::to_writer(writer, &archive)?;
        Ok(())
    }

    /// Read an archive from `path`, accepting both layouts.
    pub fn load(path: impl AsRef<Path>) -> ResultsResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::read_archive(BufReader::new(file))
    }

    /// Parse an archive from any reader, accepting both layouts.
    pub fn read_archive<R: Read>(mut reader: R) -> ResultsResult<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        match serde_json::from_str::<KeyedArchive>(&content) {
            Ok(archive) => from_keyed(archive),
            Err(e) if e.classify() == Category::Data => {
                tracing::warn!(error = %e, "keyed archive layout not found, trying legacy positional layout");
                from_positional(&content)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn from_keyed(archive: KeyedArchive) -> ResultsResult<Trajectory> {
    if let Some(tag) = archive.format.as_deref().filter(|tag| *tag != ARCHIVE_FORMAT) {
        return Err(ResultsError::Format {
            message: format!("unexpected format tag '{tag}'"),
        });
    }
    if archive.version > ARCHIVE_VERSION {
        return Err(ResultsError::Format {
            message: format!("archive version {} is newer than supported", archive.version),
        });
    }

    Trajectory::new(
        from_rows("x", archive.x)?,
        from_rows("u", archive.u)?,
        from_samples(archive.t),
        from_rows("dx", archive.dx)?,
        from_rows("y", archive.y)?,
    )?
    .with_optional(
        archive.r.map(|r| from_rows("r", r)).transpose()?,
        archive.j.map(from_samples),
        archive.dj.map(from_samples),
    )
}

fn from_positional(content: &str) -> ResultsResult<Trajectory> {
    let entries: Vec<Value> = serde_json::from_str(content)?;
    if entries.len() < 5 || entries.len() > LEGACY_ORDER.len() {
        return Err(ResultsError::Format {
            message: format!(
                "legacy archive needs 5 to {} entries, found {}",
                LEGACY_ORDER.len(),
                entries.len()
            ),
        });
    }

    let mut slots: Vec<Option<Value>> = entries.into_iter().map(Some).collect();
    slots.resize(LEGACY_ORDER.len(), None);
    let mut take = |i: usize| slots[i].take().filter(|v| !v.is_null());

    let rows = |v: Option<Value>, name: &'static str| -> ResultsResult<Matrix> {
        let v = v.ok_or_else(|| ResultsError::Format {
            message: format!("legacy archive is missing '{name}'"),
        })?;
        from_rows(name, serde_json::from_value(v)?)
    };

    let x = rows(take(0), "x")?;
    let u = rows(take(1), "u")?;
    let t: Vec<Sample> = match take(2) {
        Some(v) => serde_json::from_value(v)?,
        None => {
            return Err(ResultsError::Format {
                message: "legacy archive is missing 't'".to_string(),
            });
        }
    };
    let dx = rows(take(3), "dx")?;
    let y = rows(take(4), "y")?;
    let r = take(5).map(|v| rows(Some(v), "r")).transpose()?;
    let j: Option<Vec<Sample>> = take(6).map(serde_json::from_value).transpose()?;
    let dj: Option<Vec<Sample>> = take(7).map(serde_json::from_value).transpose()?;

    Trajectory::new(x, u, from_samples(t), dx, y)?.with_optional(
        r,
        j.map(from_samples),
        dj.map(from_samples),
    )
}

fn to_rows(m: &Matrix) -> Rows {
    (0..m.nrows())
        .map(|i| m.row(i).iter().copied().map(Sample).collect())
        .collect()
}

fn to_samples(values: &[Real]) -> Vec<Sample> {
    values.iter().copied().map(Sample).collect()
}

fn from_samples(samples: Vec<Sample>) -> Vec<Real> {
    samples.into_iter().map(|s| s.0).collect()
}

fn from_rows(signal: &'static str, rows: Rows) -> ResultsResult<Matrix> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|row| row.len() != ncols) {
        return Err(ResultsError::Format {
            message: format!(
                "ragged rows in '{signal}': expected {ncols} columns, found {}",
                bad.len()
            ),
        });
    }
    Ok(Matrix::from_fn(rows.len(), ncols, |i, j| rows[i][j].0))
}
