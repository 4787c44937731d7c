use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use cl_core::Matrix;

use crate::trajectory::Trajectory;

/// A single matrix-valued signal of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    State,
    Input,
    Output,
    Derivative,
    Reference,
}

impl Signal {
    /// Column prefix used in CSV headers.
    pub fn key(self) -> &'static str {
        match self {
            Signal::State => "x",
            Signal::Input => "u",
            Signal::Output => "y",
            Signal::Derivative => "dx",
            Signal::Reference => "r",
        }
    }

    fn matrix(self, traj: &Trajectory) -> Option<&Matrix> {
        match self {
            Signal::State => Some(traj.x()),
            Signal::Input => Some(traj.u()),
            Signal::Output => Some(traj.y()),
            Signal::Derivative => Some(traj.dx()),
            Signal::Reference => traj.r(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" | "state" => Ok(Signal::State),
            "u" | "input" => Ok(Signal::Input),
            "y" | "output" => Ok(Signal::Output),
            "dx" | "derivative" => Ok(Signal::Derivative),
            "r" | "reference" => Ok(Signal::Reference),
            other => Err(format!("unknown signal '{other}' (expected x, u, y, dx or r)")),
        }
    }
}

/// Write every signal of the trajectory as CSV.
///
/// Columns: t, x0.., u0.., dx0.., y0.., then r0.., J, dJ when present.
pub fn write_csv<W: Write>(writer: &mut W, traj: &Trajectory) -> io::Result<()> {
    let mut signals = vec![
        Signal::State,
        Signal::Input,
        Signal::Derivative,
        Signal::Output,
    ];
    if traj.r().is_some() {
        signals.push(Signal::Reference);
    }

    let mut header = vec!["t".to_string()];
    for signal in &signals {
        if let Some(m) = signal.matrix(traj) {
            header.extend((0..m.ncols()).map(|j| format!("{}{}", signal.key(), j)));
        }
    }
    if traj.j().is_some() {
        header.push("J".to_string());
    }
    if traj.dj().is_some() {
        header.push("dJ".to_string());
    }
    writeln!(writer, "{}", header.join(","))?;

    for (i, t) in traj.t().iter().enumerate() {
        let mut row = vec![t.to_string()];
        for signal in &signals {
            if let Some(m) = signal.matrix(traj) {
                row.extend(m.row(i).iter().map(|v| v.to_string()));
            }
        }
        if let Some(j) = traj.j() {
            row.push(j[i].to_string());
        }
        if let Some(dj) = traj.dj() {
            row.push(dj[i].to_string());
        }
        writeln!(writer, "{}", row.join(","))?;
    }

    Ok(())
}

/// Write one signal against time. Fails if the signal is absent.
pub fn write_signal_csv<W: Write>(
    writer: &mut W,
    traj: &Trajectory,
    signal: Signal,
) -> io::Result<()> {
    let m = signal.matrix(traj).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("trajectory has no '{signal}' signal"),
        )
    })?;

    let mut header = vec!["t".to_string()];
    header.extend((0..m.ncols()).map(|j| format!("{}{}", signal.key(), j)));
    writeln!(writer, "{}", header.join(","))?;

    for (i, t) in traj.t().iter().enumerate() {
        let mut row = vec![t.to_string()];
        row.extend(m.row(i).iter().map(|v| v.to_string()));
        writeln!(writer, "{}", row.join(","))?;
    }
    Ok(())
}

/// Write the full trajectory CSV to a file at the given path.
pub fn write_csv_file(path: impl AsRef<Path>, traj: &Trajectory) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_csv(&mut file, traj)?;
    file.flush()
}
