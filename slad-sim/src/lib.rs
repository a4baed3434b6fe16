//! Gillespie simulator of the small reaction networks behind the slad test
//! problems, e.g. the Lotka-Volterra predator-prey Markov jump process.
pub mod event;
pub mod process;
pub mod rate;

use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{ensure, Context};
use serde::Serialize;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

/// Number of individuals (molecules, animals, cells) present in the system.
pub type NbIndividuals = u64;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Seed(u64);

impl Seed {
    /// Number of independent runs that can be derived from one seed.
    pub const MAX_STREAMS: usize = 1000;

    pub fn new(seed: u64) -> Self {
        Seed(seed)
    }

    pub fn stream(&self, idx: usize) -> anyhow::Result<u64> {
        //! Seed of the `idx`-th independent run derived from this seed.
        //! Streams of different seeds do not overlap as long as `idx` is
        //! smaller than [`Seed::MAX_STREAMS`].
        ensure!(
            idx < Self::MAX_STREAMS,
            "Found run {} but a seed has only {} streams",
            idx,
            Self::MAX_STREAMS
        );
        Ok(self.0.wrapping_mul(Self::MAX_STREAMS as u64).wrapping_add(idx as u64))
    }

    pub fn save(&self, path2file: &Path) -> anyhow::Result<()> {
        write2file(&[self.0], path2file)
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed(26u64)
    }
}

pub fn write2file<T: std::fmt::Display>(data: &[T], path: &Path) -> anyhow::Result<()> {
    //! Append the values to the file with a precision of 4 decimals.
    //! Write NAN if the slice to write to file is empty.
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create dir {:#?}", parent))?;
    }
    let f = fs::OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Cannot open {:#?}", path))?;
    let mut buffer = BufWriter::new(f);
    if !data.is_empty() {
        for ele in data.iter() {
            write!(buffer, "{:.4},", ele)?;
        }
    } else {
        write!(buffer, "{},", f64::NAN)?;
    }
    buffer.flush().with_context(|| format!("Cannot write to {:#?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::read_to_string;

    #[test]
    fn write2file_appends_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("values.csv");
        write2file(&[1.5f64, 2.], &path).unwrap();
        write2file(&[3f64], &path).unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "1.5000,2.0000,3.0000,");
    }

    #[test]
    fn write2file_empty_is_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write2file::<f64>(&[], &path).unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "NaN,");
    }

    #[test]
    fn save_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.txt");
        Seed::new(26).save(&path).unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "26,");
    }

    #[quickcheck]
    fn seed_streams_differ(seed1: u32, seed2: u32, idx1: u16, idx2: u16) -> bool {
        let idx1 = idx1 as usize % Seed::MAX_STREAMS;
        let idx2 = idx2 as usize % Seed::MAX_STREAMS;
        let (s1, s2) = (Seed::new(seed1 as u64), Seed::new(seed2 as u64));
        (seed1 == seed2 && idx1 == idx2)
            || (s1.stream(idx1).unwrap() != s2.stream(idx2).unwrap())
    }

    #[test]
    fn seed_streams_are_bounded() {
        let seed = Seed::default();
        assert!(seed.stream(Seed::MAX_STREAMS - 1).is_ok());
        assert!(seed.stream(Seed::MAX_STREAMS).is_err());
    }
}
