//! Read-only view of one ABC-SMC run database.
//!
//! The database is written by the sampler, one row per generation in
//! `populations`, one row per model and generation in `models`, and the
//! accepted particles with their weights and parameters in `particles` and
//! `parameters`. The calibration generation used to initialise the distances
//! has index `t = -1`.
use anyhow::{ensure, Context};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::stats::{effective_sample_size, normalize};

/// A generation of the ABC-SMC run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationSummary {
    /// Index of the generation, -1 for the calibration generation
    pub t: i64,
    pub population_end_time: Option<String>,
    /// Number of simulations performed to obtain this generation
    pub samples: u64,
    /// Acceptance threshold
    pub epsilon: Option<f64>,
    /// Number of accepted particles
    pub particles: u64,
}

/// The weighted posterior sample of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    /// Parameter names in lexicographic order, the columns of `values`
    pub names: Vec<String>,
    /// One row per particle
    pub values: Vec<Vec<f64>>,
    /// Weights of the particles, summing to one
    pub weights: Vec<f64>,
}

impl Distribution {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        //! All the values of the parameter `name`, one per particle.
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.values.iter().map(|row| row[idx]).collect())
    }

    pub fn effective_sample_size(&self) -> f64 {
        effective_sample_size(&self.weights)
    }
}

pub struct History {
    conn: Connection,
    id: i64,
    path: PathBuf,
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl History {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        //! Open an existing database and bind to its latest run. Never creates
        //! the database.
        let conn = Self::connect(path)?;
        let id: Option<i64> = conn
            .query_row("SELECT MAX(id) FROM abc_smc", [], |row| row.get(0))
            .with_context(|| format!("Cannot find the runs in {:#?}", path))?;
        let id = id
            .with_context(|| format!("Found no ABC-SMC run in {:#?}", path))?;
        Ok(History { conn, id, path: path.to_owned() })
    }

    pub fn open_with_id(path: &Path, id: i64) -> anyhow::Result<Self> {
        //! Open an existing database and bind to the run with `id`.
        let conn = Self::connect(path)?;
        let found: Option<i64> = conn
            .query_row("SELECT id FROM abc_smc WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("Cannot find the runs in {:#?}", path))?;
        ensure!(found.is_some(), "Found no run with id {} in {:#?}", id, path);
        Ok(History { conn, id, path: path.to_owned() })
    }

    fn connect(path: &Path) -> anyhow::Result<Connection> {
        ensure!(path.is_file(), "Cannot find database {:#?}", path);
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Cannot open database {:#?}", path))
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all_populations(&self) -> anyhow::Result<Vec<PopulationSummary>> {
        //! All the generations of the run sorted by `t`, including the
        //! calibration generation.
        let mut stmt = self.conn.prepare(
            "SELECT p.t, p.population_end_time, p.nr_samples, p.epsilon, \
                (SELECT COUNT(pa.id) FROM models m \
                    JOIN particles pa ON pa.model_id = m.id \
                    WHERE m.population_id = p.id) \
             FROM populations p WHERE p.abc_smc_id = ?1 ORDER BY p.t",
        )?;
        let rows = stmt.query_map([self.id], |row| {
            Ok(PopulationSummary {
                t: row.get(0)?,
                population_end_time: row.get(1)?,
                samples: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
                epsilon: row.get(3)?,
                particles: row.get::<_, i64>(4)? as u64,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().with_context(|| {
            format!("Cannot read the populations of {:#?}", self.path)
        })
    }

    pub fn total_samples(&self) -> anyhow::Result<u64> {
        //! Number of simulations performed over the whole run.
        Ok(self.all_populations()?.iter().map(|p| p.samples).sum())
    }

    pub fn n_populations(&self) -> anyhow::Result<usize> {
        Ok(self.all_populations()?.len())
    }

    pub fn max_t(&self) -> anyhow::Result<i64> {
        //! Index of the last generation.
        let max_t: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(t) FROM populations WHERE abc_smc_id = ?1",
                [self.id],
                |row| row.get(0),
            )
            .with_context(|| {
                format!("Cannot read the generations of {:#?}", self.path)
            })?;
        max_t.with_context(|| format!("Found no generation in {:#?}", self.path))
    }

    pub fn get_distribution(&self, m: i64, t: i64) -> anyhow::Result<Distribution> {
        //! The accepted parameters of model `m` in generation `t` with their
        //! weights normalised to one.
        let mut stmt = self.conn.prepare(
            "SELECT pa.id, pa.w, pr.name, pr.value FROM particles pa \
                JOIN models m ON pa.model_id = m.id \
                JOIN populations p ON m.population_id = p.id \
                JOIN parameters pr ON pr.particle_id = pa.id \
             WHERE p.abc_smc_id = ?1 AND p.t = ?2 AND m.m = ?3 \
             ORDER BY pa.id",
        )?;
        let rows = stmt
            .query_map(params![self.id, t, m], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| {
                format!("Cannot read generation {} of {:#?}", t, self.path)
            })?;
        ensure!(
            !rows.is_empty(),
            "Found no particles for model {} in generation {} of {:#?}",
            m,
            t,
            self.path
        );

        let names: Vec<String> = rows
            .iter()
            .map(|(_, _, name, _)| name.clone())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        let mut particles: BTreeMap<i64, (f64, Vec<f64>)> = BTreeMap::new();
        for (id, w, name, value) in rows {
            let entry = particles
                .entry(id)
                .or_insert_with(|| (w, vec![f64::NAN; names.len()]));
            if let Ok(idx) = names.binary_search(&name) {
                entry.1[idx] = value;
            }
        }

        let (weights, values): (Vec<f64>, Vec<Vec<f64>>) =
            particles.into_values().unzip();
        let weights = normalize(&weights).with_context(|| {
            format!("Cannot normalize the weights of generation {}", t)
        })?;
        Ok(Distribution { names, values, weights })
    }
}
