//! Write small run databases with the same tables as the sampler, to test the
//! readers without running the sampler.
use anyhow::Context;
use rusqlite::{params, Connection};
use std::path::Path;

/// A generation to write with its accepted particles `(weight, parameters)`.
#[derive(Debug, Clone)]
pub struct Generation {
    pub t: i64,
    pub samples: u64,
    pub epsilon: f64,
    pub particles: Vec<(f64, Vec<(String, f64)>)>,
}

impl Generation {
    pub fn new(t: i64, samples: u64, epsilon: f64) -> Self {
        Generation { t, samples, epsilon, particles: Vec::new() }
    }

    pub fn with_particle(mut self, weight: f64, parameters: &[(&str, f64)]) -> Self {
        self.particles.push((
            weight,
            parameters.iter().map(|(name, value)| (name.to_string(), *value)).collect(),
        ));
        self
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS abc_smc (
    id INTEGER PRIMARY KEY, start_time DATETIME, end_time DATETIME,
    json_parameters VARCHAR, distance_function VARCHAR);
CREATE TABLE IF NOT EXISTS populations (
    id INTEGER PRIMARY KEY, abc_smc_id INTEGER, t INTEGER,
    population_end_time DATETIME, nr_samples INTEGER, epsilon FLOAT);
CREATE TABLE IF NOT EXISTS models (
    id INTEGER PRIMARY KEY, population_id INTEGER, m INTEGER,
    name VARCHAR, p_model FLOAT);
CREATE TABLE IF NOT EXISTS particles (
    id INTEGER PRIMARY KEY, model_id INTEGER, w FLOAT);
CREATE TABLE IF NOT EXISTS parameters (
    id INTEGER PRIMARY KEY, particle_id INTEGER, name VARCHAR, value FLOAT);
";

pub fn write_history(path: &Path, generations: &[Generation]) -> anyhow::Result<()> {
    //! Append a new run with `generations` of a single model `m = 0` to the
    //! database at `path`, creating it when missing.
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(path)
        .with_context(|| format!("Cannot create database {:#?}", path))?;
    conn.execute_batch(SCHEMA)?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO abc_smc (start_time, distance_function) VALUES (datetime('now'), 'fixture')",
        [],
    )?;
    let run_id = tx.last_insert_rowid();
    for generation in generations {
        tx.execute(
            "INSERT INTO populations (abc_smc_id, t, population_end_time, nr_samples, epsilon) \
             VALUES (?1, ?2, datetime('now'), ?3, ?4)",
            params![run_id, generation.t, generation.samples as i64, generation.epsilon],
        )?;
        let population_id = tx.last_insert_rowid();
        if generation.particles.is_empty() {
            continue;
        }
        tx.execute(
            "INSERT INTO models (population_id, m, name, p_model) VALUES (?1, 0, 'model', 1.0)",
            [population_id],
        )?;
        let model_id = tx.last_insert_rowid();
        for (weight, parameters) in generation.particles.iter() {
            tx.execute(
                "INSERT INTO particles (model_id, w) VALUES (?1, ?2)",
                params![model_id, weight],
            )?;
            let particle_id = tx.last_insert_rowid();
            for (name, value) in parameters {
                tx.execute(
                    "INSERT INTO parameters (particle_id, name, value) VALUES (?1, ?2, ?3)",
                    params![particle_id, name, value],
                )?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}
