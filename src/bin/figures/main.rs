use anyhow::Context;
use chrono::Utc;
use clap_app::{Cli, Figure, Figures};
use plotters::prelude::{BitMapBackend, IntoDrawingArea, SVGBackend};
use slad::analysis::{collect, Aggregated, Metric};
use slad::constants::{credible_levels, DISTANCE_NAMES};
use slad::problem::ProblemType;
use std::fs;
use std::path::{Path, PathBuf};

mod clap_app;
mod plot;

impl Figure {
    fn metric(&self) -> Metric {
        match self {
            Figure::Ess => Metric::Ess,
            Figure::Rmse => Metric::Rmse,
            Figure::Calibration => Metric::Coverage(credible_levels()),
        }
    }

    fn size(&self) -> (u32, u32) {
        match self {
            Figure::Ess => (1800, 750),
            Figure::Rmse => (2800, 2400),
            Figure::Calibration => (1500, 1000),
        }
    }
}

impl Figures {
    fn path2figure(&self, figure: Figure, extension: &str) -> PathBuf {
        let metric = figure.metric();
        self.out_dir
            .join(format!("figure_{}{}.{}", metric.name(), self.suffix, extension))
    }

    fn path2table(&self, figure: Figure, problem_type: ProblemType) -> PathBuf {
        self.out_dir.join("tables").join(format!(
            "{}{}_{}.csv",
            figure.metric().name(),
            self.suffix,
            problem_type
        ))
    }

    fn aggregate(&self, figure: Figure) -> anyhow::Result<Vec<Aggregated>> {
        let metric = figure.metric();
        let mut panels = Vec::with_capacity(ProblemType::FIGURES.len());
        for problem_type in ProblemType::FIGURES {
            if self.verbosity > 0 {
                println!("{} Collecting the {} of {}", Utc::now(), metric.name(), problem_type);
            }
            let aggregated =
                collect(&self.layout, problem_type, &DISTANCE_NAMES, &metric, self.verbosity)
                    .with_context(|| {
                        format!("Cannot collect the {} of {}", metric.name(), problem_type)
                    })?
                    .aggregate();
            aggregated.save(&self.path2table(figure, problem_type), self.verbosity)?;
            panels.push(aggregated);
        }
        Ok(panels)
    }

    fn draw(
        &self,
        figure: Figure,
        panels: &[Aggregated],
        path: &Path,
        svg: bool,
    ) -> anyhow::Result<()> {
        let size = figure.size();
        let levels = credible_levels();
        match (figure, svg) {
            (Figure::Ess, false) => {
                plot::draw_ess(BitMapBackend::new(path, size).into_drawing_area(), panels)
            }
            (Figure::Ess, true) => {
                plot::draw_ess(SVGBackend::new(path, size).into_drawing_area(), panels)
            }
            (Figure::Rmse, false) => {
                plot::draw_rmse(BitMapBackend::new(path, size).into_drawing_area(), panels)
            }
            (Figure::Rmse, true) => {
                plot::draw_rmse(SVGBackend::new(path, size).into_drawing_area(), panels)
            }
            (Figure::Calibration, false) => plot::draw_calibration(
                BitMapBackend::new(path, size).into_drawing_area(),
                panels,
                &levels,
            ),
            (Figure::Calibration, true) => plot::draw_calibration(
                SVGBackend::new(path, size).into_drawing_area(),
                panels,
                &levels,
            ),
        }
        .with_context(|| format!("Cannot draw {:#?}", path))
    }

    fn run(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("Cannot create dir {:#?}", self.out_dir))?;
        for figure in self.figures.iter() {
            let panels = self.aggregate(*figure)?;
            for (extension, svg) in [("png", false), ("svg", true)] {
                let path = self.path2figure(*figure, extension);
                println!("{} Saving {:#?}", Utc::now(), path);
                self.draw(*figure, &panels, &path, svg)?;
            }
        }
        Ok(())
    }
}

fn main() {
    let figures = Cli::build();
    println!("{} Starting", Utc::now());
    std::process::exit(match figures.run() {
        Ok(()) => {
            println!("{} End", Utc::now());
            0
        }
        Err(err) => {
            eprintln!("{} Error: {:?}", Utc::now(), err);
            1
        }
    });
}
