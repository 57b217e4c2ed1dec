//   Copyright 2025 relumip developers
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

//! Progress reporting hooks for the embedding process

use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use console::style;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use crate::nn::arch::Layer;

pub trait EmbedVisitor {
    fn start_embed(&mut self, n_layers: usize, n_rows: usize);
    fn start_layer(&mut self, layer: &Layer);
    fn finish_layer(&mut self, layer: &Layer, new_vars: usize, new_constrs: usize, binaries: usize);
    fn finish_embed(&mut self, total_vars: usize, total_constrs: usize);
}

#[derive(Clone, Debug)]
pub struct NoOpVis {}

impl EmbedVisitor for NoOpVis {
    fn start_embed(&mut self, _: usize, _: usize) {}
    fn start_layer(&mut self, _: &Layer) {}
    fn finish_layer(&mut self, _: &Layer, _: usize, _: usize, _: usize) {}
    fn finish_embed(&mut self, _: usize, _: usize) {}
}

#[derive(Clone, Debug)]
pub struct EmbedConsole {
    pb: ProgressBar,
    timer: Instant,
    len: usize,
}

impl EmbedConsole {
    pub fn new() -> EmbedConsole {
        EmbedConsole {
            pb: ProgressBar::hidden(),
            timer: Instant::now(),
            len: 0,
        }
    }
}

impl Default for EmbedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbedVisitor for EmbedConsole {
    fn start_embed(&mut self, n_layers: usize, n_rows: usize) {
        self.pb = ProgressBar::new(n_layers as u64);
        let sty = ProgressStyle::default_bar()
            .template(&format!(
                "{: >12} {}",
                style("Embedding").cyan().bold(),
                "[{bar:25}] {pos:>2}/{len:2} ({elapsed})"
            ))
            .unwrap()
            .progress_chars("=> ");
        self.pb.set_style(sty.clone());
        self.pb.enable_steady_tick(Duration::from_secs(5));

        println!("Layers: {}", n_layers);
        println!("Batch rows: {}", n_rows);

        self.timer = Instant::now();
        self.len = n_layers;
    }

    fn start_layer(&mut self, _layer: &Layer) {
        self.timer = Instant::now();
    }

    fn finish_layer(
        &mut self,
        layer: &Layer,
        new_vars: usize,
        new_constrs: usize,
        binaries: usize,
    ) {
        let duration = self.timer.elapsed();
        self.pb.println(format!(
            "{: >12} {} in {:#} ({} variables, {} constraints, {} binaries)",
            style("Finished").green().bold(),
            layer,
            HumanDuration(duration),
            new_vars,
            new_constrs,
            binaries
        ));
        self.pb.inc(1);
    }

    fn finish_embed(&mut self, total_vars: usize, total_constrs: usize) {
        self.pb.finish_and_clear();
        println!(
            "\n{: >12} embedding network ({} variables, {} constraints)",
            style("Completed").green().bold(),
            total_vars,
            total_constrs
        );
    }
}

#[derive(serde::Serialize)]
struct CsvRow {
    layer: usize,
    kind: String,
    vars: usize,
    constrs: usize,
    binaries: usize,
    time_ms: u128,
}

#[derive(Debug)]
pub struct EmbedCsv {
    writer: csv::Writer<File>,
    timer: Instant,
    layer: usize,
    pb: ProgressBar,
}

impl EmbedCsv {
    pub fn new<P: AsRef<Path>>(path: P) -> EmbedCsv {
        EmbedCsv {
            writer: csv::Writer::from_path(path).unwrap(),
            timer: Instant::now(),
            layer: 0,
            pb: ProgressBar::hidden(),
        }
    }
}

impl EmbedVisitor for EmbedCsv {
    fn start_embed(&mut self, n_layers: usize, _n_rows: usize) {
        self.timer = Instant::now();
        self.layer = 0;
        self.pb = ProgressBar::new(n_layers as u64);
        let sty = ProgressStyle::default_bar()
            .template(&format!(
                "{: >12} {}",
                style("Embedding").cyan().bold(),
                "[{bar:20}] {pos:>2}/{len:2} ({elapsed})"
            ))
            .unwrap()
            .progress_chars("=> ");
        self.pb.set_style(sty.clone());
    }

    fn start_layer(&mut self, _layer: &Layer) {
        self.timer = Instant::now();
    }

    fn finish_layer(
        &mut self,
        layer: &Layer,
        new_vars: usize,
        new_constrs: usize,
        binaries: usize,
    ) {
        let duration = self.timer.elapsed();
        self.writer
            .serialize(CsvRow {
                layer: self.layer,
                kind: layer.kind().to_string(),
                vars: new_vars,
                constrs: new_constrs,
                binaries,
                time_ms: duration.as_millis(),
            })
            .unwrap();
        self.writer.flush().unwrap();
        self.layer += 1;
        self.pb.inc(1);
    }

    fn finish_embed(&mut self, _total_vars: usize, _total_constrs: usize) {
        self.writer.flush().unwrap();
        self.pb.finish_and_clear();
    }
}
