use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// A synthetic training run.
struct RunProfile {
    name: &'static str,
    /// Steps for the loss to fall by 1/e.
    decay: f64,
    floor: f64,
    noise: f64,
    /// Step after which the loss is NaN.
    diverges_at: Option<i64>,
}

const RUNS: [RunProfile; 4] = [
    RunProfile { name: "lr_1e-3", decay: 400.0, floor: 0.15, noise: 0.04, diverges_at: None },
    RunProfile { name: "lr_3e-3", decay: 220.0, floor: 0.12, noise: 0.07, diverges_at: None },
    RunProfile { name: "lr_1e-2", decay: 120.0, floor: 0.20, noise: 0.15, diverges_at: None },
    RunProfile { name: "lr_1e-1", decay: 60.0, floor: 0.35, noise: 0.30, diverges_at: Some(1400) },
];

const STEPS: i64 = 2000;
const LOG_EVERY: i64 = 10;
const SECONDS_PER_STEP: f64 = 0.8;
const START_TIME: f64 = 1_700_000_000.0;

#[derive(Default)]
struct Columns {
    run: Vec<&'static str>,
    tag: Vec<&'static str>,
    step: Vec<i64>,
    wall_time: Vec<f64>,
    value: Vec<f64>,
}

impl Columns {
    fn push(&mut self, run: &'static str, tag: &'static str, step: i64, wall_time: f64, value: f64) {
        self.run.push(run);
        self.tag.push(tag);
        self.step.push(step);
        self.wall_time.push(wall_time);
        self.value.push(value);
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let mut columns = Columns::default();

    for (i, run) in RUNS.iter().enumerate() {
        // Runs start a few minutes apart.
        let start = START_TIME + i as f64 * 300.0;
        for step in (0..=STEPS).step_by(LOG_EVERY as usize) {
            let wall_time = start + step as f64 * SECONDS_PER_STEP + rng.gauss(0.0, 0.05);
            let clean = run.floor + (1.0 - run.floor) * 2.5 * (-(step as f64) / run.decay).exp();
            let loss = match run.diverges_at {
                Some(at) if step >= at => f64::NAN,
                _ => (clean + rng.gauss(0.0, run.noise * clean)).max(0.0),
            };
            let accuracy = (1.0 - clean / 2.8 + rng.gauss(0.0, run.noise * 0.1)).clamp(0.0, 1.0);

            columns.push(run.name, "loss", step, wall_time, loss);
            columns.push(run.name, "accuracy", step, wall_time, accuracy);
            if step % 100 == 0 {
                let eval = clean * 1.1 + rng.gauss(0.0, run.noise * 0.5 * clean);
                columns.push(run.name, "eval/loss", step, wall_time + 5.0, eval);
            }
        }
    }

    let n_rows = columns.step.len();
    let schema = Arc::new(Schema::new(vec![
        Field::new("run", DataType::Utf8, false),
        Field::new("tag", DataType::Utf8, false),
        Field::new("step", DataType::Int64, false),
        Field::new("wall_time", DataType::Float64, false),
        Field::new("value", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(columns.run)),
            Arc::new(StringArray::from(columns.tag)),
            Arc::new(Int64Array::from(columns.step)),
            Arc::new(Float64Array::from(columns.wall_time)),
            Arc::new(Float64Array::from(columns.value)),
        ],
    )
    .context("creating record batch")?;

    // Write Parquet
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_runs.parquet".to_string());
    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!("Wrote {n_rows} scalars for {} runs to {output_path}", RUNS.len());
    Ok(())
}
