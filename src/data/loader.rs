use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Datum, ScalarDataset};

/// Tag used when a single-series export does not name one.
const FALLBACK_TAG: &str = "scalar";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load scalar series from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – long format, columns `run`, `tag`, `step`, `wall_time`, `value`
/// * `.json`    – `[{ "run", "tag", "step", "wall_time", "value" }, ...]`,
///   `{ "run/tag": [[wall_time, step, value], ...] }`, or a single
///   `[[wall_time, step, value], ...]` series
/// * `.csv`     – columns `run,tag,step,wall_time,value`, or the
///   `Wall time,Step,Value` export of a single series
pub fn load_file(path: &Path) -> Result<ScalarDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "loaded {} points in {} runs from {}",
        dataset.len(),
        dataset.series.len(),
        path.display()
    );
    Ok(dataset)
}

/// Run and tag for a single-series export.
///
/// Exports are named `run_<run>-tag-<tag>`; anything else uses the file
/// stem as the run name.
fn single_series_names(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("run")
        .to_string();
    match stem
        .strip_prefix("run_")
        .and_then(|rest| rest.split_once("-tag-"))
    {
        Some((run, tag)) => (run.to_string(), tag.replace('_', "/")),
        None => (stem, FALLBACK_TAG.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<ScalarDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let mut dataset = ScalarDataset::default();
    match &root {
        JsonValue::Array(items) if items.iter().all(JsonValue::is_array) => {
            let (run, tag) = single_series_names(path);
            push_triples(&mut dataset, &run, &tag, items)?;
        }
        JsonValue::Array(records) => {
            for (i, rec) in records.iter().enumerate() {
                let obj = rec
                    .as_object()
                    .with_context(|| format!("Row {i} is not a JSON object"))?;
                let run = json_str(obj.get("run"), i, "run")?;
                let tag = json_str(obj.get("tag"), i, "tag")?;
                let step = obj
                    .get("step")
                    .and_then(JsonValue::as_i64)
                    .with_context(|| format!("Row {i}: missing or invalid 'step'"))?;
                let wall_time = json_f64(obj.get("wall_time"))
                    .with_context(|| format!("Row {i}: missing or invalid 'wall_time'"))?;
                let value = json_f64(obj.get("value"))
                    .with_context(|| format!("Row {i}: missing or invalid 'value'"))?;
                dataset.push(run, tag, Datum::new(step, wall_time, value));
            }
        }
        JsonValue::Object(map) => {
            for (key, series) in map {
                let (run, tag) = key.split_once('/').unwrap_or((key.as_str(), FALLBACK_TAG));
                let items = series
                    .as_array()
                    .with_context(|| format!("Series '{key}' is not an array"))?;
                push_triples(&mut dataset, run, tag, items)?;
            }
        }
        _ => bail!("Expected a top-level JSON array or object"),
    }
    Ok(dataset)
}

/// `[wall_time, step, value]` triples.
fn push_triples(
    dataset: &mut ScalarDataset,
    run: &str,
    tag: &str,
    items: &[JsonValue],
) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        let triple = item
            .as_array()
            .filter(|a| a.len() == 3)
            .with_context(|| format!("{run}/{tag}[{i}]: expected [wall_time, step, value]"))?;
        let wall_time = json_f64(triple.get(0))
            .with_context(|| format!("{run}/{tag}[{i}]: invalid wall time"))?;
        let step = triple[1]
            .as_i64()
            .with_context(|| format!("{run}/{tag}[{i}]: invalid step"))?;
        let value = json_f64(triple.get(2))
            .with_context(|| format!("{run}/{tag}[{i}]: invalid value"))?;
        dataset.push(run, tag, Datum::new(step, wall_time, value));
    }
    Ok(())
}

fn json_str<'a>(val: Option<&'a JsonValue>, row: usize, col: &str) -> Result<&'a str> {
    val.and_then(JsonValue::as_str)
        .with_context(|| format!("Row {row}: missing or invalid '{col}'"))
}

/// Numbers, plus `null` and the strings `"NaN"`, `"Infinity"`, `"-Infinity"`
/// that JSON writers use for non-finite floats.
fn json_f64(val: Option<&JsonValue>) -> Option<f64> {
    match val? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::Null => Some(f64::NAN),
        JsonValue::String(s) => parse_float(s),
        _ => None,
    }
}

fn parse_float(s: &str) -> Option<f64> {
    match s.trim() {
        "" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Where a CSV row's run and tag come from.
enum CsvNames {
    Columns(usize, usize),
    Fixed(String, String),
}

fn load_csv(path: &Path) -> Result<ScalarDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let step_idx = column("step").context("CSV missing 'step' column")?;
    let value_idx = column("value").context("CSV missing 'value' column")?;
    let wall_idx = column("wall_time")
        .or_else(|| column("wall time"))
        .context("CSV missing 'wall_time' column")?;
    let names = match (column("run"), column("tag")) {
        (Some(run), Some(tag)) => CsvNames::Columns(run, tag),
        _ => {
            let (run, tag) = single_series_names(path);
            CsvNames::Fixed(run, tag)
        }
    };

    let mut dataset = ScalarDataset::default();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let step: i64 = field(step_idx)
            .trim()
            .parse()
            .with_context(|| format!("CSV row {row_no}: '{}' is not a step", field(step_idx)))?;
        let wall_time = parse_float(field(wall_idx)).with_context(|| {
            format!("CSV row {row_no}: '{}' is not a wall time", field(wall_idx))
        })?;
        let value = parse_float(field(value_idx)).with_context(|| {
            format!("CSV row {row_no}: '{}' is not a number", field(value_idx))
        })?;

        let datum = Datum::new(step, wall_time, value);
        match &names {
            CsvNames::Columns(run, tag) => dataset.push(field(*run), field(*tag), datum),
            CsvNames::Fixed(run, tag) => dataset.push(run, tag, datum),
        }
    }
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a long-format Parquet file, one observation per row.
///
/// Expected schema:
/// - `run`, `tag`: Utf8 / LargeUtf8
/// - `step`: Int64 or Int32
/// - `wall_time`, `value`: Float64 or Float32 (nulls read as NaN)
///
/// Files written by both **Pandas** (`df.to_parquet()`) and **Polars**
/// (`df.write_parquet()`) work.
fn load_parquet(path: &Path) -> Result<ScalarDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut dataset = ScalarDataset::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|idx| batch.column(idx))
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };

        let run_col = column("run")?;
        let tag_col = column("tag")?;
        let step_col = column("step")?;
        let wall_col = column("wall_time")?;
        let value_col = column("value")?;

        for row in 0..batch.num_rows() {
            let run = extract_str(run_col, row).with_context(|| format!("Row {row}: 'run'"))?;
            let tag = extract_str(tag_col, row).with_context(|| format!("Row {row}: 'tag'"))?;
            let step = extract_i64(step_col, row).with_context(|| format!("Row {row}: 'step'"))?;
            let wall_time =
                extract_f64(wall_col, row).with_context(|| format!("Row {row}: 'wall_time'"))?;
            let value =
                extract_f64(value_col, row).with_context(|| format!("Row {row}: 'value'"))?;
            dataset.push(&run, &tag, Datum::new(step, wall_time, value));
        }
    }

    Ok(dataset)
}

// -- Parquet / Arrow helpers --

fn extract_str(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in string column");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected Utf8 column, got {other:?}"),
    }
}

fn extract_i64(col: &Arc<dyn Array>, row: usize) -> Result<i64> {
    if col.is_null(row) {
        bail!("null value in integer column");
    }
    if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        Ok(arr.value(row))
    } else if let Some(arr) = col.as_any().downcast_ref::<Int32Array>() {
        Ok(arr.value(row) as i64)
    } else {
        bail!("Expected Int64 or Int32 column, got {:?}", col.data_type())
    }
}

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Ok(if arr.is_null(row) { f64::NAN } else { arr.value(row) })
    } else if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        Ok(if arr.is_null(row) { f64::NAN } else { arr.value(row) as f64 })
    } else {
        bail!("Expected Float64 or Float32 column, got {:?}", col.data_type())
    }
}
