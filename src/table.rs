//! Append-only evaluation table shared across comparison runs.
//!
//! # File Format
//!
//! Comma-separated values with a header row:
//!
//! ```text
//! graph,target_node,d,method,mc,true_total,false_total,dsep_share,TP,TN,FP,FN,TP_rate,TN_rate,FP_rate,FN_rate,precision,recall,F1
//! asia,dysp,8,hc,1000,412,588,0.412,...
//! ```
//!
//! Fields containing commas, quotes or line breaks are quoted, with inner
//! quotes doubled. Undefined metrics are written as `NaN`.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};

use crate::confusion::Metrics;
use crate::error::{Error, Result};

/// Column names, in file order.
pub const COLUMNS: [&str; 19] = [
    "graph",
    "target_node",
    "d",
    "method",
    "mc",
    "true_total",
    "false_total",
    "dsep_share",
    "TP",
    "TN",
    "FP",
    "FN",
    "TP_rate",
    "TN_rate",
    "FP_rate",
    "FN_rate",
    "precision",
    "recall",
    "F1",
];

/// One row of the evaluation table: the outcome of a single comparison run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub graph: String,
    pub target_node: String,
    /// Number of nodes in the true graph
    pub d: usize,
    pub method: String,
    /// Trial budget
    pub mc: u64,
    /// Trials separated in the true graph
    pub true_total: u64,
    /// Trials connected in the true graph
    pub false_total: u64,
    pub dsep_share: f64,
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tp_rate: f64,
    pub tn_rate: f64,
    pub fp_rate: f64,
    pub fn_rate: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl EvaluationRecord {
    pub fn new(graph: String, target_node: String, d: usize, method: String, metrics: &Metrics) -> Self {
        Self {
            graph,
            target_node,
            d,
            method,
            mc: metrics.total(),
            true_total: metrics.separated_total,
            false_total: metrics.connected_total,
            dsep_share: metrics.dsep_share,
            tp: metrics.counts.tp,
            tn: metrics.counts.tn,
            fp: metrics.counts.fp,
            fn_: metrics.counts.fn_,
            tp_rate: metrics.tp_rate,
            tn_rate: metrics.tn_rate,
            fp_rate: metrics.fp_rate,
            fn_rate: metrics.fn_rate,
            precision: metrics.precision,
            recall: metrics.recall,
            f1: metrics.f1,
        }
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.graph.clone(),
            self.target_node.clone(),
            self.d.to_string(),
            self.method.clone(),
            self.mc.to_string(),
            self.true_total.to_string(),
            self.false_total.to_string(),
            self.dsep_share.to_string(),
            self.tp.to_string(),
            self.tn.to_string(),
            self.fp.to_string(),
            self.fn_.to_string(),
            self.tp_rate.to_string(),
            self.tn_rate.to_string(),
            self.fp_rate.to_string(),
            self.fn_rate.to_string(),
            self.precision.to_string(),
            self.recall.to_string(),
            self.f1.to_string(),
        ]
    }

    fn from_fields(fields: &[String]) -> std::result::Result<Self, String> {
        if fields.len() != COLUMNS.len() {
            return Err(format!("expected {} fields, found {}", COLUMNS.len(), fields.len()));
        }
        fn parse<T: FromStr>(fields: &[String], i: usize) -> std::result::Result<T, String> {
            fields[i]
                .trim()
                .parse()
                .map_err(|_| format!("invalid {} value: {:?}", COLUMNS[i], fields[i]))
        }
        Ok(Self {
            graph: fields[0].clone(),
            target_node: fields[1].clone(),
            d: parse(fields, 2)?,
            method: fields[3].clone(),
            mc: parse(fields, 4)?,
            true_total: parse(fields, 5)?,
            false_total: parse(fields, 6)?,
            dsep_share: parse(fields, 7)?,
            tp: parse(fields, 8)?,
            tn: parse(fields, 9)?,
            fp: parse(fields, 10)?,
            fn_: parse(fields, 11)?,
            tp_rate: parse(fields, 12)?,
            tn_rate: parse(fields, 13)?,
            fp_rate: parse(fields, 14)?,
            fn_rate: parse(fields, 15)?,
            precision: parse(fields, 16)?,
            recall: parse(fields, 17)?,
            f1: parse(fields, 18)?,
        })
    }
}

fn write_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_field(out, field.as_ref());
    }
    out.push('\n');
}

/// Splits delimited text into rows of fields, honouring quoted fields.
fn parse_rows(content: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

/// Evaluation table backed by a delimited file.
#[derive(Debug)]
pub struct EvaluationTable {
    path: PathBuf,
    records: Vec<EvaluationRecord>,
}

impl EvaluationTable {
    /// Opens the table at `path`, or creates it with just a header row.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let table = Self {
                path,
                records: Vec::new(),
            };
            table.save()?;
            info!("Created evaluation table {}", table.path.display());
            return Ok(table);
        }

        let content = fs::read_to_string(&path)?;
        let records = Self::parse(&content).map_err(|message| Error::Parse {
            path: path.clone(),
            message,
        })?;
        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    fn parse(content: &str) -> std::result::Result<Vec<EvaluationRecord>, String> {
        let mut rows = parse_rows(content)?
            .into_iter()
            .enumerate()
            .filter(|(_, row)| !(row.len() == 1 && row[0].trim().is_empty()));

        match rows.next() {
            None => return Ok(Vec::new()),
            Some((_, header)) => {
                if header.len() != COLUMNS.len() || header.iter().zip(COLUMNS).any(|(h, c)| h.trim() != c) {
                    return Err(format!("unexpected header: {}", header.join(",")));
                }
            }
        }

        rows.map(|(line, row)| EvaluationRecord::from_fields(&row).map_err(|e| format!("line {}: {}", line + 1, e)))
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a row in memory; call [`save`][Self::save] to persist it.
    pub fn append(&mut self, record: EvaluationRecord) {
        self.records.push(record);
    }

    /// Renders the whole table, header included.
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        write_row(&mut out, COLUMNS.as_slice());
        for record in &self.records {
            write_row(&mut out, record.to_fields().as_slice());
        }
        out
    }

    /// Writes the table to its file, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, self.to_csv_string())?;
        Ok(())
    }

    /// F1 scores of all runs on graphs with `d` nodes, grouped by method in table order.
    pub fn f1_by_method(&self, d: usize) -> BTreeMap<&str, Vec<f64>> {
        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.d == d) {
            groups.entry(record.method.as_str()).or_default().push(record.f1);
        }
        groups
    }

    /// Text summary of [`f1_by_method`][Self::f1_by_method].
    pub fn summary(&self, d: usize) -> String {
        let mut s = String::new();
        let groups = self.f1_by_method(d);
        if groups.is_empty() {
            writeln!(s, "No runs on graphs with d = {}", d).unwrap();
            return s;
        }
        writeln!(s, "F1 scores for graphs with d = {}", d).unwrap();
        for (method, scores) in &groups {
            let defined: Vec<f64> = scores.iter().copied().filter(|x| !x.is_nan()).collect();
            let mean = if defined.is_empty() {
                f64::NAN
            } else {
                defined.iter().sum::<f64>() / defined.len() as f64
            };
            let values: Vec<String> = scores.iter().map(|x| format!("{:.4}", x)).collect();
            writeln!(s, "  {:<8} mean={:.4}  [{}]", method, mean, values.join(", ")).unwrap();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::confusion::ConfusionMatrix;

    fn record(graph: &str, method: &str, d: usize, counts: ConfusionMatrix) -> EvaluationRecord {
        EvaluationRecord::new(
            graph.to_string(),
            "y".to_string(),
            d,
            method.to_string(),
            &Metrics::from_counts(counts),
        )
    }

    fn counts(tp: u64, tn: u64, fp: u64, fn_: u64) -> ConfusionMatrix {
        ConfusionMatrix { tp, tn, fp, fn_ }
    }

    #[test]
    fn test_create_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("graph_evaluation.csv");

        let table = EvaluationTable::load_or_create(&path).unwrap();
        assert!(table.is_empty());
        assert!(path.exists());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn test_append_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_evaluation.csv");

        let mut table = EvaluationTable::load_or_create(&path).unwrap();
        table.append(record("asia", "hc", 8, counts(40, 50, 5, 5)));
        table.append(record("sachs", "tabu", 11, counts(0, 10, 0, 0)));
        table.save().unwrap();

        let reloaded = EvaluationTable::load_or_create(&path).unwrap();
        assert_eq!(reloaded.len(), 2);

        let asia = &reloaded.records()[0];
        assert_eq!(asia.graph, "asia");
        assert_eq!(asia.mc, 100);
        assert_eq!(asia.true_total, 45);
        assert_eq!(asia.false_total, 55);
        assert_eq!(asia.tp, 40);
        assert!((asia.precision - 40.0 / 45.0).abs() < 1e-12);

        // Undefined metrics survive the round trip as NaN.
        let sachs = &reloaded.records()[1];
        assert!(sachs.precision.is_nan());
        assert!(sachs.f1.is_nan());
        assert_eq!(sachs.tn_rate, 1.0);
    }

    #[test]
    fn test_runs_accumulate_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_evaluation.csv");

        for i in 0..3 {
            let mut table = EvaluationTable::load_or_create(&path).unwrap();
            assert_eq!(table.len(), i);
            table.append(record("alarm", "mmhc", 37, counts(1, 1, 1, 1)));
            table.save().unwrap();
        }
        assert_eq!(EvaluationTable::load_or_create(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_quoted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_evaluation.csv");

        let mut table = EvaluationTable::load_or_create(&path).unwrap();
        table.append(record("hepar, \"II\"", "h2pc", 70, counts(1, 2, 3, 4)));
        table.save().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"hepar, \"\"II\"\"\""));

        let reloaded = EvaluationTable::load_or_create(&path).unwrap();
        assert_eq!(reloaded.records()[0].graph, "hepar, \"II\"");
    }

    #[test]
    fn test_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_evaluation.csv");
        fs::write(&path, "a,b,c\n1,2,3\n").unwrap();
        assert!(matches!(EvaluationTable::load_or_create(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_bad_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph_evaluation.csv");
        let content = format!("{}\nasia,y,eight\n", COLUMNS.join(","));
        fs::write(&path, content).unwrap();
        assert!(matches!(EvaluationTable::load_or_create(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_f1_by_method() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = EvaluationTable::load_or_create(dir.path().join("t.csv")).unwrap();
        table.append(record("asia", "hc", 8, counts(1, 0, 0, 0)));
        table.append(record("asia", "tabu", 8, counts(1, 0, 1, 0)));
        table.append(record("asia", "hc", 8, counts(0, 1, 0, 0)));
        table.append(record("sachs", "hc", 11, counts(1, 0, 0, 0)));

        let groups = table.f1_by_method(8);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["hc"].len(), 2);
        assert_eq!(groups["hc"][0], 1.0);
        assert!(groups["hc"][1].is_nan());
        assert!((groups["tabu"][0] - 2.0 / 3.0).abs() < 1e-12);

        let summary = table.summary(8);
        assert!(summary.contains("hc"));
        assert!(summary.contains("tabu"));
        assert!(table.summary(70).contains("No runs"));
    }
}
