//! 汇总表导出.
//!
//! 每个切块一行, 最后一行为全片汇总. 两种行的列完全相同,
//! 汇总行中只对单个切块有意义的列 (`Predicted Class`) 留空.

use super::SlideSummary;
use crate::classify::TilePrediction;
use crate::CellClass;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// 汇总行的 `Tile Name`.
pub const SUMMARY_ROW_NAME: &str = "Overall WSI Summary";

fn header() -> Vec<String> {
    let mut cols = vec![
        "Tile Name".to_string(),
        "Predicted Class".to_string(),
        "Slide Name".to_string(),
    ];
    for class in CellClass::ALL {
        cols.push(format!("{class} (%)"));
        cols.push(format!("{class} Count"));
    }
    cols.push("Final Classification".to_string());
    cols
}

/// 含有分隔符, 引号或换行的字段加引号.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn write_row<W: Write, S: AsRef<str>>(w: &mut W, fields: &[S]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(w, "{line}")
}

/// 写出汇总表. 浮点数以最短的可往返形式输出 (`12.35`, `70.0`).
pub fn write_csv<W: Write>(
    mut w: W,
    slide_name: &str,
    predictions: &[TilePrediction],
    summary: &SlideSummary,
) -> io::Result<()> {
    write_row(&mut w, &header())?;

    for p in predictions {
        let mut row = vec![p.key(), p.class.to_string(), slide_name.to_string()];
        for (class, pct) in p.distribution.iter() {
            row.push(format!("{pct:?}"));
            row.push(p.distribution.estimated_cells(class).to_string());
        }
        row.push(p.diagnosis().to_string());
        write_row(&mut w, &row)?;
    }

    let mut row = vec![
        SUMMARY_ROW_NAME.to_string(),
        String::new(),
        slide_name.to_string(),
    ];
    for class in CellClass::ALL {
        row.push(format!("{:?}", summary.percentage(class)));
        row.push(summary.cell_count(class).to_string());
    }
    row.push(summary.diagnosis().to_string());
    write_row(&mut w, &row)?;
    w.flush()
}

/// 将汇总表保存到 `path`.
pub fn save_csv<P: AsRef<Path>>(
    path: P,
    slide_name: &str,
    predictions: &[TilePrediction],
    summary: &SlideSummary,
) -> io::Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_csv(file, slide_name, predictions, summary)
}
