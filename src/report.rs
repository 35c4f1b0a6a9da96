//! Text reports over an analysis result
//!
//! Every view writes to any [`Write`] so the CLI can target stdout or a file.

use std::io::{self, Write};

use crate::metrics::{AnalysisData, FileRecord};

/// Rows shown in the complexity table
pub const TOP_COMPLEXITY_ROWS: usize = 10;

/// Aggregate coverage figures over the files that have data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageStats {
    pub average: f64,
    pub max: f64,
    pub min: f64,
    /// Files at exactly 0%
    pub uncovered: usize,
    pub with_data: usize,
    pub without_data: usize,
}

impl CoverageStats {
    /// `None` when no file carries coverage
    pub fn from_data(data: &AnalysisData) -> Option<Self> {
        let values: Vec<f64> = data.files.iter().filter_map(|f| f.coverage).collect();
        if values.is_empty() {
            return None;
        }

        Some(Self {
            average: values.iter().sum::<f64>() / values.len() as f64,
            max: values.iter().copied().fold(f64::MIN, f64::max),
            min: values.iter().copied().fold(f64::MAX, f64::min),
            uncovered: values.iter().filter(|&&v| v == 0.0).count(),
            with_data: values.len(),
            without_data: data.files.len() - values.len(),
        })
    }
}

/// Files, cycles, tests and warnings in one view
pub fn generate_summary<W: Write>(data: &AnalysisData, writer: &mut W) -> io::Result<()> {
    let entry = data.files.first().map_or("?", |f| f.name.as_str());

    writeln!(writer, "Import Graph Analysis: {}", entry)?;
    writeln!(writer, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
    writeln!(writer)?;

    writeln!(writer, "[Files]")?;
    write_file_counts(data, writer)?;

    if data.has_cycles() {
        writeln!(writer)?;
        writeln!(writer, "[Cycles]")?;
        write_cycles(data, writer)?;
    }

    writeln!(writer)?;
    writeln!(writer, "[Tests]")?;
    write_tests(data, writer)?;

    if !data.warnings.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "[Warnings]")?;
        write_warnings(data, writer)?;
    }

    Ok(())
}

fn write_file_counts<W: Write>(data: &AnalysisData, writer: &mut W) -> io::Result<()> {
    let failed = data.files.iter().filter(|f| !f.is_analyzed()).count();
    writeln!(writer, "{} files", data.file_count())?;
    writeln!(
        writer,
        "Lines: {} | Complexity: {} | Edges: {}",
        data.total_lines(),
        data.total_complexity(),
        data.files.iter().map(|f| f.imports.len()).sum::<usize>()
    )?;
    if failed > 0 {
        writeln!(writer, "Not analyzed: {}", failed)?;
    }
    if let Some(unreached) = &data.unreached {
        writeln!(writer, "Unreached from entry: {}", unreached.len())?;
    }
    Ok(())
}

/// File counts followed by the most complex files
pub fn write_files<W: Write>(data: &AnalysisData, writer: &mut W) -> io::Result<()> {
    write_file_counts(data, writer)?;
    writeln!(writer)?;
    write_top_complexity(data, TOP_COMPLEXITY_ROWS, writer)?;

    if let Some(unreached) = &data.unreached {
        writeln!(writer)?;
        writeln!(writer, "Unreached files:")?;
        for path in unreached {
            writeln!(writer, "  {}", path.display())?;
        }
    }
    Ok(())
}

/// The `limit` files with the highest complexity score
pub fn write_top_complexity<W: Write>(
    data: &AnalysisData,
    limit: usize,
    writer: &mut W,
) -> io::Result<()> {
    let mut ranked: Vec<&FileRecord> = data.files.iter().filter(|f| f.is_analyzed()).collect();
    ranked.sort_by(|a, b| b.complexity.cmp(&a.complexity).then(a.name.cmp(&b.name)));

    writeln!(
        writer,
        "{:<40} {:>8} {:>10} {:>6} {:>6}",
        "File", "Lines", "Complexity", "In", "Depth"
    )?;
    for file in ranked.into_iter().take(limit) {
        writeln!(
            writer,
            "{:<40} {:>8} {:>10} {:>6} {:>6}",
            truncate_path(&file.name, 40),
            file.line_count.unwrap_or(0),
            file.complexity.unwrap_or(0),
            file.imports_direct,
            file.imports_depth
        )?;
    }
    Ok(())
}

pub fn write_cycles<W: Write>(data: &AnalysisData, writer: &mut W) -> io::Result<()> {
    let Some(cycles) = &data.cycles else {
        writeln!(writer, "No cycles found")?;
        return Ok(());
    };

    writeln!(writer, "{} cycle(s) found", cycles.len())?;
    for cycle in cycles {
        writeln!(writer, "{}", data.describe_cycle(cycle))?;
    }
    Ok(())
}

/// Coverage statistics
pub fn write_tests<W: Write>(data: &AnalysisData, writer: &mut W) -> io::Result<()> {
    let Some(stats) = CoverageStats::from_data(data) else {
        writeln!(writer, "No coverage data")?;
        return Ok(());
    };

    writeln!(writer, "Average: {:.1}%", stats.average)?;
    writeln!(writer, "Max/min: {:.1}% / {:.1}%", stats.max, stats.min)?;
    writeln!(writer, "Files w/o tests: {}", stats.uncovered)?;
    if stats.without_data > 0 {
        writeln!(writer, "Files w/o data: {}", stats.without_data)?;
    }
    Ok(())
}

pub fn write_warnings<W: Write>(data: &AnalysisData, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{} warning(s)", data.warnings.len())?;
    for warning in &data.warnings {
        writeln!(writer, "  {}", warning)?;
    }
    Ok(())
}

fn truncate_path(path: &str, max_len: usize) -> String {
    let len = path.chars().count();
    if len <= max_len {
        path.to_string()
    } else {
        let tail: String = path.chars().skip(len + 3 - max_len).collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AnalysisWarning;
    use std::path::PathBuf;

    fn file(name: &str, complexity: Option<u64>, coverage: Option<f64>) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            path: PathBuf::from(format!("/p/src/{}", name)),
            line_count: complexity.map(|_| 10),
            imports: Vec::new(),
            imports_external: Vec::new(),
            imports_direct: 1,
            imports_depth: 1,
            complexity,
            max_depth: complexity.map(|_| 0),
            coverage,
            history: None,
        }
    }

    fn render(
        view: fn(&AnalysisData, &mut Vec<u8>) -> io::Result<()>,
        data: &AnalysisData,
    ) -> String {
        let mut out = Vec::new();
        view(data, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_coverage_stats() {
        let data = AnalysisData {
            files: vec![
                file("lib.rs", Some(10), Some(80.0)),
                file("a.rs", Some(10), Some(0.0)),
                file("b.rs", Some(10), None),
                file("c.rs", Some(10), Some(40.0)),
            ],
            ..Default::default()
        };

        let stats = CoverageStats::from_data(&data).unwrap();
        assert_eq!(stats.average, 40.0);
        assert_eq!(stats.max, 80.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.uncovered, 1);
        assert_eq!(stats.without_data, 1);

        let text = render(write_tests, &data);
        assert!(text.contains("Average: 40.0%"));
        assert!(text.contains("Files w/o tests: 1"));
        assert!(text.contains("Files w/o data: 1"));
    }

    #[test]
    fn test_no_coverage() {
        let data = AnalysisData {
            files: vec![file("lib.rs", Some(10), None)],
            ..Default::default()
        };
        assert!(CoverageStats::from_data(&data).is_none());
        assert_eq!(render(write_tests, &data), "No coverage data\n");
    }

    #[test]
    fn test_cycles_view() {
        let data = AnalysisData {
            files: vec![
                file("lib.rs", Some(10), None),
                file("a.rs", Some(10), None),
                file("b.rs", Some(10), None),
            ],
            cycles: Some(vec![vec![0, 1, 2, 0]]),
            ..Default::default()
        };
        assert_eq!(
            render(write_cycles, &data),
            "1 cycle(s) found\nlib.rs -> a.rs -> b.rs -> lib.rs\n"
        );
    }

    #[test]
    fn test_top_complexity_skips_unparsed() {
        let data = AnalysisData {
            files: vec![
                file("lib.rs", Some(40), None),
                file("broken.rs", None, None),
                file("heavy.rs", Some(400), None),
            ],
            ..Default::default()
        };

        let mut out = Vec::new();
        write_top_complexity(&data, 5, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("heavy.rs"));
        assert!(rows[1].starts_with("lib.rs"));
    }

    #[test]
    fn test_summary_sections() {
        let data = AnalysisData {
            files: vec![file("lib.rs", Some(10), None), file("a.rs", None, None)],
            cycles: None,
            unreached: None,
            warnings: vec![AnalysisWarning::ParseError {
                path: PathBuf::from("/p/src/a.rs"),
                message: "expected item".to_string(),
            }],
        };

        let text = render(generate_summary, &data);
        assert!(text.starts_with("Import Graph Analysis: lib.rs"));
        assert!(text.contains("[Files]\n2 files"));
        assert!(text.contains("Not analyzed: 1"));
        assert!(!text.contains("[Cycles]"));
        assert!(text.contains("[Warnings]\n1 warning(s)"));
    }

    #[test]
    fn test_truncate_path() {
        assert_eq!(truncate_path("short.rs", 40), "short.rs");
        assert_eq!(truncate_path("abcdefghij.rs", 10), "...ghij.rs");
    }
}
