use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw per-species kinetic and physical parameters, as provided by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParams {
    pub name: String,
    pub concentration: f64, // M
    pub radius: f64,        // nm
    pub kon: f64,           // M^-1 s^-1
    pub koff: f64,          // s^-1
}

impl SpeciesParams {
    pub fn new(name: &str, concentration: f64, radius: f64, kon: f64, koff: f64) -> Self {
        Self {
            name: name.to_string(),
            concentration,
            radius,
            kon,
            koff,
        }
    }
}

/// Trial set of human serum albumin, HDL and fibrinogen with literature parameters.
pub fn default_species() -> Vec<SpeciesParams> {
    vec![
        SpeciesParams::new("HSA", 1.5e-5, 5.0, 3e4, 3e-5),
        SpeciesParams::new("HDL", 6e-4, 4.0, 2.4e3, 2e-3),
        SpeciesParams::new("Fib", 8.8e-6, 8.3, 2e3, 2e-3),
    ]
}

/// Loads species rows from a whitespace-delimited file.
pub fn load_species_file<P: AsRef<Path>>(path: P) -> Result<Vec<SpeciesParams>> {
    let path_ref = path.as_ref();
    let contents = std::fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read species file '{}'", path_ref.display()))?;
    parse_species_table(&contents)
        .with_context(|| format!("Invalid species file '{}'", path_ref.display()))
}

/// Parses `name concentration radius kon koff [ignored...]` rows.
/// Blank lines and `#` comments are skipped. Columns past the fifth
/// (binding energy, area) are accepted and ignored.
pub fn parse_species_table(contents: &str) -> Result<Vec<SpeciesParams>> {
    let mut rows = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            anyhow::bail!(
                "line {}: expected at least 5 columns (name concentration radius kon koff), found {}",
                line_no + 1,
                fields.len()
            );
        }
        let number = |idx: usize, what: &str| -> Result<f64> {
            fields[idx].parse::<f64>().with_context(|| {
                format!("line {}: cannot parse {} '{}'", line_no + 1, what, fields[idx])
            })
        };
        rows.push(SpeciesParams {
            name: fields[0].to_string(),
            concentration: number(1, "concentration")?,
            radius: number(2, "radius")?,
            kon: number(3, "kon")?,
            koff: number(4, "koff")?,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_ignores_extra_columns() {
        let text = "# name conc r kon koff energy area\n\
                    HSA 1.5e-5 5 3e4 3e-5 0 78.5\n\
                    \n\
                    HSA   2e-5\t5   1e4 1e-4\n";
        let rows = parse_species_table(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], SpeciesParams::new("HSA", 1.5e-5, 5.0, 3e4, 3e-5));
        assert_eq!(rows[1].kon, 1e4);
    }

    #[test]
    fn short_rows_are_rejected() {
        let err = parse_species_table("HSA 1.5e-5 5 3e4\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(parse_species_table("HSA abc 5 3e4 3e-5\n").is_err());
    }

    #[test]
    fn default_table_has_three_proteins() {
        let names: Vec<_> = default_species().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["HSA", "HDL", "Fib"]);
    }
}
