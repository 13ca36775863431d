//! Simulation template rewriting.
//!
//! A template is an existing model file for the population engine. Rewriting
//! strips its comments and any previous `system` definitions, appends the
//! freshly synthesized [`SystemSpec`], and substitutes `param` values from a
//! [`ParameterTable`]. The template itself is never modified; output goes to
//! a sibling file such as `model_new.pm`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::SystemSpec;

/// Parameter name to value, applied to `param` declarations
pub type ParameterTable = HashMap<String, f64>;

/// Token inserted before the extension of the derived output file
pub const OUTPUT_MARKER: &str = "new";

const SYSTEM_KEYWORD: &str = "system";
const PARAM_KEYWORD: &str = "param";
const COMMENT_PREFIXES: [&str; 3] = ["/*", "*/", "*"];

/// Errors raised while reading or writing model files
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write model file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template path has no file name: {path}")]
    InvalidPath { path: PathBuf },
}

/// Strip comments and old system definitions, then append `system`.
///
/// Lines are trimmed; blank lines, lines starting with `/*`, `*/` or `*`, and
/// lines starting with `system` are dropped. Every output line, including the
/// appended definition, ends with `\n`.
pub fn rewrite(template_text: &str, system: &SystemSpec) -> String {
    let mut output = String::with_capacity(template_text.len() + system.as_str().len() + 1);

    for line in template_text.lines().map(str::trim).filter(|line| is_kept(line)) {
        output.push_str(line);
        output.push('\n');
    }

    output.push_str(system.as_str());
    output.push('\n');
    output
}

fn is_kept(line: &str) -> bool {
    !line.is_empty()
        && !COMMENT_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
        && !line.starts_with(SYSTEM_KEYWORD)
}

/// Replace `param` declarations whose name appears in `table`.
///
/// A matching line becomes `param <name> = <value>;`. Lines naming a
/// parameter absent from the table, and `param` lines with no discoverable
/// name, are kept as they are. Line endings are preserved.
///
/// # Examples
/// ```
/// use popsim::template::{apply_parameters, ParameterTable};
///
/// let table: ParameterTable = [("x".to_string(), 5.0)].into_iter().collect();
/// let text = "param x = 1.0;\nparam y = 2.0;\n";
/// assert_eq!(apply_parameters(text, &table), "param x = 5.0;\nparam y = 2.0;\n");
/// ```
pub fn apply_parameters(text: &str, table: &ParameterTable) -> String {
    let mut output = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let value = declared_parameter(line).and_then(|name| table.get(name).map(|v| (name, *v)));
        match value {
            Some((name, value)) => {
                output.push_str(&format!(
                    "{} {} = {};",
                    PARAM_KEYWORD,
                    name,
                    format_parameter_value(value)
                ));
                if line.ends_with('\n') {
                    output.push('\n');
                }
            }
            None => output.push_str(line),
        }
    }

    output
}

/// Names of `param` declarations that `table` leaves at their template default
pub fn unresolved_parameters(text: &str, table: &ParameterTable) -> Vec<String> {
    text.lines()
        .filter_map(declared_parameter)
        .filter(|name| !table.contains_key(*name))
        .map(str::to_string)
        .collect()
}

/// Name declared by a line containing the `param` keyword
///
/// The name is the text after the keyword, cut at the first `;` and then at
/// the first `=`, trimmed.
fn declared_parameter(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(PARAM_KEYWORD)?;
    let declaration = rest.split(';').next().unwrap_or(rest);
    let name = declaration.split('=').next().unwrap_or(declaration).trim();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Integral values keep one decimal (`5.0`); others print as-is (`0.25`)
pub fn format_parameter_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Derive the output path for a template: `model.pm` becomes `model_new.pm`.
///
/// Only the final extension is considered, so `run.v2.pm` becomes
/// `run.v2_new.pm`. A file without extension gets the bare suffix.
pub fn derive_output_path(template_path: &Path) -> Result<PathBuf, TemplateError> {
    let stem = template_path
        .file_stem()
        .ok_or_else(|| TemplateError::InvalidPath {
            path: template_path.to_path_buf(),
        })?
        .to_string_lossy();

    let file_name = match template_path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, OUTPUT_MARKER, ext.to_string_lossy()),
        None => format!("{}_{}", stem, OUTPUT_MARKER),
    };

    Ok(template_path.with_file_name(file_name))
}

/// Rewrite a template file into its derived output path and return that path
pub fn rewrite_template_file(template_path: &Path, system: &SystemSpec) -> Result<PathBuf, TemplateError> {
    let output_path = derive_output_path(template_path)?;
    rewrite_template_file_to(template_path, system, &output_path)?;
    Ok(output_path)
}

/// Rewrite a template file into an explicit output path
pub fn rewrite_template_file_to(
    template_path: &Path,
    system: &SystemSpec,
    output_path: &Path,
) -> Result<(), TemplateError> {
    let template_text = read(template_path)?;
    write(output_path, &rewrite(&template_text, system))
}

/// Substitute parameters into an already rewritten model file, in place
pub fn apply_parameters_to_file(model_path: &Path, table: &ParameterTable) -> Result<(), TemplateError> {
    if table.is_empty() {
        return Ok(());
    }

    let text = read(model_path)?;
    write(model_path, &apply_parameters(&text, table))
}

fn read(path: &Path) -> Result<String, TemplateError> {
    fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, content: &str) -> Result<(), TemplateError> {
    fs::write(path, content).map_err(|source| TemplateError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_parser::{Edge, Topology};
    use crate::model::synthesize;
    use tempfile::tempdir;

    const TEMPLATE: &str = r#"/*
 * Leader election over a communication graph.
 */
param lambda = 1.0;
param mu = 0.5;

species N of [0, 10];
  rule elect for i in [0, 10] {
      N[i] -[ lambda ]-> L[i]
  }
system old = N[0] | N[1];
"#;

    fn system() -> SystemSpec {
        let topology = Topology::new(vec!["a".into(), "b".into()], vec![Edge::new("a", "b")]);
        synthesize(&topology, "fresh").0
    }

    fn table(entries: &[(&str, f64)]) -> ParameterTable {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_rewrite_strips_comments_and_old_system() {
        let output = rewrite(TEMPLATE, &system());

        assert!(!output.contains("system old"));
        assert!(!output.lines().any(|l| l.starts_with("/*") || l.starts_with('*')));
        assert_eq!(output.lines().filter(|l| l.starts_with("system")).count(), 1);
        assert_eq!(output.lines().last(), Some("system fresh = N[a] | N[b] | C[a, b];"));
    }

    #[test]
    fn test_rewrite_trims_and_drops_blank_lines() {
        let output = rewrite(TEMPLATE, &system());

        assert_eq!(
            output,
            "param lambda = 1.0;\n\
             param mu = 0.5;\n\
             species N of [0, 10];\n\
             rule elect for i in [0, 10] {\n\
             N[i] -[ lambda ]-> L[i]\n\
             }\n\
             system fresh = N[a] | N[b] | C[a, b];\n"
        );
    }

    #[test]
    fn test_rewrite_removes_every_prior_system() {
        let output = rewrite("system a = N[0];\nparam x = 1;\nsystem b = N[1];\n", &system());

        assert_eq!(output, "param x = 1;\nsystem fresh = N[a] | N[b] | C[a, b];\n");
    }

    #[test]
    fn test_apply_parameters_is_selective() {
        let output = apply_parameters("param x = 1.0;\nparam y = 2.0;\n", &table(&[("x", 5.0)]));

        assert_eq!(output, "param x = 5.0;\nparam y = 2.0;\n");
    }

    #[test]
    fn test_apply_parameters_canonicalises_matching_lines() {
        let output = apply_parameters("param   rate=3;\nparam rate = 4.0;", &table(&[("rate", 0.25)]));

        assert_eq!(output, "param rate = 0.25;\nparam rate = 0.25;");
    }

    #[test]
    fn test_apply_parameters_passes_malformed_lines_through() {
        let text = "param ;\nparam = 3;\n// no params here\n";
        let output = apply_parameters(text, &table(&[("", 1.0)]));

        assert_eq!(output, text);
    }

    #[test]
    fn test_unresolved_parameters() {
        let unresolved = unresolved_parameters("param x = 1.0;\nparam y = 2.0;\nconst z = 3;\n", &table(&[("x", 5.0)]));

        assert_eq!(unresolved, vec!["y".to_string()]);
    }

    #[test]
    fn test_format_parameter_value() {
        assert_eq!(format_parameter_value(5.0), "5.0");
        assert_eq!(format_parameter_value(-2.0), "-2.0");
        assert_eq!(format_parameter_value(0.25), "0.25");
        assert_eq!(format_parameter_value(1.5e-3), "0.0015");
    }

    #[test]
    fn test_derive_output_path() {
        assert_eq!(
            derive_output_path(Path::new("models/model.txt")).unwrap(),
            PathBuf::from("models/model_new.txt")
        );
        assert_eq!(
            derive_output_path(Path::new("run.v2.pm")).unwrap(),
            PathBuf::from("run.v2_new.pm")
        );
        assert_eq!(
            derive_output_path(Path::new("dir.d/model")).unwrap(),
            PathBuf::from("dir.d/model_new")
        );
        assert!(derive_output_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_rewrite_template_file_leaves_original_untouched() {
        let dir = tempdir().unwrap();
        let template_path = dir.path().join("leader.pm");
        fs::write(&template_path, TEMPLATE).unwrap();

        let output_path = rewrite_template_file(&template_path, &system()).unwrap();

        assert_eq!(output_path, dir.path().join("leader_new.pm"));
        assert_eq!(fs::read_to_string(&template_path).unwrap(), TEMPLATE);
        assert_eq!(
            fs::read_to_string(&output_path).unwrap(),
            rewrite(TEMPLATE, &system())
        );
    }

    #[test]
    fn test_repeated_rewrites_are_byte_identical() {
        let dir = tempdir().unwrap();
        let template_path = dir.path().join("leader.pm");
        fs::write(&template_path, TEMPLATE).unwrap();

        let first = dir.path().join("first.pm");
        let second = dir.path().join("second.pm");
        rewrite_template_file_to(&template_path, &system(), &first).unwrap();
        rewrite_template_file_to(&template_path, &system(), &second).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_apply_parameters_to_file() {
        let dir = tempdir().unwrap();
        let template_path = dir.path().join("leader.pm");
        fs::write(&template_path, TEMPLATE).unwrap();
        let output_path = rewrite_template_file(&template_path, &system()).unwrap();

        apply_parameters_to_file(&output_path, &table(&[("mu", 2.0)])).unwrap();

        let content = fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("param lambda = 1.0;\n"));
        assert!(content.contains("param mu = 2.0;\n"));
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let dir = tempdir().unwrap();
        let err = rewrite_template_file(&dir.path().join("absent.pm"), &system()).unwrap_err();

        assert!(matches!(err, TemplateError::Read { .. }));
    }
}
