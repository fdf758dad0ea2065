use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info};

use crate::prelude::*;

pub const PARAMETERS_FILE: &str = "optimal_parameters.json";
pub const FITNESS_FILE: &str = "fitness.json";

/// A `0|1` switch in the parameter-space JSON. `true`/`false` are accepted too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flag(pub bool);

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Int(u64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Bool(b) => Ok(Flag(b)),
            Repr::Int(0) => Ok(Flag(false)),
            Repr::Int(1) => Ok(Flag(true)),
            Repr::Int(n) => Err(D::Error::custom(format!("flag must be 0 or 1, got {n}"))),
        }
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(self.0))
    }
}

/// One dimension as written in the parameter-space JSON:
/// `{"min": -500, "max": 500, "int": 0, "exp": 0, "log": 0, "power": 0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpecConfig {
    pub min: f64,
    pub max: f64,
    #[serde(rename = "int", default)]
    pub integer: Flag,
    #[serde(default)]
    pub exp: Flag,
    #[serde(default)]
    pub log: Flag,
    #[serde(default)]
    pub power: Flag,
}

impl ParameterSpecConfig {
    pub fn into_spec(self, name: String) -> Result<ParameterSpec, SwarmError> {
        let scalings: Vec<Scaling> = [
            (self.exp, Scaling::Exp),
            (self.log, Scaling::Log),
            (self.power, Scaling::Power),
        ]
        .into_iter()
        .filter_map(|(flag, scaling)| flag.0.then_some(scaling))
        .collect();
        if scalings.len() > 1 {
            return Err(SwarmError::ConflictingScaling { name });
        }

        let spec = ParameterSpec {
            name,
            min: self.min,
            max: self.max,
            integer: self.integer.0,
            scaling: scalings.first().copied().unwrap_or_default(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Builds a validated space from the `name -> spec` mapping of the JSON document.
pub fn parameter_space_from_config(
    config: BTreeMap<String, ParameterSpecConfig>,
) -> Result<ParameterSpace, SwarmError> {
    let specs = config
        .into_iter()
        .map(|(name, spec)| spec.into_spec(name))
        .collect::<Result<Vec<_>, _>>()?;
    ParameterSpace::new(specs)
}

/// Reads and deserializes one JSON document.
pub fn read_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads and validates the optimizer settings document.
pub fn load_settings(path: impl AsRef<Path>) -> Result<SwarmSettings, ConfigError> {
    let settings: SwarmSettings = read_config(&path)?;
    settings.validate()?;
    debug!(path = %path.as_ref().display(), ?settings, "loaded swarm settings");
    Ok(settings)
}

/// Loads and validates the parameter-space document.
pub fn load_parameter_space(path: impl AsRef<Path>) -> Result<ParameterSpace, ConfigError> {
    let config: BTreeMap<String, ParameterSpecConfig> = read_config(&path)?;
    let space = parameter_space_from_config(config)?;
    debug!(path = %path.as_ref().display(), dims = space.dims(), "loaded parameter space");
    Ok(space)
}

/// JSON with 4-space indentation, matching the historical output files.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Locations of the two result files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPaths {
    pub parameters: PathBuf,
    pub fitness: PathBuf,
}

impl SavedPaths {
    pub fn in_dir(output_dir: impl AsRef<Path>) -> Self {
        let dir = output_dir.as_ref();
        Self {
            parameters: dir.join(PARAMETERS_FILE),
            fitness: dir.join(FITNESS_FILE),
        }
    }
}

fn sibling_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    target.with_file_name(name)
}

fn staging_path(target: &Path) -> PathBuf {
    sibling_path(target, ".tmp")
}

fn backup_path(target: &Path) -> PathBuf {
    sibling_path(target, ".bak")
}

/// A result file moved into place, plus where its predecessor was parked.
struct Commit<'a> {
    target: &'a Path,
    backup: Option<PathBuf>,
}

/// Undoes committed renames in reverse order and drops the staged files.
fn roll_back(commits: &[Commit<'_>], staged: &[PathBuf]) {
    for commit in commits.iter().rev() {
        let _ = fs::remove_file(commit.target);
        if let Some(backup) = &commit.backup {
            let _ = fs::rename(backup, commit.target);
        }
    }
    for stage in staged {
        let _ = fs::remove_file(stage);
    }
}

/// JSON has no representation for `inf`/`NaN`; serde_json would write `null`.
fn ensure_finite(parameters: &Parameters, fitness: f64) -> Result<(), SaveError> {
    let values = parameters
        .iter()
        .map(|(name, &value)| (name.as_str(), value))
        .chain([("fitness", fitness)]);
    for (name, value) in values {
        if !value.is_finite() {
            return Err(SaveError::NonFinite {
                name: name.to_string(),
                value,
            });
        }
    }
    Ok(())
}

/// Writes `optimal_parameters.json` and `fitness.json` into `output_dir`,
/// creating the directory if needed.
///
/// Non-finite values are rejected before anything touches the disk. Both
/// documents are staged next to their targets first. Existing result files
/// are parked as `*.bak` while the staged files are renamed into place. If
/// any step fails, every rename is undone and the parked files are restored,
/// so the directory ends up as it was before the call.
pub fn save_results(
    parameters: &Parameters,
    fitness: f64,
    output_dir: impl AsRef<Path>,
) -> Result<SavedPaths, SaveError> {
    ensure_finite(parameters, fitness)?;

    let dir = output_dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| SaveError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let paths = SavedPaths::in_dir(dir);
    let documents = [
        (paths.parameters.as_path(), to_pretty_json(parameters)?),
        (paths.fitness.as_path(), to_pretty_json(&fitness)?),
    ];
    let staged: Vec<PathBuf> = documents
        .iter()
        .map(|(target, _)| staging_path(target))
        .collect();

    for ((_, bytes), stage) in documents.iter().zip(&staged) {
        if let Err(source) = fs::write(stage, bytes) {
            roll_back(&[], &staged);
            return Err(SaveError::Write {
                path: stage.clone(),
                source,
            });
        }
    }

    let mut commits: Vec<Commit<'_>> = Vec::with_capacity(documents.len());
    for ((target, _), stage) in documents.iter().zip(&staged) {
        let target: &Path = target;
        let backup = if target.is_file() {
            let backup = backup_path(target);
            if let Err(source) = fs::rename(target, &backup) {
                roll_back(&commits, &staged);
                return Err(SaveError::Write {
                    path: backup,
                    source,
                });
            }
            Some(backup)
        } else {
            None
        };

        if let Err(source) = fs::rename(stage, target) {
            if let Some(backup) = &backup {
                let _ = fs::rename(backup, target);
            }
            roll_back(&commits, &staged);
            return Err(SaveError::Write {
                path: target.to_path_buf(),
                source,
            });
        }
        commits.push(Commit { target, backup });
    }

    for backup in commits.iter().filter_map(|commit| commit.backup.as_ref()) {
        let _ = fs::remove_file(backup);
    }

    info!(
        parameters = %paths.parameters.display(),
        fitness = %paths.fitness.display(),
        "saved optimization results"
    );
    Ok(paths)
}

/// Saves the best parameters and fitness of a finished run.
pub fn save_result(
    result: &OptimizationResult,
    output_dir: impl AsRef<Path>,
) -> Result<SavedPaths, SaveError> {
    save_results(&result.best_parameters, result.best_fitness, output_dir)
}

/// Reads back what [`save_results`] wrote.
pub fn load_results(output_dir: impl AsRef<Path>) -> Result<(Parameters, f64), ConfigError> {
    let paths = SavedPaths::in_dir(output_dir);
    let parameters: Parameters = read_config(&paths.parameters)?;
    let fitness: f64 = read_config(&paths.fitness)?;
    Ok((parameters, fitness))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::tests::scratch_dir;

    const ROSENBROCK_SPACE: &str = r#"{
        "x": {"max": 500, "min": -500, "int": 0, "exp": 0, "log": 0, "power": 0},
        "y": {"max": 500, "min": -500, "int": 0, "exp": 0, "log": 0, "power": 0}
    }"#;

    fn space_from_str(json: &str) -> Result<ParameterSpace, SwarmError> {
        let config: BTreeMap<String, ParameterSpecConfig> = serde_json::from_str(json).unwrap();
        parameter_space_from_config(config)
    }

    #[test]
    fn test_rosenbrock_space_parses() {
        let space = space_from_str(ROSENBROCK_SPACE).unwrap();
        assert_eq!(
            space.specs(),
            &[
                ParameterSpec::linear("x", -500.0, 500.0),
                ParameterSpec::linear("y", -500.0, 500.0),
            ]
        );
    }

    #[test]
    fn test_flags_accept_bools_and_default_to_off() {
        let space = space_from_str(
            r#"{"depth": {"min": 1, "max": 10, "int": true},
                "lr": {"min": -5, "max": -1, "power": 1}}"#,
        )
        .unwrap();
        let depth = space.spec("depth").unwrap();
        assert!(depth.integer);
        assert_eq!(depth.scaling, Scaling::Linear);
        assert_eq!(space.spec("lr").unwrap().scaling, Scaling::Power);
    }

    #[test_case(r#"{"x": {"min": 0, "max": 1, "int": 2}}"#; "flag out of range")]
    #[test_case(r#"{"x": {"max": 1}}"#; "missing min")]
    #[test_case(r#"{"x": {"min": 0, "max": 1, "scale": 1}}"#; "unknown key")]
    #[test_case(r#"{"x": {"min": "0", "max": 1}}"#; "string bound")]
    fn test_malformed_spec_rejected(json: &str) {
        assert!(serde_json::from_str::<BTreeMap<String, ParameterSpecConfig>>(json).is_err());
    }

    #[test_case(r#"{"x": {"min": 0, "max": 1, "exp": 1, "log": 1}}"#; "two scalings")]
    #[test_case(r#"{"x": {"min": 5, "max": 5}}"#; "empty range")]
    #[test_case(r#"{"x": {"min": 0, "max": 2, "log": 1}}"#; "log from zero")]
    #[test_case(r#"{}"#; "no dimensions")]
    fn test_invalid_space_rejected(json: &str) {
        assert!(space_from_str(json).unwrap_err().is_config_error());
    }

    #[test]
    fn test_read_config_reports_path() {
        let dir = scratch_dir("read_config_reports_path");
        let missing = dir.join("nope.json");
        let err = read_config::<SwarmSettings>(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { ref path, .. } if *path == missing));

        fs::create_dir_all(&dir).unwrap();
        let broken = dir.join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        let err = read_config::<SwarmSettings>(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_settings_validates() {
        let dir = scratch_dir("load_settings_validates");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pso_cfg.json");
        fs::write(&path, r#"{"iterations": 10, "sample_size": 2, "nr_informants": 5}"#).unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(SwarmError::TooManyInformants { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_pretty_json_uses_four_spaces() {
        let params: Parameters = [("x", 1.0), ("y", 2.5)].into_iter().collect();
        let text = String::from_utf8(to_pretty_json(&params).unwrap()).unwrap();
        assert_eq!(text, "{\n    \"x\": 1.0,\n    \"y\": 2.5\n}");
        assert_eq!(to_pretty_json(&0.25).unwrap(), b"0.25");
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = scratch_dir("save_then_load_round_trip").join("nested/out");
        let params: Parameters = [("x", 0.999_812_3), ("y", 0.999_611_7)].into_iter().collect();
        let fitness = 3.732_1e-8;

        let paths = save_results(&params, fitness, &dir).unwrap();
        assert_eq!(paths, SavedPaths::in_dir(&dir));
        assert!(!staging_path(&paths.parameters).exists());

        let (loaded_params, loaded_fitness) = load_results(&dir).unwrap();
        assert_eq!(loaded_params, params);
        assert_eq!(loaded_fitness, fitness);
        let _ = fs::remove_dir_all(scratch_dir("save_then_load_round_trip"));
    }

    #[test]
    fn test_save_into_file_path_fails_cleanly() {
        let dir = scratch_dir("save_into_file_path");
        fs::create_dir_all(&dir).unwrap();
        let not_a_dir = dir.join("occupied");
        fs::write(&not_a_dir, "x").unwrap();

        let err = save_results(&Parameters::new(), 1.0, &not_a_dir).unwrap_err();
        assert!(matches!(err, SaveError::CreateDir { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_save_leaves_no_partial_output() {
        let dir = scratch_dir("failed_save_no_partial");
        // a directory squatting on the fitness file name makes the second rename fail
        fs::create_dir_all(dir.join(FITNESS_FILE)).unwrap();
        let params: Parameters = [("x", 1.0)].into_iter().collect();

        let err = save_results(&params, 0.5, &dir).unwrap_err();
        assert!(matches!(err, SaveError::Write { .. }));

        let paths = SavedPaths::in_dir(&dir);
        assert!(!paths.parameters.exists());
        assert!(!staging_path(&paths.parameters).exists());
        assert!(!staging_path(&paths.fitness).exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_previous_results_survive_failed_resave() {
        let dir = scratch_dir("previous_results_survive");
        let first: Parameters = [("x", 1.0), ("y", 2.0)].into_iter().collect();
        let paths = save_results(&first, 0.25, &dir).unwrap();
        let first_text = fs::read_to_string(&paths.parameters).unwrap();

        // the fitness target turns into a directory, so the re-save fails on its second rename
        fs::remove_file(&paths.fitness).unwrap();
        fs::create_dir_all(paths.fitness.join("occupied")).unwrap();
        let second: Parameters = [("x", 3.0), ("y", 4.0)].into_iter().collect();
        let err = save_results(&second, 0.125, &dir).unwrap_err();
        assert!(matches!(err, SaveError::Write { .. }));

        assert_eq!(fs::read_to_string(&paths.parameters).unwrap(), first_text);
        for leftover in [
            staging_path(&paths.parameters),
            staging_path(&paths.fitness),
            backup_path(&paths.parameters),
            backup_path(&paths.fitness),
        ] {
            assert!(!leftover.exists(), "{}", leftover.display());
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_resave_replaces_previous_results() {
        let dir = scratch_dir("resave_replaces");
        let first: Parameters = [("x", 1.0)].into_iter().collect();
        save_results(&first, 2.0, &dir).unwrap();
        let second: Parameters = [("x", -1.5)].into_iter().collect();
        let paths = save_results(&second, 0.5, &dir).unwrap();

        assert_eq!(load_results(&dir).unwrap(), (second, 0.5));
        assert!(!backup_path(&paths.parameters).exists());
        assert!(!backup_path(&paths.fitness).exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test_case(f64::INFINITY, 1.0, "x"; "infinite parameter")]
    #[test_case(1.0, f64::NEG_INFINITY, "fitness"; "infinite fitness")]
    #[test_case(1.0, f64::NAN, "fitness"; "nan fitness")]
    fn test_non_finite_values_are_not_saved(x: f64, fitness: f64, expected_name: &str) {
        let dir = scratch_dir(&format!("non_finite_{expected_name}_{}", x.is_finite()));
        let params: Parameters = [("x", x), ("y", 0.0)].into_iter().collect();

        let err = save_results(&params, fitness, &dir).unwrap_err();
        match err {
            SaveError::NonFinite { name, .. } => assert_eq!(name, expected_name),
            other => panic!("expected NonFinite, got {other:?}"),
        }
        assert!(!dir.exists());
    }
}
