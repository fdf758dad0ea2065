use std::path::PathBuf;
use std::{env, fs, process};


/// Fresh per-process directory under the system temp dir. Any leftovers from
/// an earlier run with the same name are removed first.
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("swarm_optimizer-{}-{name}", process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}
