//! Directory layout of the surge model and launching it.

use std::path::PathBuf;
use std::process::Stdio;

use surge_common::{SurgeError, SurgeResult};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{info, warn};
use uuid::Uuid;

/// File the model creates in its output directory when a run has finished.
pub const SENTINEL_FILE: &str = "log.flag_surge";

/// Replaced by the run's user directory name in the model's arguments.
pub const USER_PLACEHOLDER: &str = "{user}";

/// Where the model reads inputs and writes outputs, relative to its root.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLayout {
    pub root: PathBuf,
    pub user: String,
    /// Station tables, relative to the output directory.
    pub station_subdir: String,
    /// Derived rasters and polygons, relative to the output directory.
    pub product_subdir: String,
}

impl ModelLayout {
    pub fn new(root: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            user: user.into(),
            station_subdir: "station".to_string(),
            product_subdir: "products".to_string(),
        }
    }

    pub fn with_subdirs(mut self, station: impl Into<String>, products: impl Into<String>) -> Self {
        self.station_subdir = station.into();
        self.product_subdir = products.into();
        self
    }

    /// The layout of one job: its user directory name carries the job id,
    /// so concurrent jobs never share inputs, outputs or sentinel.
    pub fn for_job(&self, job_id: Uuid) -> Self {
        Self {
            user: format!("{}_{}", self.user, job_id.simple()),
            ..self.clone()
        }
    }

    /// Track files go here.
    pub fn input_dir(&self) -> PathBuf {
        self.root.join("user_in").join(&self.user)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join("surgeflood_wkdir")
    }

    /// Raster outputs (`zmax_<branch>*.nc`) land here.
    pub fn output_dir(&self) -> PathBuf {
        self.work_dir().join("user_out").join(&self.user)
    }

    /// One station series table per branch.
    pub fn station_dir(&self) -> PathBuf {
        self.output_dir().join(&self.station_subdir)
    }

    /// Derived GeoTIFF and GeoJSON products.
    pub fn product_dir(&self) -> PathBuf {
        self.output_dir().join(&self.product_subdir)
    }

    pub fn sentinel(&self) -> PathBuf {
        self.output_dir().join(SENTINEL_FILE)
    }
}

/// Launches the model as an opaque process: `program args...` run with the
/// work directory as cwd.
#[derive(Debug, Clone)]
pub struct ModelRunner {
    layout: ModelLayout,
    program: String,
    args: Vec<String>,
}

impl ModelRunner {
    pub fn new(layout: ModelLayout, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            layout,
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace separated command line such as `bash run_surge.sh`.
    pub fn from_command_line(layout: ModelLayout, command: &str) -> SurgeResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SurgeError::ModelFailed("empty model command".into()))?;
        Ok(Self::new(layout, program, parts.collect()))
    }

    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    /// The same model command bound to the job's own directories.
    pub fn for_job(&self, job_id: Uuid) -> Self {
        Self {
            layout: self.layout.for_job(job_id),
            ..self.clone()
        }
    }

    /// Remove a stale sentinel from an earlier run and make sure the input
    /// and output directories exist.
    pub async fn prepare(&self) -> SurgeResult<()> {
        let sentinel = self.layout.sentinel();
        match tokio::fs::remove_file(&sentinel).await {
            Ok(()) => info!(sentinel = %sentinel.display(), "Removed stale completion sentinel"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(self.layout.input_dir()).await?;
        tokio::fs::create_dir_all(self.layout.output_dir()).await?;
        Ok(())
    }

    /// Start the model. The returned handle kills the process if dropped
    /// before it exits.
    ///
    /// `{user}` in the arguments becomes the layout's user directory name,
    /// which is also exported as `SURGE_USER` next to `SURGE_INPUT_DIR` and
    /// `SURGE_OUTPUT_DIR`.
    pub fn launch(&self) -> SurgeResult<ModelProcess> {
        let cwd = self.layout.work_dir();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(USER_PLACEHOLDER, &self.layout.user))
            .collect();
        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(&cwd)
            .env("SURGE_USER", &self.layout.user)
            .env("SURGE_INPUT_DIR", self.layout.input_dir())
            .env("SURGE_OUTPUT_DIR", self.layout.output_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SurgeError::ModelFailed(format!("failed to start '{}': {}", self.program, e)))?;

        info!(
            program = %self.program,
            args = ?args,
            cwd = %cwd.display(),
            pid = child.id(),
            "Launched surge model"
        );
        Ok(ModelProcess {
            child,
            program: self.program.clone(),
        })
    }
}

/// A running model process.
#[derive(Debug)]
pub struct ModelProcess {
    child: Child,
    program: String,
}

impl ModelProcess {
    /// Wait for the process to exit. A non-zero exit status is a
    /// [`SurgeError::ModelFailed`] carrying the tail of stderr.
    pub async fn wait_success(&mut self) -> SurgeResult<()> {
        let pipe = self.child.stderr.take();
        let read_stderr = async move {
            let mut buf = String::new();
            if let Some(mut pipe) = pipe {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        };
        let (status, stderr) = tokio::join!(self.child.wait(), read_stderr);
        let status =
            status.map_err(|e| SurgeError::ModelFailed(format!("waiting on '{}': {}", self.program, e)))?;

        if status.success() {
            info!(program = %self.program, "Surge model process exited cleanly");
            return Ok(());
        }

        let stderr = tail(&stderr, 512).trim();
        warn!(program = %self.program, %status, stderr = %stderr, "Surge model process failed");
        Err(SurgeError::ModelFailed(format!(
            "'{}' exited with {}: {}",
            self.program, status, stderr
        )))
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ModelLayout::new("/srv/surge", "admin");
        assert_eq!(layout.input_dir(), PathBuf::from("/srv/surge/user_in/admin"));
        assert_eq!(layout.sentinel(), PathBuf::from("/srv/surge/surgeflood_wkdir/user_out/admin/log.flag_surge"));
        assert_eq!(
            layout.station_dir(),
            PathBuf::from("/srv/surge/surgeflood_wkdir/user_out/admin/station")
        );
    }

    #[test]
    fn test_job_layouts_are_disjoint() {
        let base = ModelLayout::new("/srv/surge", "admin");
        let a = base.for_job(Uuid::new_v4());
        let b = base.for_job(Uuid::new_v4());
        assert!(a.user.starts_with("admin_"));
        assert_eq!(a.work_dir(), b.work_dir());
        assert_ne!(a.input_dir(), b.input_dir());
        assert_ne!(a.sentinel(), b.sentinel());
    }

    #[test]
    fn test_command_line_parsing() {
        let layout = ModelLayout::new("/tmp", "admin");
        let runner = ModelRunner::from_command_line(layout.clone(), "bash run_surge.sh --fast").unwrap();
        assert_eq!(runner.program, "bash");
        assert_eq!(runner.args, vec!["run_surge.sh", "--fast"]);
        assert!(ModelRunner::from_command_line(layout, "   ").is_err());
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("abcdef", 3), "def");
        let s = "丹娜丝";
        assert!(s.ends_with(tail(s, 4)));
    }
}
