//! Startup check for external programs the launcher cannot run without.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::LauncherError;

/// Returns the entries of `required` that could not be resolved
pub fn missing_dependencies(required: &[String]) -> Vec<String> {
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    missing_in(required, &search_path)
}

fn missing_in(required: &[String], search_path: &OsString) -> Vec<String> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| resolve_executable(name, search_path).is_none())
        .cloned()
        .collect();

    for name in &missing {
        tracing::warn!("Required dependency not found: {}", name);
    }

    missing
}

/// Resolve a program name against `search_path`, or check an explicit path
pub fn resolve_executable(name: &str, search_path: &OsString) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return with_extensions(candidate).into_iter().find(|p| p.is_file());
    }

    std::env::split_paths(search_path)
        .flat_map(|dir| with_extensions(&dir.join(name)))
        .find(|p| p.is_file())
}

#[cfg(target_os = "windows")]
fn with_extensions(path: &Path) -> Vec<PathBuf> {
    let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT".to_string());
    std::iter::once(path.to_path_buf())
        .chain(exts.split(';').filter(|e| !e.is_empty()).map(|ext| {
            let mut file = path.as_os_str().to_owned();
            file.push(ext.to_ascii_lowercase());
            PathBuf::from(file)
        }))
        .collect()
}

#[cfg(not(target_os = "windows"))]
fn with_extensions(path: &Path) -> Vec<PathBuf> {
    vec![path.to_path_buf()]
}

/// Fail-fast precondition for startup
pub fn ensure_dependencies(required: &[String]) -> Result<(), LauncherError> {
    let missing = missing_dependencies(required);
    if missing.is_empty() {
        tracing::info!("All required dependencies found");
        Ok(())
    } else {
        Err(LauncherError::DependencyMissing(missing))
    }
}

pub fn show_dependency_error(error: &LauncherError) {
    let description = format!(
        "{}\n\nInstall the missing components and start the launcher again.",
        error
    );

    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Fusion Launcher - Missing Dependency")
        .set_description(description)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
