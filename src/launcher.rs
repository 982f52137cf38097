//! Desktop shortcuts that switch the discovered base stations on or off.
//!
//! Only the CLI calls into this module, after a discovery pass.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::Error;
use crate::protocol::Command;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LauncherStyle {
    /// freedesktop.org `.desktop` entry.
    DesktopEntry,
    /// Windows batch script.
    CmdScript,
}

impl LauncherStyle {
    pub fn native() -> Option<Self> {
        if cfg!(windows) {
            Some(LauncherStyle::CmdScript)
        } else if cfg!(all(unix, not(target_os = "macos"))) {
            Some(LauncherStyle::DesktopEntry)
        } else {
            None
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            LauncherStyle::DesktopEntry => "desktop",
            LauncherStyle::CmdScript => "cmd",
        }
    }
}

pub struct Launcher {
    style: LauncherStyle,
    directory: PathBuf,
    program: PathBuf,
}

impl Launcher {
    pub fn new(style: LauncherStyle, directory: PathBuf, program: PathBuf) -> Self {
        Launcher {
            style,
            directory,
            program,
        }
    }

    /// Launcher writing to the user's desktop and invoking the running executable.
    pub fn for_desktop() -> Result<Self, Error> {
        let style = LauncherStyle::native().ok_or_else(|| {
            Error::Launcher("creating desktop shortcuts is not supported on this platform".into())
        })?;
        let directory = dirs::desktop_dir()
            .ok_or_else(|| Error::Launcher("no desktop directory found".into()))?;
        let program = std::env::current_exe()?;
        Ok(Launcher::new(style, directory, program))
    }

    /// Writes one ON and one OFF shortcut targeting `addresses`.
    pub fn create(&self, addresses: &[String]) -> Result<Vec<PathBuf>, Error> {
        fs::create_dir_all(&self.directory)?;
        let mut created = Vec::new();
        for command in [Command::On, Command::Off] {
            let path = self
                .directory
                .join(format!("LHv2-{}.{}", command, self.style.extension()));
            let contents = self.render(command, addresses);
            debug!("Writing {}", path.display());
            fs::write(&path, contents)?;
            mark_executable(&path)?;
            info!("Created shortcut {}", path.display());
            created.push(path);
        }
        Ok(created)
    }

    fn render(&self, command: Command, addresses: &[String]) -> String {
        let directive = command.to_string().to_lowercase();
        let program = self.program.display();
        let arguments = addresses.join(" ");
        match self.style {
            LauncherStyle::DesktopEntry => format!(
                "[Desktop Entry]\n\
                 Type=Application\n\
                 Name=LHv2 {command}\n\
                 Comment=Switch LightHouse V2 base stations {command}\n\
                 Exec=\"{program}\" {directive} {arguments}\n\
                 Terminal=false\n"
            ),
            LauncherStyle::CmdScript => {
                format!("@echo off\r\n\"{program}\" {directive} {arguments}\r\n")
            }
        }
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses() -> Vec<String> {
        vec!["AA:BB:CC:DD:EE:01".to_string(), "AA:BB:CC:DD:EE:02".to_string()]
    }

    #[test]
    fn test_desktop_entries() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = Launcher::new(
            LauncherStyle::DesktopEntry,
            dir.path().to_path_buf(),
            PathBuf::from("/usr/bin/lighthouse-power"),
        );

        let created = launcher.create(&addresses()).unwrap();

        assert_eq!(
            created,
            vec![
                dir.path().join("LHv2-ON.desktop"),
                dir.path().join("LHv2-OFF.desktop")
            ]
        );
        let on = fs::read_to_string(&created[0]).unwrap();
        assert!(on.starts_with("[Desktop Entry]\n"));
        assert!(on.contains(
            "Exec=\"/usr/bin/lighthouse-power\" on AA:BB:CC:DD:EE:01 AA:BB:CC:DD:EE:02\n"
        ));
        let off = fs::read_to_string(&created[1]).unwrap();
        assert!(off.contains("\" off AA:BB:CC:DD:EE:01"));
    }

    #[test]
    fn test_cmd_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = Launcher::new(
            LauncherStyle::CmdScript,
            dir.path().to_path_buf(),
            PathBuf::from("lighthouse-power.exe"),
        );

        let created = launcher.create(&addresses()[..1]).unwrap();

        let off = fs::read_to_string(&created[1]).unwrap();
        assert_eq!(
            off,
            "@echo off\r\n\"lighthouse-power.exe\" off AA:BB:CC:DD:EE:01\r\n"
        );
    }
}
