use crate::client::{normalize_app_id, FocusTracker, WindowHandle, WindowInspector, WindowRect};
use crate::error::{Error, Result};
use log::{debug, warn};
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Window queries through the `kdotool` command line tool (KWin scripting).
#[derive(Debug, Clone)]
pub struct KdotoolClient {
    program: String,
    timeout: Duration,
}

impl Default for KdotoolClient {
    fn default() -> Self {
        Self::new("kdotool")
    }
}

impl KdotoolClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_millis(500),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Window(format!("{} {}: {e}", self.program, args.join(" "))))?;

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Window(format!("{} {} timed out", self.program, args.join(" "))));
            }
            Err(e) => return Err(Error::Window(e.to_string())),
        };
        if !status.success() {
            return Err(Error::Window(format!("{} {} exited with {status}", self.program, args.join(" "))));
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .map_err(|e| Error::Window(e.to_string()))?;
        }
        Ok(output.trim().to_string())
    }

    fn query(&self, args: &[&str]) -> Option<String> {
        match self.run(args) {
            Ok(out) if !out.is_empty() => Some(out),
            Ok(_) => None,
            Err(e) => {
                debug!("{e}");
                None
            }
        }
    }
}

impl WindowInspector for KdotoolClient {
    fn current_application_id(&mut self) -> Option<String> {
        let class = self.query(&["getactivewindow", "getwindowclassname"])?;
        normalize_app_id(&class)
    }

    fn current_window_rect(&mut self) -> Option<WindowRect> {
        let geometry = self.query(&["getactivewindow", "getwindowgeometry"])?;
        let rect = parse_geometry(&geometry);
        if rect.is_none() {
            warn!("Unexpected window geometry output: {geometry:?}");
        }
        rect
    }
}

impl FocusTracker for KdotoolClient {
    fn foreground(&mut self) -> Option<WindowHandle> {
        self.query(&["getactivewindow"]).map(WindowHandle::new)
    }

    fn activate(&mut self, window: &WindowHandle) -> Result<()> {
        self.run(&["windowactivate", window.as_str()]).map(|_| ())
    }
}

/// Parses xdotool-style geometry:
///
/// ```text
/// Window {0cc1f1b2-...}
///   Position: 120,48
///   Geometry: 1600x900
/// ```
fn parse_geometry(output: &str) -> Option<WindowRect> {
    let mut position = None;
    let mut size = None;
    for line in output.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("Position:") {
            let (x, y) = rest.trim().split_once(',')?;
            let y = y.split_whitespace().next()?;
            position = Some((x.trim().parse().ok()?, y.trim().parse().ok()?));
        } else if let Some(rest) = line.strip_prefix("Geometry:") {
            let (w, h) = rest.trim().split_once('x')?;
            size = Some((w.trim().parse().ok()?, h.trim().parse().ok()?));
        }
    }
    let ((x, y), (width, height)) = (position?, size?);
    Some(WindowRect { x, y, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geometry() {
        let output = "Window {abc}\n  Position: 120,-48 (screen: 0)\n  Geometry: 1600x900\n";
        assert_eq!(
            parse_geometry(output),
            Some(WindowRect {
                x: 120,
                y: -48,
                width: 1600,
                height: 900
            })
        );
        assert_eq!(parse_geometry("Window {abc}"), None);
        assert_eq!(parse_geometry("Position: a,b\nGeometry: 1x1"), None);
    }

    #[test]
    fn missing_program_means_no_context() {
        let mut client = KdotoolClient::new("definitely-not-a-real-kdotool-binary");
        assert_eq!(client.current_application_id(), None);
        assert_eq!(client.current_window_rect(), None);
        assert_eq!(client.foreground(), None);
        assert!(client.activate(&WindowHandle::new("1")).is_err());
    }
}
