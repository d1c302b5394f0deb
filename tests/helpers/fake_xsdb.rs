//! A scripted stand-in for the xsdb shell.
//!
//! The script runs under `sh`, so the test never has to execute a file it
//! just wrote. It prints a banner and prompt, then answers a fixed set of
//! commands the way the real shell formats them.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use xsdb_bridge::BridgeSettings;

const SCRIPT: &str = r#"
echo "****** Xilinx System Debugger (XSDB) v2023.2"
echo "  **** Build date : Oct 13 2023-20:27:06"
printf 'xsdb%% '
while IFS= read -r line; do
  case "$line" in
    connect) printf 'tcfchan#0\nxsdb%% ' ;;
    targets|targets\ -filter*)
      printf '  1  Versal xcvc1902\n     2  RPU\n        3  Cortex-R5 #0 (Halted)\nxsdb%% ' ;;
    "targets 3") printf 'xsdb%% ' ;;
    rrd) printf '  r0: N/A   r1: N/A\n  sp: 00030020   lr: 00000260\nxsdb%% ' ;;
    con)
      printf 'Info: Cortex-R5 #0 (target 3) Running (Breakpoint)\nxsdb%% '
      sleep 0.2
      printf 'Info: Cortex-R5 #0 (target 3) Stopped at 0x420 (Breakpoint)\nmain() at main.c: 12\n12:   x++;\n' ;;
    disconnect) printf 'xsdb%% ' ;;
    exit) EXIT_ACTION ;;
    *) printf 'invalid command name "%s"\nxsdb%% ' "${line%% *}" ;;
  esac
done
"#;

/// How the fake shell reacts to `exit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnExit {
    Quit,
    /// Ignore `exit` and SIGTERM, so only a kill stops it
    Ignore,
}

pub struct FakeXsdb {
    dir: TempDir,
    pub script: PathBuf,
}

impl FakeXsdb {
    pub fn new(on_exit: OnExit) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("fake-xsdb.sh");
        let body = match on_exit {
            OnExit::Quit => SCRIPT.replace("EXIT_ACTION", "exit 0"),
            OnExit::Ignore => format!("trap '' TERM\n{}", SCRIPT.replace("EXIT_ACTION", ":")),
        };
        std::fs::write(&script, body).expect("write fake shell");
        Self { dir, script }
    }

    pub fn settings(&self) -> BridgeSettings {
        BridgeSettings {
            xsdb_path: "sh".to_string(),
            args: vec![self.script.display().to_string()],
            shutdown_timeout_ms: 300,
            ..BridgeSettings::default()
        }
    }

    /// A config file pointing the CLI at this fake shell.
    pub fn config_file(&self) -> PathBuf {
        let path = self.dir.path().join("xsdb-bridge.toml");
        let contents = format!(
            "xsdb_path = \"sh\"\nargs = [\"{}\"]\nshutdown_timeout_ms = 300\n",
            self.script.display()
        );
        std::fs::write(&path, contents).expect("write config");
        path
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}
